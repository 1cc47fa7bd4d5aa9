use ash::vk;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::demo::RenderBackend;
use crate::descriptor_set::DescriptorSet;
use crate::error::{InitializationError, Result, SubmissionError, VkResultExt};
use crate::frame::{DrawCommand, FramePlan, TextureSlot};
use crate::geometry::GeometryStore;
use crate::pipeline::{Pipeline, PipelineDesc};
use crate::shader::ShaderProgram;
use crate::winding::RasterizationState;
use crate::Device;

pub const CLEAR_COLOR: [f32; 4] = [0.025, 0.025, 0.025, 1.0];

const SAMPLER_BINDING_NAME: &str = "samplerColor";

/// Where the renderer finds its inputs on disk.
#[derive(Clone, Debug)]
pub struct RendererPaths {
    pub asset_root: PathBuf,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

/// Draws the quads into the swapchain images. The frame plan is baked into
/// one secondary command buffer per image and replayed from the primary
/// command buffer every frame.
pub struct VulkanRenderer {
    device: Rc<Device>,
    paths: RendererPaths,
    extent: vk::Extent2D,
    pub render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    command_pool: vk::CommandPool,
    secondary_command_buffers: Vec<vk::CommandBuffer>,
    geometry: Option<GeometryStore>,
    program: Option<ShaderProgram>,
    descriptor_sets: HashMap<TextureSlot, DescriptorSet>,
}

impl VulkanRenderer {
    pub fn new(
        device: Rc<Device>,
        present_image_views: &[vk::ImageView],
        surface_format: vk::SurfaceFormatKHR,
        extent: vk::Extent2D,
        paths: RendererPaths,
    ) -> Result<VulkanRenderer> {
        let render_pass = VulkanRenderer::create_renderpass(&device, surface_format.format)?;
        let framebuffers =
            VulkanRenderer::create_framebuffers(&device, render_pass, present_image_views, extent)?;
        let (command_pool, secondary_command_buffers) =
            VulkanRenderer::create_secondary_command_buffers(&device, framebuffers.len() as u32)?;

        Ok(VulkanRenderer {
            device,
            paths,
            extent,
            render_pass,
            framebuffers,
            command_pool,
            secondary_command_buffers,
            geometry: None,
            program: None,
            descriptor_sets: HashMap::new(),
        })
    }

    /// The scene pass leaves the image in COLOR_ATTACHMENT_OPTIMAL; the UI
    /// overlay pass that follows transitions it for presentation.
    fn create_renderpass(device: &Device, format: vk::Format) -> Result<vk::RenderPass> {
        let renderpass_attachments = [vk::AttachmentDescription {
            format,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            ..Default::default()
        }];
        let color_attachment_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let dependencies = [vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_READ
                | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            ..Default::default()
        }];

        let subpass = vk::SubpassDescription::builder()
            .color_attachments(&color_attachment_refs)
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS);

        let renderpass_create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&renderpass_attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);

        unsafe {
            device
                .handle
                .create_render_pass(&renderpass_create_info, None)
                .init("create the scene render pass")
        }
    }

    fn create_framebuffers(
        device: &Device,
        render_pass: vk::RenderPass,
        present_image_views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Vec<vk::Framebuffer>> {
        present_image_views
            .iter()
            .map(|&present_image_view| {
                let framebuffer_attachments = [present_image_view];
                let frame_buffer_create_info = vk::FramebufferCreateInfo::builder()
                    .render_pass(render_pass)
                    .attachments(&framebuffer_attachments)
                    .width(extent.width)
                    .height(extent.height)
                    .layers(1);

                unsafe {
                    device
                        .handle
                        .create_framebuffer(&frame_buffer_create_info, None)
                        .init("create a framebuffer")
                }
            })
            .collect()
    }

    fn create_secondary_command_buffers(
        device: &Device,
        count: u32,
    ) -> Result<(vk::CommandPool, Vec<vk::CommandBuffer>)> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(device.queue_family_index);

        let pool = unsafe {
            device
                .handle
                .create_command_pool(&pool_create_info, None)
                .init("create the scene command pool")?
        };

        let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_buffer_count(count)
            .command_pool(pool)
            .level(vk::CommandBufferLevel::SECONDARY);

        let command_buffers = unsafe {
            device
                .handle
                .allocate_command_buffers(&command_buffer_allocate_info)
                .init("allocate the scene command buffers")?
        };

        Ok((pool, command_buffers))
    }

    fn geometry(&self, what: &'static str) -> Result<&GeometryStore> {
        self.geometry
            .as_ref()
            .ok_or_else(|| InitializationError::AssetsNotLoaded(what).into())
    }

    fn program(&self, what: &'static str) -> Result<&ShaderProgram> {
        self.program
            .as_ref()
            .ok_or_else(|| InitializationError::AssetsNotLoaded(what).into())
    }

    fn replay(
        &self,
        command_buffer: vk::CommandBuffer,
        pipeline: &Pipeline,
        plan: &FramePlan,
    ) -> Result<()> {
        let device = &self.device.handle;
        let geometry = self.geometry("recording")?;

        for command in &plan.commands {
            unsafe {
                match *command {
                    DrawCommand::SetViewport(viewport) => {
                        device.cmd_set_viewport(command_buffer, 0, &[viewport.to_vk()]);
                    }
                    DrawCommand::SetScissor(scissor) => {
                        device.cmd_set_scissor(command_buffer, 0, &[scissor]);
                    }
                    DrawCommand::BindPipeline => {
                        device.cmd_bind_pipeline(
                            command_buffer,
                            vk::PipelineBindPoint::GRAPHICS,
                            pipeline.handle,
                        );
                    }
                    DrawCommand::BindDescriptorSet(slot) => {
                        let descriptor_set = self
                            .descriptor_sets
                            .get(&slot)
                            .ok_or(InitializationError::AssetsNotLoaded("descriptor binding"))?;
                        device.cmd_bind_descriptor_sets(
                            command_buffer,
                            vk::PipelineBindPoint::GRAPHICS,
                            pipeline.pipeline_layout,
                            0,
                            &[descriptor_set.handle],
                            &[],
                        );
                    }
                    DrawCommand::BindIndexBuffer(set) => {
                        device.cmd_bind_index_buffer(
                            command_buffer,
                            geometry.index_buffer(set).buffer,
                            0,
                            vk::IndexType::UINT32,
                        );
                    }
                    DrawCommand::BindVertexBuffer(set) => {
                        device.cmd_bind_vertex_buffers(
                            command_buffer,
                            0,
                            &[geometry.vertex_buffer(set).buffer],
                            &[0],
                        );
                    }
                    DrawCommand::DrawIndexed {
                        index_count,
                        instance_count,
                    } => {
                        device.cmd_draw_indexed(command_buffer, index_count, instance_count, 0, 0, 0);
                    }
                }
            }
        }

        Ok(())
    }
}

impl RenderBackend for VulkanRenderer {
    type Pipeline = Pipeline;
    /// Primary command buffer and the index of the acquired swapchain image.
    type Target = (vk::CommandBuffer, usize);

    fn framebuffer_extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn load_assets(&mut self, aspect: f32) -> Result<()> {
        let geometry = GeometryStore::load(&self.device, &self.paths.asset_root, aspect)?;
        if let Some(previous) = self.geometry.replace(geometry) {
            self.device.wait_idle()?;
            previous.destroy(&self.device);
        }
        Ok(())
    }

    fn update_vertices(&mut self, aspect: f32) -> Result<()> {
        self.geometry("vertex update")?.update_vertices(aspect)
    }

    fn setup_descriptors(&mut self) -> Result<()> {
        let program = ShaderProgram::new(
            &self.device.handle,
            &self.paths.vertex_shader.to_string_lossy(),
            &self.paths.fragment_shader.to_string_lossy(),
        )?;
        if let Some(previous) = self.program.replace(program) {
            self.device.wait_idle()?;
            previous.destroy(&self.device.handle);
        }

        let program = self.program("descriptor setup")?;
        let geometry = self.geometry("descriptor setup")?;
        let layout = *program
            .descriptor_set_layouts
            .first()
            .ok_or_else(|| InitializationError::MissingBinding(SAMPLER_BINDING_NAME.to_string()))?;

        let mut descriptor_sets = HashMap::new();
        for slot in [TextureSlot::Cw, TextureSlot::Ccw] {
            let descriptor_set =
                DescriptorSet::new(&self.device, layout, program.reflection.get_set_mappings(0))?;
            descriptor_set.write_combined_image(
                &self.device,
                SAMPLER_BINDING_NAME,
                geometry.texture(slot),
            )?;
            descriptor_sets.insert(slot, descriptor_set);
        }

        for (_, previous) in std::mem::replace(&mut self.descriptor_sets, descriptor_sets) {
            previous.destroy(&self.device);
        }

        Ok(())
    }

    fn create_pipeline(&mut self, state: &RasterizationState) -> Result<Pipeline> {
        let desc = PipelineDesc::builder()
            .quad_vertex_layout()
            .rasterization(*state)
            .build();

        Pipeline::new(
            &self.device,
            &desc,
            self.program("pipeline creation")?,
            self.render_pass,
        )
    }

    fn destroy_pipeline(&mut self, pipeline: Pipeline) {
        pipeline.destroy(&self.device);
    }

    fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    fn record(&mut self, pipeline: &Pipeline, plan: &FramePlan) -> Result<()> {
        puffin::profile_function!();

        for (&command_buffer, &framebuffer) in self
            .secondary_command_buffers
            .iter()
            .zip(self.framebuffers.iter())
        {
            let inheritance_info = vk::CommandBufferInheritanceInfo::builder()
                .render_pass(self.render_pass)
                .subpass(0)
                .framebuffer(framebuffer);

            let begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(
                    vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE
                        | vk::CommandBufferUsageFlags::SIMULTANEOUS_USE,
                )
                .inheritance_info(&inheritance_info);

            unsafe {
                self.device
                    .handle
                    .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                    .submit("reset a scene command buffer")?;
                self.device
                    .handle
                    .begin_command_buffer(command_buffer, &begin_info)
                    .submit("begin a scene command buffer")?;
            }

            self.replay(command_buffer, pipeline, plan)?;

            unsafe {
                self.device
                    .handle
                    .end_command_buffer(command_buffer)
                    .submit("end a scene command buffer")?;
            }
        }

        log::debug!(
            "Recorded {} commands into {} scene command buffers",
            plan.commands.len(),
            self.secondary_command_buffers.len()
        );
        Ok(())
    }

    fn execute(&mut self, (command_buffer, image_index): (vk::CommandBuffer, usize)) -> Result<()> {
        puffin::profile_function!();

        let secondary = *self
            .secondary_command_buffers
            .get(image_index)
            .ok_or(SubmissionError::UnknownImage(image_index))?;
        let framebuffer = self.framebuffers[image_index];

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: CLEAR_COLOR,
            },
        }];

        let render_pass_begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.extent,
            })
            .clear_values(&clear_values);

        unsafe {
            self.device.handle.cmd_begin_render_pass(
                command_buffer,
                &render_pass_begin_info,
                vk::SubpassContents::SECONDARY_COMMAND_BUFFERS,
            );
            self.device
                .handle
                .cmd_execute_commands(command_buffer, &[secondary]);
            self.device.handle.cmd_end_render_pass(command_buffer);
        }

        Ok(())
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            log::error!("Failed waiting for the device before teardown: {}", err);
        }

        for (_, descriptor_set) in self.descriptor_sets.drain() {
            descriptor_set.destroy(&self.device);
        }
        if let Some(program) = self.program.take() {
            program.destroy(&self.device.handle);
        }
        if let Some(geometry) = self.geometry.take() {
            geometry.destroy(&self.device);
        }

        unsafe {
            self.device
                .handle
                .destroy_command_pool(self.command_pool, None);
            for &framebuffer in &self.framebuffers {
                self.device.handle.destroy_framebuffer(framebuffer, None);
            }
            self.device.handle.destroy_render_pass(self.render_pass, None);
        }
    }
}
