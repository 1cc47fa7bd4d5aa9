use ash::vk;

use crate::error::{PipelineBuildError, Result};
use crate::shader::ShaderProgram;
use crate::winding::RasterizationState;
use crate::Device;

#[derive(Clone, Debug)]
pub struct PipelineDesc {
    pub vertex_input_binding_descriptions: Vec<vk::VertexInputBindingDescription>,
    pub vertex_input_attribute_descriptions: Vec<vk::VertexInputAttributeDescription>,
    pub rasterization: RasterizationState,
}

pub struct PipelineDescBuilder {
    desc: PipelineDesc,
}

pub struct Pipeline {
    pub handle: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub pipeline_desc: PipelineDesc,
}

impl Pipeline {
    /// Builds a graphics pipeline for `render_pass` with viewport and scissor
    /// left dynamic. Front face and cull mode are baked in from `desc`.
    pub fn new(
        device: &Device,
        desc: &PipelineDesc,
        program: &ShaderProgram,
        render_pass: vk::RenderPass,
    ) -> Result<Pipeline> {
        puffin::profile_function!();

        let shader_stage_create_infos = program.stage_create_infos();

        let vertex_input_state_info = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_attribute_descriptions(desc.vertex_input_attribute_descriptions.as_slice())
            .vertex_binding_descriptions(desc.vertex_input_binding_descriptions.as_slice());
        let vertex_input_assembly_state_info = vk::PipelineInputAssemblyStateCreateInfo {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            ..Default::default()
        };
        let viewport_state_info = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_info = desc.rasterization.to_vk();
        let multisample_state_info = vk::PipelineMultisampleStateCreateInfo {
            rasterization_samples: vk::SampleCountFlags::TYPE_1,
            ..Default::default()
        };
        let noop_stencil_state = vk::StencilOpState {
            fail_op: vk::StencilOp::KEEP,
            pass_op: vk::StencilOp::KEEP,
            depth_fail_op: vk::StencilOp::KEEP,
            compare_op: vk::CompareOp::ALWAYS,
            ..Default::default()
        };
        // Both quads sit at the same depth, draw order decides
        let depth_state_info = vk::PipelineDepthStencilStateCreateInfo {
            depth_test_enable: 0,
            depth_write_enable: 0,
            depth_compare_op: vk::CompareOp::LESS_OR_EQUAL,
            front: noop_stencil_state,
            back: noop_stencil_state,
            max_depth_bounds: 1.0,
            ..Default::default()
        };
        let color_blend_attachment_states = [vk::PipelineColorBlendAttachmentState {
            blend_enable: 0,
            src_color_blend_factor: vk::BlendFactor::SRC_COLOR,
            dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_DST_COLOR,
            color_blend_op: vk::BlendOp::ADD,
            src_alpha_blend_factor: vk::BlendFactor::ZERO,
            dst_alpha_blend_factor: vk::BlendFactor::ZERO,
            alpha_blend_op: vk::BlendOp::ADD,
            color_write_mask: vk::ColorComponentFlags::R
                | vk::ColorComponentFlags::G
                | vk::ColorComponentFlags::B
                | vk::ColorComponentFlags::A,
        }];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op(vk::LogicOp::CLEAR)
            .attachments(&color_blend_attachment_states);

        let dynamic_state = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state_info =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_state);

        let graphic_pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stage_create_infos)
            .vertex_input_state(&vertex_input_state_info)
            .input_assembly_state(&vertex_input_assembly_state_info)
            .viewport_state(&viewport_state_info)
            .rasterization_state(&rasterization_info)
            .multisample_state(&multisample_state_info)
            .depth_stencil_state(&depth_state_info)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state_info)
            .layout(program.pipeline_layout)
            .render_pass(render_pass)
            .subpass(0);

        let graphics_pipelines = unsafe {
            device
                .handle
                .create_graphics_pipelines(
                    vk::PipelineCache::null(),
                    &[graphic_pipeline_info.build()],
                    None,
                )
                .map_err(|(_, result)| PipelineBuildError::Rejected(result))?
        };

        let handle = graphics_pipelines[0];
        device.set_debug_name(
            vk::ObjectType::PIPELINE,
            vk::Handle::as_raw(handle),
            "quad pipeline",
        );

        Ok(Pipeline {
            handle,
            pipeline_layout: program.pipeline_layout,
            pipeline_desc: desc.clone(),
        })
    }

    /// The layout belongs to the shader program and outlives the pipeline.
    pub fn destroy(self, device: &Device) {
        unsafe {
            device.handle.destroy_pipeline(self.handle, None);
        }
    }
}

impl PipelineDesc {
    pub fn builder() -> PipelineDescBuilder {
        PipelineDescBuilder::new()
    }
}

impl Default for PipelineDescBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineDescBuilder {
    pub fn new() -> Self {
        Self {
            desc: PipelineDesc {
                vertex_input_binding_descriptions: Vec::new(),
                vertex_input_attribute_descriptions: Vec::new(),
                rasterization: RasterizationState::default(),
            },
        }
    }

    pub fn vertex_input_binding_descriptions(
        mut self,
        descriptions: Vec<vk::VertexInputBindingDescription>,
    ) -> Self {
        self.desc.vertex_input_binding_descriptions = descriptions;
        self
    }

    pub fn vertex_input_attribute_descriptions(
        mut self,
        descriptions: Vec<vk::VertexInputAttributeDescription>,
    ) -> Self {
        self.desc.vertex_input_attribute_descriptions = descriptions;
        self
    }

    pub fn quad_vertex_layout(mut self) -> Self {
        self.desc.vertex_input_binding_descriptions =
            crate::quad::vertex_input_binding_descriptions();
        self.desc.vertex_input_attribute_descriptions =
            crate::quad::vertex_input_attribute_descriptions();
        self
    }

    pub fn rasterization(mut self, state: RasterizationState) -> Self {
        self.desc.rasterization = state;
        self
    }

    pub fn build(self) -> PipelineDesc {
        self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::winding::{CullMode, FrontFace};

    #[test]
    fn quad_layout_matches_vertex_struct() {
        let desc = PipelineDesc::builder().quad_vertex_layout().build();

        assert_eq!(desc.vertex_input_binding_descriptions.len(), 1);
        assert_eq!(
            desc.vertex_input_binding_descriptions[0].stride as usize,
            std::mem::size_of::<crate::quad::QuadVertex>()
        );
        assert_eq!(desc.vertex_input_attribute_descriptions.len(), 2);
    }

    #[test]
    fn rasterization_defaults_to_ccw_back_culling() {
        let desc = PipelineDesc::builder().build();
        let info = desc.rasterization.to_vk();

        assert_eq!(info.front_face, vk::FrontFace::COUNTER_CLOCKWISE);
        assert_eq!(info.cull_mode, vk::CullModeFlags::BACK);
    }

    #[test]
    fn descs_differ_only_by_rasterization() {
        let a = PipelineDesc::builder().quad_vertex_layout().build();
        let b = PipelineDesc::builder()
            .quad_vertex_layout()
            .rasterization(RasterizationState {
                front_face: FrontFace::Clockwise,
                cull_mode: CullMode::None,
            })
            .build();

        assert_ne!(a.rasterization, b.rasterization);
        assert_eq!(
            a.vertex_input_attribute_descriptions.len(),
            b.vertex_input_attribute_descriptions.len()
        );
    }
}
