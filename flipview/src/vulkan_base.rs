use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::run_return::EventLoopExtRunReturn,
    window::WindowBuilder,
};

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::Surface;
use ash::extensions::khr::Swapchain;
use ash::vk;

use std::borrow::Cow;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::rc::Rc;

use crate::device::*;
use crate::error::{InitializationError, Result, VkResultExt};

const VALIDATION_LAYER: &[u8] = b"VK_LAYER_KHRONOS_validation\0";

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let callback_data = *p_callback_data;
    let message_id_number: i32 = callback_data.message_id_number as i32;

    let message_id_name = if callback_data.p_message_id_name.is_null() {
        Cow::from("")
    } else {
        CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy()
    };

    let message = if callback_data.p_message.is_null() {
        Cow::from("")
    } else {
        CStr::from_ptr(callback_data.p_message).to_string_lossy()
    };

    let level = if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Debug
    } else {
        log::Level::Trace
    };

    log::log!(
        level,
        "{:?} [{} ({})] : {}",
        message_type,
        message_id_name,
        message_id_number,
        message,
    );

    vk::FALSE
}

/// Window and presentation settings for [`VulkanBase::new`].
#[derive(Clone, Debug)]
pub struct WindowDesc {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub validation: bool,
}

pub struct VulkanBase {
    pub window: winit::window::Window,
    event_loop: RefCell<winit::event_loop::EventLoop<()>>,
    _entry: ash::Entry,
    instance: ash::Instance,
    pub device: Rc<Device>,
    surface: vk::SurfaceKHR,
    surface_loader: Surface,
    command_pool: vk::CommandPool,
    pub draw_command_buffer: vk::CommandBuffer,
    pub present_images: Vec<vk::Image>,
    pub present_image_views: Vec<vk::ImageView>,
    pub image_count: u32,
    pub present_complete_semaphore: vk::Semaphore,
    pub rendering_complete_semaphore: vk::Semaphore,
    pub surface_format: vk::SurfaceFormatKHR,
    pub surface_resolution: vk::Extent2D,
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_loader: ash::extensions::khr::Swapchain,
    pub draw_commands_reuse_fence: vk::Fence,
    debug_utils_loader: Option<DebugUtils>,
    debug_callback: vk::DebugUtilsMessengerEXT,
}

impl VulkanBase {
    pub fn new(desc: &WindowDesc) -> Result<VulkanBase> {
        puffin::profile_function!();

        let entry = ash::Entry::linked();

        let (window, event_loop) = VulkanBase::create_window(desc)?;

        let validation = desc.validation && VulkanBase::validation_layer_available(&entry);
        if desc.validation && !validation {
            log::warn!("Validation requested but VK_LAYER_KHRONOS_validation is not installed");
        }

        let instance = VulkanBase::create_instance(&entry, &window, &desc.title, validation)?;

        let (debug_utils_loader, debug_callback) = if validation {
            let (loader, callback) = VulkanBase::create_debug_utils(&entry, &instance)?;
            (Some(loader), callback)
        } else {
            (None, vk::DebugUtilsMessengerEXT::null())
        };

        let (surface, surface_loader) = VulkanBase::create_surface(&entry, &instance, &window)?;

        let device = Device::new(&instance, surface, &surface_loader, debug_utils_loader.clone())?;

        let (swapchain, swapchain_loader, surface_format, surface_resolution) =
            VulkanBase::create_swapchain(
                &instance,
                device.physical_device,
                &device.handle,
                surface,
                &surface_loader,
                desc,
            )?;

        let (command_pool, draw_command_buffer) =
            VulkanBase::create_command_buffers(&device.handle, device.queue_family_index)?;

        let (present_images, present_image_views) = VulkanBase::setup_swapchain_images(
            &device.handle,
            swapchain,
            &swapchain_loader,
            surface_format,
        )?;

        let (present_complete_semaphore, rendering_complete_semaphore) =
            VulkanBase::create_semaphores(&device.handle)?;

        let fence_create_info =
            vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

        let draw_commands_reuse_fence = unsafe {
            device
                .handle
                .create_fence(&fence_create_info, None)
                .init("create the frame fence")?
        };

        log::info!(
            "Swapchain {}x{} {:?} with {} images",
            surface_resolution.width,
            surface_resolution.height,
            surface_format.format,
            present_images.len()
        );

        Ok(VulkanBase {
            window,
            event_loop: RefCell::new(event_loop),
            _entry: entry,
            instance,
            device: Rc::new(device),
            surface,
            surface_loader,
            command_pool,
            draw_command_buffer,
            image_count: present_images.len() as u32,
            present_images,
            present_image_views,
            present_complete_semaphore,
            rendering_complete_semaphore,
            surface_format,
            surface_resolution,
            swapchain,
            swapchain_loader,
            draw_commands_reuse_fence,
            debug_utils_loader,
            debug_callback,
        })
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    fn create_window(
        desc: &WindowDesc,
    ) -> Result<(winit::window::Window, winit::event_loop::EventLoop<()>)> {
        let event_loop = EventLoop::new();
        let window = WindowBuilder::new()
            .with_title(desc.title.as_str())
            .with_inner_size(winit::dpi::PhysicalSize::new(desc.width, desc.height))
            .with_resizable(false)
            .build(&event_loop)
            .map_err(InitializationError::Window)?;

        Ok((window, event_loop))
    }

    fn validation_layer_available(entry: &ash::Entry) -> bool {
        let wanted = unsafe { CStr::from_bytes_with_nul_unchecked(VALIDATION_LAYER) };

        entry
            .enumerate_instance_layer_properties()
            .map(|layers| {
                layers
                    .iter()
                    .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == wanted)
            })
            .unwrap_or(false)
    }

    fn create_instance(
        entry: &ash::Entry,
        window: &winit::window::Window,
        title: &str,
        validation: bool,
    ) -> Result<ash::Instance> {
        let app_name = CString::new(title).unwrap_or_default();
        let engine_name = unsafe { CStr::from_bytes_with_nul_unchecked(b"flipview\0") };

        let layer_names_raw: Vec<*const c_char> = if validation {
            vec![VALIDATION_LAYER.as_ptr() as *const c_char]
        } else {
            Vec::new()
        };

        let surface_extensions = ash_window::enumerate_required_extensions(window)
            .init("query the surface instance extensions")?;
        let mut extension_names_raw: Vec<*const c_char> = surface_extensions.to_vec();
        if validation {
            extension_names_raw.push(DebugUtils::name().as_ptr());
        }

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(0)
            .engine_name(engine_name)
            .engine_version(0)
            .api_version(vk::make_api_version(0, 1, 0, 0));

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names_raw)
            .enabled_extension_names(&extension_names_raw);

        unsafe {
            entry
                .create_instance(&create_info, None)
                .init("create the Vulkan instance")
        }
    }

    fn create_debug_utils(
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let debug_utils_loader = DebugUtils::new(entry, instance);
        let debug_callback = unsafe {
            debug_utils_loader
                .create_debug_utils_messenger(&debug_info, None)
                .init("create the debug messenger")?
        };

        Ok((debug_utils_loader, debug_callback))
    }

    fn create_surface(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &winit::window::Window,
    ) -> Result<(vk::SurfaceKHR, Surface)> {
        let surface = unsafe {
            ash_window::create_surface(entry, instance, window, None)
                .init("create the window surface")?
        };
        let surface_loader = Surface::new(entry, instance);

        Ok((surface, surface_loader))
    }

    fn create_swapchain(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        desc: &WindowDesc,
    ) -> Result<(
        vk::SwapchainKHR,
        Swapchain,
        vk::SurfaceFormatKHR,
        vk::Extent2D,
    )> {
        unsafe {
            let surface_formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .init("query surface formats")?;
            let surface_format = surface_formats
                .iter()
                .copied()
                .find(|format| format.format == vk::Format::B8G8R8A8_UNORM)
                .or_else(|| surface_formats.first().copied())
                .ok_or(InitializationError::Vulkan {
                    what: "find a surface format",
                    source: vk::Result::ERROR_FORMAT_NOT_SUPPORTED,
                })?;

            let surface_capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .init("query surface capabilities")?;

            let mut desired_image_count = surface_capabilities.min_image_count + 1;
            if surface_capabilities.max_image_count > 0 {
                desired_image_count = desired_image_count.min(surface_capabilities.max_image_count);
            }

            let surface_resolution = match surface_capabilities.current_extent.width {
                std::u32::MAX => vk::Extent2D {
                    width: desc.width,
                    height: desc.height,
                },
                _ => surface_capabilities.current_extent,
            };
            let desired_transform = vk::SurfaceTransformFlagsKHR::IDENTITY;

            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .init("query present modes")?;
            let present_mode = present_modes
                .iter()
                .cloned()
                .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
                .unwrap_or(vk::PresentModeKHR::FIFO);

            let swapchain_loader = Swapchain::new(instance, device);

            let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
                .surface(surface)
                .min_image_count(desired_image_count)
                .image_color_space(surface_format.color_space)
                .image_format(surface_format.format)
                .image_extent(surface_resolution)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(desired_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .image_array_layers(1);

            let swapchain = swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .init("create the swapchain")?;

            Ok((
                swapchain,
                swapchain_loader,
                surface_format,
                surface_resolution,
            ))
        }
    }

    fn create_command_buffers(
        device: &ash::Device,
        queue_family_index: u32,
    ) -> Result<(vk::CommandPool, vk::CommandBuffer)> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .init("create the frame command pool")?
        };

        let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_buffer_count(1)
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY);

        let command_buffers = unsafe {
            device
                .allocate_command_buffers(&command_buffer_allocate_info)
                .init("allocate the frame command buffer")?
        };

        Ok((pool, command_buffers[0]))
    }

    fn setup_swapchain_images(
        device: &ash::Device,
        swapchain: vk::SwapchainKHR,
        swapchain_loader: &Swapchain,
        surface_format: vk::SurfaceFormatKHR,
    ) -> Result<(Vec<vk::Image>, Vec<vk::ImageView>)> {
        unsafe {
            let present_images = swapchain_loader
                .get_swapchain_images(swapchain)
                .init("get the swapchain images")?;

            let present_image_views = present_images
                .iter()
                .map(|&image| {
                    let create_view_info = vk::ImageViewCreateInfo::builder()
                        .view_type(vk::ImageViewType::TYPE_2D)
                        .format(surface_format.format)
                        .components(vk::ComponentMapping {
                            r: vk::ComponentSwizzle::R,
                            g: vk::ComponentSwizzle::G,
                            b: vk::ComponentSwizzle::B,
                            a: vk::ComponentSwizzle::A,
                        })
                        .subresource_range(vk::ImageSubresourceRange {
                            aspect_mask: vk::ImageAspectFlags::COLOR,
                            base_mip_level: 0,
                            level_count: 1,
                            base_array_layer: 0,
                            layer_count: 1,
                        })
                        .image(image);
                    device
                        .create_image_view(&create_view_info, None)
                        .init("create a swapchain image view")
                })
                .collect::<Result<Vec<_>>>()?;

            Ok((present_images, present_image_views))
        }
    }

    fn create_semaphores(device: &ash::Device) -> Result<(vk::Semaphore, vk::Semaphore)> {
        unsafe {
            let semaphore_create_info = vk::SemaphoreCreateInfo::default();

            let present_complete_semaphore = device
                .create_semaphore(&semaphore_create_info, None)
                .init("create a semaphore")?;
            let rendering_complete_semaphore = device
                .create_semaphore(&semaphore_create_info, None)
                .init("create a semaphore")?;

            Ok((present_complete_semaphore, rendering_complete_semaphore))
        }
    }

    /// Waits until the previous frame's commands finished, then acquires the
    /// next swapchain image.
    pub fn prepare_frame(&self) -> Result<u32> {
        puffin::profile_function!();

        unsafe {
            self.device
                .handle
                .wait_for_fences(&[self.draw_commands_reuse_fence], true, std::u64::MAX)
                .submit("wait for the frame fence")?;

            let (present_index, _) = self
                .swapchain_loader
                .acquire_next_image(
                    self.swapchain,
                    std::u64::MAX,
                    self.present_complete_semaphore,
                    vk::Fence::null(),
                )
                .submit("acquire the next swapchain image")?;

            Ok(present_index)
        }
    }

    /// Resets and begins the frame command buffer, runs `render_commands` and
    /// ends it again.
    pub fn record_commands<F: FnOnce(&Device, vk::CommandBuffer) -> Result<()>>(
        &self,
        render_commands: F,
    ) -> Result<()> {
        let device = &self.device.handle;
        let command_buffer = self.draw_command_buffer;

        unsafe {
            device
                .reset_command_buffer(
                    command_buffer,
                    vk::CommandBufferResetFlags::RELEASE_RESOURCES,
                )
                .submit("reset the frame command buffer")?;

            let command_buffer_begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            device
                .begin_command_buffer(command_buffer, &command_buffer_begin_info)
                .submit("begin the frame command buffer")?;
        }

        render_commands(&self.device, command_buffer)?;

        unsafe {
            device
                .end_command_buffer(command_buffer)
                .submit("end the frame command buffer")
        }
    }

    pub fn submit_commands(&self) -> Result<()> {
        unsafe {
            self.device
                .handle
                .reset_fences(&[self.draw_commands_reuse_fence])
                .submit("reset the frame fence")?;

            let command_buffers = [self.draw_command_buffer];
            let wait_mask = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let wait_semaphores = [self.present_complete_semaphore];
            let signal_semaphores = [self.rendering_complete_semaphore];

            let submit_info = vk::SubmitInfo::builder()
                .wait_semaphores(&wait_semaphores)
                .signal_semaphores(&signal_semaphores)
                .wait_dst_stage_mask(&wait_mask)
                .command_buffers(&command_buffers);

            self.device
                .handle
                .queue_submit(
                    self.device.queue,
                    &[submit_info.build()],
                    self.draw_commands_reuse_fence,
                )
                .submit("submit the frame")
        }
    }

    pub fn present_frame(&self, present_index: u32) -> Result<()> {
        unsafe {
            let wait_semaphores = [self.rendering_complete_semaphore];
            let swapchains = [self.swapchain];
            let image_indices = [present_index];
            let present_info = vk::PresentInfoKHR::builder()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            self.swapchain_loader
                .queue_present(self.device.queue, &present_info)
                .submit("present the frame")?;
        }

        Ok(())
    }

    /// Runs the event loop until the window is closed or `user_function`
    /// fails. `user_function` is called once per loop iteration with the
    /// window events gathered since the previous call.
    pub fn run<F: FnMut(&[WindowEvent<'static>]) -> Result<()>>(
        &self,
        mut user_function: F,
    ) -> Result<()> {
        let mut events: Vec<WindowEvent<'static>> = Vec::new();
        let mut outcome = Ok(());

        self.event_loop
            .borrow_mut()
            .run_return(|event, _, control_flow| {
                *control_flow = ControlFlow::Poll;

                match event {
                    Event::WindowEvent {
                        event: WindowEvent::CloseRequested,
                        window_id,
                    } if window_id == self.window.id() => *control_flow = ControlFlow::Exit,
                    Event::WindowEvent { event, window_id } if window_id == self.window.id() => {
                        if let Some(event) = event.to_static() {
                            events.push(event);
                        }
                    }
                    Event::MainEventsCleared => {
                        puffin::GlobalProfiler::lock().new_frame();

                        if let Err(err) = user_function(&events) {
                            outcome = Err(err);
                            *control_flow = ControlFlow::Exit;
                        }
                        events.clear();
                    }
                    _ => (),
                }
            });

        outcome
    }
}

impl Drop for VulkanBase {
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            log::error!("Failed waiting for the device before teardown: {}", err);
        }

        unsafe {
            let device = &self.device.handle;
            device.destroy_semaphore(self.present_complete_semaphore, None);
            device.destroy_semaphore(self.rendering_complete_semaphore, None);
            device.destroy_fence(self.draw_commands_reuse_fence, None);
            device.destroy_command_pool(self.command_pool, None);
            for &image_view in &self.present_image_views {
                device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);

            if let Some(debug_utils_loader) = &self.debug_utils_loader {
                debug_utils_loader.destroy_debug_utils_messenger(self.debug_callback, None);
            }
        }
    }
}
