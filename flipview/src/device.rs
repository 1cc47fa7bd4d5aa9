use ash::extensions::khr::Surface;
use ash::extensions::khr::Swapchain;
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use std::ffi::CStr;
use std::sync::{Arc, Mutex};

use crate::error::{InitializationError, Result, VkResultExt};

pub struct Device {
    pub handle: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    pub queue: vk::Queue,
    pub cmd_pool: vk::CommandPool,
    pub setup_cmd_buf: vk::CommandBuffer,
    pub setup_fence: vk::Fence,
    pub queue_family_index: u32,
    pub gpu_allocator: Arc<Mutex<Allocator>>,
    pub debug_utils: Option<ash::extensions::ext::DebugUtils>,
}

impl Device {
    pub fn new(
        instance: &ash::Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        debug_utils: Option<ash::extensions::ext::DebugUtils>,
    ) -> Result<Device> {
        unsafe {
            let physical_devices = instance
                .enumerate_physical_devices()
                .init("enumerate physical devices")?;

            let (physical_device, queue_family_index) = physical_devices
                .iter()
                .find_map(|&physical_device| {
                    instance
                        .get_physical_device_queue_family_properties(physical_device)
                        .iter()
                        .enumerate()
                        .position(|(index, info)| {
                            info.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                                && surface_loader
                                    .get_physical_device_surface_support(
                                        physical_device,
                                        index as u32,
                                        surface,
                                    )
                                    .unwrap_or(false)
                        })
                        .map(|index| (physical_device, index as u32))
                })
                .ok_or(InitializationError::NoSuitableDevice)?;

            let properties = instance.get_physical_device_properties(physical_device);
            log::info!(
                "Using {:?}",
                CStr::from_ptr(properties.device_name.as_ptr())
            );

            // Negative viewport heights need VK_KHR_maintenance1 on Vulkan 1.0
            let device_extension_names_raw = [
                Swapchain::name().as_ptr(),
                vk::KhrMaintenance1Fn::name().as_ptr(),
            ];
            let device_features = vk::PhysicalDeviceFeatures::default();

            let queue_priorities = [1.0];
            let queue_info = vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(queue_family_index)
                .queue_priorities(&queue_priorities);

            let device_create_info = vk::DeviceCreateInfo::builder()
                .queue_create_infos(std::slice::from_ref(&queue_info))
                .enabled_extension_names(&device_extension_names_raw)
                .enabled_features(&device_features);

            let device: ash::Device = instance
                .create_device(physical_device, &device_create_info, None)
                .init("create the logical device")?;

            let present_queue = device.get_device_queue(queue_family_index, 0);

            let (cmd_pool, setup_cmd_buf) =
                Device::create_setup_command_buffer(&device, queue_family_index)?;

            let setup_fence = device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .init("create the setup fence")?;

            let gpu_allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
            })
            .map_err(|source| InitializationError::Allocation {
                what: "the device allocator".to_string(),
                source,
            })?;

            Ok(Device {
                handle: device,
                physical_device,
                queue: present_queue,
                queue_family_index,
                cmd_pool,
                setup_cmd_buf,
                setup_fence,
                gpu_allocator: Arc::new(Mutex::new(gpu_allocator)),
                debug_utils,
            })
        }
    }

    fn create_setup_command_buffer(
        device: &ash::Device,
        queue_family_index: u32,
    ) -> Result<(vk::CommandPool, vk::CommandBuffer)> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .init("create the setup command pool")?
        };

        let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_buffer_count(1)
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY);

        let command_buffers = unsafe {
            device
                .allocate_command_buffers(&command_buffer_allocate_info)
                .init("allocate the setup command buffer")?
        };

        Ok((pool, command_buffers[0]))
    }

    /// Records `recording_function` into the setup command buffer, submits it and
    /// waits for completion. Used for uploads during initialization.
    pub fn execute_and_submit<F: FnOnce(&Device, vk::CommandBuffer)>(
        &self,
        recording_function: F,
    ) -> Result<()> {
        unsafe {
            self.handle
                .reset_command_buffer(
                    self.setup_cmd_buf,
                    vk::CommandBufferResetFlags::RELEASE_RESOURCES,
                )
                .init("reset the setup command buffer")?;

            let command_buffer_begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.handle
                .begin_command_buffer(self.setup_cmd_buf, &command_buffer_begin_info)
                .init("begin the setup command buffer")?;

            recording_function(self, self.setup_cmd_buf);

            self.handle
                .end_command_buffer(self.setup_cmd_buf)
                .init("end the setup command buffer")?;

            let command_buffers = [self.setup_cmd_buf];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);

            self.handle
                .queue_submit(self.queue, &[submit_info.build()], self.setup_fence)
                .init("submit setup commands")?;

            self.handle
                .wait_for_fences(&[self.setup_fence], true, std::u64::MAX)
                .init("wait for setup commands")?;

            self.handle
                .reset_fences(&[self.setup_fence])
                .init("reset the setup fence")?;
        }

        Ok(())
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.handle.device_wait_idle() }.submit("wait for the device to become idle")
    }

    pub fn set_debug_name(&self, object_type: vk::ObjectType, object_handle: u64, name: &str) {
        let debug_utils = match &self.debug_utils {
            Some(debug_utils) => debug_utils,
            None => return,
        };

        let name = match std::ffi::CString::new(name) {
            Ok(name) => name,
            Err(_) => return,
        };

        let name_info = vk::DebugUtilsObjectNameInfoEXT::builder()
            .object_type(object_type)
            .object_handle(object_handle)
            .object_name(&name)
            .build();

        unsafe {
            if let Err(err) =
                debug_utils.set_debug_utils_object_name(self.handle.handle(), &name_info)
            {
                log::warn!("Failed to set debug name {:?}: {}", name, err);
            }
        }
    }
}
