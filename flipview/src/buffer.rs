use ash::util::*;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc};
use gpu_allocator::MemoryLocation;
use std::mem::align_of;

use crate::device::*;
use crate::error::{InitializationError, Result, VkResultExt};
use crate::image::*;

pub struct Buffer {
    pub buffer: vk::Buffer,
    pub allocation: Allocation,
    pub size: u64,
}

impl Buffer {
    pub fn create_buffer(
        device: &Device,
        size: u64,
        usage_flags: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<Buffer> {
        unsafe {
            let buffer_info = vk::BufferCreateInfo::builder()
                .size(size)
                .usage(usage_flags)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device
                .handle
                .create_buffer(&buffer_info, None)
                .init("create a buffer")?;

            let requirements = device.handle.get_buffer_memory_requirements(buffer);

            let allocation = device
                .gpu_allocator
                .lock()
                .expect("allocator lock poisoned")
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                })
                .map_err(|source| InitializationError::Allocation {
                    what: name.to_string(),
                    source,
                })?;

            device
                .handle
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .init("bind buffer memory")?;

            device.set_debug_name(vk::ObjectType::BUFFER, vk::Handle::as_raw(buffer), name);

            Ok(Buffer {
                buffer,
                allocation,
                size,
            })
        }
    }

    /// Host-visible buffer filled with `initial_data`.
    pub fn new<T: Copy>(
        device: &Device,
        initial_data: &[T],
        usage_flags: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<Buffer> {
        let size = std::mem::size_of_val(initial_data) as u64;
        let buffer =
            Buffer::create_buffer(device, size, usage_flags, MemoryLocation::CpuToGpu, name)?;

        buffer.update_memory(initial_data)?;

        Ok(buffer)
    }

    pub fn update_memory<T: Copy>(&self, data: &[T]) -> Result<()> {
        let mapped_ptr = self
            .allocation
            .mapped_ptr()
            .ok_or(InitializationError::Vulkan {
                what: "map buffer memory",
                source: vk::Result::ERROR_MEMORY_MAP_FAILED,
            })?;

        unsafe {
            let mut slice = Align::new(
                mapped_ptr.as_ptr(),
                align_of::<T>() as u64,
                self.allocation.size(),
            );

            slice.copy_from_slice(data);
        }

        Ok(())
    }

    pub fn copy_to_image(&self, device: &Device, cb: vk::CommandBuffer, image: &Image) {
        let buffer_copy_regions = vk::BufferImageCopy::builder()
            .image_subresource(
                vk::ImageSubresourceLayers::builder()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .layer_count(1)
                    .build(),
            )
            .image_extent(vk::Extent3D {
                width: image.width,
                height: image.height,
                depth: 1,
            });

        unsafe {
            device.handle.cmd_copy_buffer_to_image(
                cb,
                self.buffer,
                image.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[buffer_copy_regions.build()],
            );
        }
    }

    pub fn destroy(self, device: &Device) {
        unsafe {
            device.handle.destroy_buffer(self.buffer, None);
        }

        if let Err(err) = device
            .gpu_allocator
            .lock()
            .expect("allocator lock poisoned")
            .free(self.allocation)
        {
            log::error!("Failed to free buffer memory: {}", err);
        }
    }
}
