use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc};
use gpu_allocator::MemoryLocation;

use crate::error::{InitializationError, Result, VkResultExt};
use crate::Device;

pub struct Image {
    pub image: vk::Image,
    pub image_view: vk::ImageView,
    pub allocation: Allocation,
    pub format: vk::Format,
    pub width: u32,
    pub height: u32,
}

impl Image {
    pub fn new(
        device: &Device,
        width: u32,
        height: u32,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        name: &str,
    ) -> Result<Image> {
        puffin::profile_function!();

        unsafe {
            let image_create_info = vk::ImageCreateInfo {
                image_type: vk::ImageType::TYPE_2D,
                format,
                extent: vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                },
                mip_levels: 1,
                array_layers: 1,
                samples: vk::SampleCountFlags::TYPE_1,
                tiling: vk::ImageTiling::OPTIMAL,
                usage,
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                ..Default::default()
            };
            let image = device
                .handle
                .create_image(&image_create_info, None)
                .init("create an image")?;

            let requirements = device.handle.get_image_memory_requirements(image);
            let allocation = device
                .gpu_allocator
                .lock()
                .expect("allocator lock poisoned")
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                })
                .map_err(|source| InitializationError::Allocation {
                    what: name.to_string(),
                    source,
                })?;

            device
                .handle
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .init("bind image memory")?;

            let image_view = Image::create_image_view(device, image, format)?;

            device.set_debug_name(vk::ObjectType::IMAGE, vk::Handle::as_raw(image), name);

            Ok(Image {
                image,
                image_view,
                allocation,
                format,
                width,
                height,
            })
        }
    }

    pub fn create_image_view(
        device: &Device,
        image: vk::Image,
        format: vk::Format,
    ) -> Result<vk::ImageView> {
        let image_view_info = vk::ImageViewCreateInfo {
            view_type: vk::ImageViewType::TYPE_2D,
            format,
            components: vk::ComponentMapping {
                r: vk::ComponentSwizzle::R,
                g: vk::ComponentSwizzle::G,
                b: vk::ComponentSwizzle::B,
                a: vk::ComponentSwizzle::A,
            },
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                level_count: 1,
                layer_count: 1,
                ..Default::default()
            },
            image,
            ..Default::default()
        };

        unsafe {
            device
                .handle
                .create_image_view(&image_view_info, None)
                .init("create an image view")
        }
    }

    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange::builder()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .layer_count(1)
            .level_count(1)
            .build()
    }

    pub fn destroy(self, device: &Device) {
        unsafe {
            device.handle.destroy_image_view(self.image_view, None);
            device.handle.destroy_image(self.image, None);
        }

        if let Err(err) = device
            .gpu_allocator
            .lock()
            .expect("allocator lock poisoned")
            .free(self.allocation)
        {
            log::error!("Failed to free image memory: {}", err);
        }
    }
}
