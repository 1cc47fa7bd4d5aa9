use ash::vk;
use gpu_allocator::MemoryLocation;

use crate::buffer::*;
use crate::device::*;
use crate::error::{InitializationError, Result, VkResultExt};
use crate::image::*;

pub struct Texture {
    pub image: Image,
    pub sampler: vk::Sampler,
    pub descriptor_info: vk::DescriptorImageInfo,
}

impl Texture {
    /// Loads an image file into a sampled texture. Rows are uploaded top to
    /// bottom, so texel row 0 is the top of the file.
    pub fn load(device: &Device, path: &str, format: vk::Format) -> Result<Texture> {
        let image = image::open(path).map_err(|source| InitializationError::Asset {
            path: path.to_string(),
            source,
        })?;

        let image = image.to_rgba8();
        let (width, height) = (image.width(), image.height());
        let image_data = image.into_raw();

        log::debug!("Loaded \"{}\" ({}x{})", path, width, height);

        Texture::create(device, &image_data, width, height, format, path)
    }

    pub fn create(
        device: &Device,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: vk::Format,
        debug_name: &str,
    ) -> Result<Texture> {
        let image = Image::new(
            device,
            width,
            height,
            format,
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            debug_name,
        )?;

        let staging_buffer = Buffer::create_buffer(
            device,
            std::mem::size_of_val(pixels) as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "texture staging",
        )?;
        staging_buffer.update_memory(pixels)?;

        let upload = device.execute_and_submit(|device, cb| {
            crate::synch::image_pipeline_barrier(
                device,
                cb,
                &image,
                vk_sync::AccessType::Nothing,
                vk_sync::AccessType::TransferWrite,
                true,
            );

            staging_buffer.copy_to_image(device, cb, &image);

            crate::synch::image_pipeline_barrier(
                device,
                cb,
                &image,
                vk_sync::AccessType::TransferWrite,
                vk_sync::AccessType::FragmentShaderReadSampledImageOrUniformTexelBuffer,
                false,
            );
        });
        staging_buffer.destroy(device);
        upload?;

        let sampler_info = vk::SamplerCreateInfo {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode_u: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_v: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_w: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            max_anisotropy: 1.0,
            border_color: vk::BorderColor::FLOAT_OPAQUE_WHITE,
            compare_op: vk::CompareOp::NEVER,
            min_lod: 0.0,
            max_lod: 1.0,
            ..Default::default()
        };

        let sampler = unsafe {
            device
                .handle
                .create_sampler(&sampler_info, None)
                .init("create a sampler")?
        };

        let descriptor_info = vk::DescriptorImageInfo {
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            image_view: image.image_view,
            sampler,
        };

        Ok(Texture {
            image,
            sampler,
            descriptor_info,
        })
    }

    pub fn destroy(self, device: &Device) {
        unsafe {
            device.handle.destroy_sampler(self.sampler, None);
        }
        self.image.destroy(device);
    }
}
