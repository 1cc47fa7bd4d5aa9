use ash::vk;

use crate::device::*;
use crate::error::{InitializationError, Result, VkResultExt};
use crate::shader::*;
use crate::texture::*;

pub struct DescriptorSet {
    pub handle: vk::DescriptorSet,
    pool: vk::DescriptorPool,
    binding_map: BindingMap,
}

impl DescriptorSet {
    pub fn new(
        device: &Device,
        layout: vk::DescriptorSetLayout,
        binding_map: BindingMap,
    ) -> Result<DescriptorSet> {
        let descriptor_pool_sizes = binding_map
            .values()
            .map(|val| {
                Ok(vk::DescriptorPoolSize::builder()
                    .ty(to_vk_descriptor_type(val.info.ty)?)
                    .descriptor_count(1)
                    .build())
            })
            .collect::<Result<Vec<_>>>()?;

        let descriptor_pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&descriptor_pool_sizes)
            .max_sets(1);

        let pool = unsafe {
            device
                .handle
                .create_descriptor_pool(&descriptor_pool_info, None)
                .init("create a descriptor pool")?
        };

        let set_layouts = [layout];
        let descriptor_alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts)
            .build();

        let descriptor_sets = unsafe {
            device
                .handle
                .allocate_descriptor_sets(&descriptor_alloc_info)
                .init("allocate a descriptor set")?
        };

        Ok(DescriptorSet {
            handle: descriptor_sets[0],
            pool,
            binding_map,
        })
    }

    pub fn write_combined_image(&self, device: &Device, name: &str, texture: &Texture) -> Result<()> {
        let binding = self
            .binding_map
            .get(name)
            .ok_or_else(|| InitializationError::MissingBinding(name.to_string()))?;

        let image_infos = [texture.descriptor_info];
        let descriptor_writes = vk::WriteDescriptorSet::builder()
            .dst_set(self.handle)
            .dst_binding(binding.binding)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_infos)
            .build();

        unsafe {
            device
                .handle
                .update_descriptor_sets(&[descriptor_writes], &[])
        };

        Ok(())
    }

    pub fn destroy(self, device: &Device) {
        unsafe {
            device.handle.destroy_descriptor_pool(self.pool, None);
        }
    }
}
