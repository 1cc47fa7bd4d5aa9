use ash::util::*;
use ash::vk;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::ffi::CStr;
use std::fs;
use std::io::Cursor;

use crate::error::{InitializationError, Result, VkResultExt};

type DescriptorSetMap = BTreeMap<u32, BTreeMap<u32, rspirv_reflect::DescriptorInfo>>;
pub type BindingMap = BTreeMap<String, Binding>;

#[derive(Debug, Clone)]
pub struct Binding {
    pub set: u32,
    pub binding: u32,
    pub info: rspirv_reflect::DescriptorInfo,
}

#[derive(Default)]
pub struct Reflection {
    pub descriptor_set_reflections: DescriptorSetMap,
    pub binding_mappings: HashMap<String, Binding>,
}

impl Reflection {
    pub fn new(shader_stages: &[&[u8]]) -> Result<Reflection> {
        let mut descriptor_sets_combined: DescriptorSetMap = BTreeMap::new();

        // Combine reflection information from all shader stages
        for shader_stage in shader_stages {
            let stage_reflection = rspirv_reflect::Reflection::new_from_spirv(shader_stage)
                .map_err(|err| InitializationError::ShaderReflection(format!("{:?}", err)))?;

            let descriptor_sets = stage_reflection
                .get_descriptor_sets()
                .map_err(|err| InitializationError::ShaderReflection(format!("{:?}", err)))?;

            for (set, descriptor_set) in descriptor_sets {
                let existing_descriptor_set = descriptor_sets_combined.entry(set).or_default();
                for (binding, descriptor) in descriptor_set {
                    if let Some(existing_descriptor) = existing_descriptor_set.get(&binding) {
                        if descriptor.ty != existing_descriptor.ty
                            || descriptor.name != existing_descriptor.name
                        {
                            return Err(InitializationError::ShaderReflection(format!(
                                "set {} binding {} inconsistent between shader stages",
                                set, binding
                            ))
                            .into());
                        }
                    } else {
                        existing_descriptor_set.insert(binding, descriptor);
                    }
                }
            }
        }

        // Retrieve binding and set mappings
        let binding_mappings: HashMap<String, Binding> = descriptor_sets_combined
            .iter()
            .flat_map(|(set_key, set_val)| {
                set_val.iter().map(move |(binding_key, binding_val)| {
                    (
                        binding_val.name.clone(),
                        Binding {
                            set: *set_key,
                            binding: *binding_key,
                            info: binding_val.clone(),
                        },
                    )
                })
            })
            .collect();

        Ok(Reflection {
            descriptor_set_reflections: descriptor_sets_combined,
            binding_mappings,
        })
    }

    pub fn get_set_mappings(&self, set: u32) -> BindingMap {
        self.binding_mappings
            .iter()
            .filter(|(_, val)| val.set == set)
            .map(|(key, val)| (key.clone(), val.clone()))
            .collect::<BindingMap>()
    }
}

pub fn compile_glsl_shader(path: &str) -> Result<shaderc::CompilationArtifact> {
    let source = fs::read_to_string(path).map_err(|source| InitializationError::Io {
        path: path.to_string(),
        source,
    })?;

    let shader_kind = if path.ends_with(".vert") {
        shaderc::ShaderKind::Vertex
    } else if path.ends_with(".frag") {
        shaderc::ShaderKind::Fragment
    } else {
        shaderc::ShaderKind::InferFromSource
    };

    let compile_error = |source| InitializationError::ShaderCompile {
        path: path.to_string(),
        source,
    };

    let mut compiler = shaderc::Compiler::new().ok_or_else(|| {
        InitializationError::ShaderReflection("shaderc compiler unavailable".to_string())
    })?;
    let mut options = shaderc::CompileOptions::new().ok_or_else(|| {
        InitializationError::ShaderReflection("shaderc options unavailable".to_string())
    })?;
    options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );
    options.set_generate_debug_info();

    let binary_result = compiler
        .compile_into_spirv(&source, shader_kind, path, "main", Some(&options))
        .map_err(compile_error)?;

    log::debug!("Compiled \"{}\"", path);

    Ok(binary_result)
}

pub fn to_vk_descriptor_type(ty: rspirv_reflect::DescriptorType) -> Result<vk::DescriptorType> {
    Ok(match ty {
        rspirv_reflect::DescriptorType::COMBINED_IMAGE_SAMPLER => {
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        }
        rspirv_reflect::DescriptorType::SAMPLED_IMAGE => vk::DescriptorType::SAMPLED_IMAGE,
        rspirv_reflect::DescriptorType::UNIFORM_BUFFER => vk::DescriptorType::UNIFORM_BUFFER,
        rspirv_reflect::DescriptorType::STORAGE_BUFFER => vk::DescriptorType::STORAGE_BUFFER,
        other => {
            return Err(InitializationError::ShaderReflection(format!(
                "unsupported descriptor type {:?}",
                other
            ))
            .into())
        }
    })
}

pub fn create_layouts_from_reflection(
    device: &ash::Device,
    reflection: &Reflection,
) -> Result<(vk::PipelineLayout, Vec<vk::DescriptorSetLayout>)> {
    let mut descriptor_sets_layouts = Vec::new();

    for descriptor_set in reflection.descriptor_set_reflections.values() {
        let descriptor_set_layout_bindings = descriptor_set
            .iter()
            .map(|(binding, descriptor_info)| {
                Ok(vk::DescriptorSetLayoutBinding::builder()
                    .binding(*binding)
                    .descriptor_type(to_vk_descriptor_type(descriptor_info.ty)?)
                    .descriptor_count(1)
                    .stage_flags(vk::ShaderStageFlags::ALL_GRAPHICS)
                    .build())
            })
            .collect::<Result<Vec<_>>>()?;

        let descriptor_sets_layout_info = vk::DescriptorSetLayoutCreateInfo::builder()
            .bindings(&descriptor_set_layout_bindings)
            .build();

        let layout = unsafe {
            device
                .create_descriptor_set_layout(&descriptor_sets_layout_info, None)
                .init("create a descriptor set layout")?
        };
        descriptor_sets_layouts.push(layout);
    }

    let pipeline_layout_create_info =
        vk::PipelineLayoutCreateInfo::builder().set_layouts(&descriptor_sets_layouts);

    let pipeline_layout = unsafe {
        device
            .create_pipeline_layout(&pipeline_layout_create_info, None)
            .init("create the pipeline layout")?
    };

    Ok((pipeline_layout, descriptor_sets_layouts))
}

pub fn create_shader_module(
    mut spv_file: Cursor<&[u8]>,
    device: &ash::Device,
) -> Result<vk::ShaderModule> {
    let shader_code = read_spv(&mut spv_file).map_err(|source| InitializationError::Io {
        path: "<spirv>".to_string(),
        source,
    })?;
    let shader_info = vk::ShaderModuleCreateInfo::builder().code(&shader_code);

    unsafe {
        device
            .create_shader_module(&shader_info, None)
            .init("create a shader module")
    }
}

/// Vertex + fragment stages with the layouts reflected from them. Built once
/// and shared by every pipeline rebuilt from it.
pub struct ShaderProgram {
    pub vertex_module: vk::ShaderModule,
    pub fragment_module: vk::ShaderModule,
    pub reflection: Reflection,
    pub pipeline_layout: vk::PipelineLayout,
    pub descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
}

impl ShaderProgram {
    pub fn new(device: &ash::Device, vertex_path: &str, fragment_path: &str) -> Result<Self> {
        puffin::profile_function!();

        let vertex_spv_file = compile_glsl_shader(vertex_path)?;
        let fragment_spv_file = compile_glsl_shader(fragment_path)?;

        let vertex_spv_file = vertex_spv_file.as_binary_u8();
        let fragment_spv_file = fragment_spv_file.as_binary_u8();

        let reflection = Reflection::new(&[vertex_spv_file, fragment_spv_file])?;

        let (pipeline_layout, descriptor_set_layouts) =
            create_layouts_from_reflection(device, &reflection)?;

        let vertex_module = create_shader_module(Cursor::new(vertex_spv_file), device)?;
        let fragment_module = create_shader_module(Cursor::new(fragment_spv_file), device)?;

        Ok(ShaderProgram {
            vertex_module,
            fragment_module,
            reflection,
            pipeline_layout,
            descriptor_set_layouts,
        })
    }

    pub fn stage_create_infos(&self) -> [vk::PipelineShaderStageCreateInfo; 2] {
        let shader_entry_name = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };
        [
            vk::PipelineShaderStageCreateInfo {
                module: self.vertex_module,
                p_name: shader_entry_name.as_ptr(),
                stage: vk::ShaderStageFlags::VERTEX,
                ..Default::default()
            },
            vk::PipelineShaderStageCreateInfo {
                module: self.fragment_module,
                p_name: shader_entry_name.as_ptr(),
                stage: vk::ShaderStageFlags::FRAGMENT,
                ..Default::default()
            },
        ]
    }

    pub fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_shader_module(self.vertex_module, None);
            device.destroy_shader_module(self.fragment_module, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            for layout in &self.descriptor_set_layouts {
                device.destroy_descriptor_set_layout(*layout, None);
            }
        }
    }
}
