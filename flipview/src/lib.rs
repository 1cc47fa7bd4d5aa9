pub mod buffer;
pub mod demo;
pub mod descriptor_set;
pub mod device;
pub mod drop_guard;
pub mod error;
pub mod fps_timer;
pub mod frame;
pub mod geometry;
pub mod image;
pub mod pipeline;
pub mod pipeline_slot;
pub mod quad;
pub mod renderer;
pub mod settings;
pub mod shader;
pub mod synch;
pub mod texture;
pub mod viewport;
pub mod vulkan_base;
pub mod winding;

pub use buffer::Buffer;
pub use demo::{Demo, RenderBackend};
pub use device::Device;
pub use error::{Error, InitializationError, PipelineBuildError, Result, SubmissionError};
pub use fps_timer::FpsTimer;
pub use frame::{record_frame, DrawCommand, FramePlan, TextureSlot};
pub use geometry::GeometryStore;
pub use image::Image;
pub use pipeline::{Pipeline, PipelineDesc};
pub use pipeline_slot::PipelineSlot;
pub use quad::{IndexSet, QuadOrientation, QuadVertex, VertexSet};
pub use renderer::{RendererPaths, VulkanRenderer};
pub use settings::{DemoSettings, SettingsChange};
pub use texture::Texture;
pub use viewport::{compute_viewport, full_scissor, Viewport};
pub use vulkan_base::{VulkanBase, WindowDesc};
pub use winding::{CullMode, FrontFace, RasterizationState, Winding};
