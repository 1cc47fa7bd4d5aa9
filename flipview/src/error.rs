use ash::vk;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("initialization failed")]
    Initialization(#[from] InitializationError),

    #[error("pipeline build failed")]
    PipelineBuild(#[from] PipelineBuildError),

    #[error("frame submission failed")]
    Submission(#[from] SubmissionError),
}

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("failed to create window")]
    Window(#[from] winit::error::OsError),

    #[error("Vulkan call failed while trying to {what}")]
    Vulkan {
        what: &'static str,
        #[source]
        source: vk::Result,
    },

    #[error("no physical device with a graphics queue that can present to the surface")]
    NoSuitableDevice,

    #[error("device memory allocation failed for {what}")]
    Allocation {
        what: String,
        #[source]
        source: gpu_allocator::AllocationError,
    },

    #[error("unable to load \"{path}\"")]
    Asset {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("unable to read \"{path}\"")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile shader \"{path}\"")]
    ShaderCompile {
        path: String,
        #[source]
        source: shaderc::Error,
    },

    #[error("shader reflection failed: {0}")]
    ShaderReflection(String),

    #[error("no descriptor binding named \"{0}\"")]
    MissingBinding(String),

    #[error("{0} requested before assets were loaded")]
    AssetsNotLoaded(&'static str),
}

#[derive(Error, Debug)]
pub enum PipelineBuildError {
    #[error("graphics pipeline creation was rejected")]
    Rejected(#[source] vk::Result),
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Vulkan call failed while trying to {what}")]
    Vulkan {
        what: &'static str,
        #[source]
        source: vk::Result,
    },

    #[error("no commands recorded for swapchain image {0}")]
    UnknownImage(usize),
}

pub(crate) trait VkResultExt<T> {
    /// Tags a raw Vulkan result as an initialization failure.
    fn init(self, what: &'static str) -> Result<T>;

    /// Tags a raw Vulkan result as a submission failure.
    fn submit(self, what: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for std::result::Result<T, vk::Result> {
    fn init(self, what: &'static str) -> Result<T> {
        self.map_err(|source| InitializationError::Vulkan { what, source }.into())
    }

    fn submit(self, what: &'static str) -> Result<T> {
        self.map_err(|source| SubmissionError::Vulkan { what, source }.into())
    }
}
