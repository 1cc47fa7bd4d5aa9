use ash::vk;

use crate::error::Result;
use crate::frame::{record_frame, FramePlan};
use crate::pipeline_slot::PipelineSlot;
use crate::quad::{self, IndexSet};
use crate::settings::{DemoSettings, SettingsChange};
use crate::winding::RasterizationState;

/// GPU side of the demo. `VulkanRenderer` is the real implementation; tests
/// drive `Demo` through a recording stand-in.
pub trait RenderBackend {
    type Pipeline;
    /// Whatever a frame is replayed into, e.g. a primary command buffer and
    /// the acquired swapchain image.
    type Target;

    fn framebuffer_extent(&self) -> vk::Extent2D;

    /// Creates the geometry buffers and loads both textures.
    fn load_assets(&mut self, aspect: f32) -> Result<()>;

    /// Rewrites the vertex buffers for a new aspect ratio. Only called once
    /// the device is idle.
    fn update_vertices(&mut self, aspect: f32) -> Result<()>;

    fn setup_descriptors(&mut self) -> Result<()>;

    fn create_pipeline(&mut self, state: &RasterizationState) -> Result<Self::Pipeline>;

    fn destroy_pipeline(&mut self, pipeline: Self::Pipeline);

    /// Blocks until nothing submitted so far is still executing.
    fn wait_idle(&self) -> Result<()>;

    fn record(&mut self, pipeline: &Self::Pipeline, plan: &FramePlan) -> Result<()>;

    fn execute(&mut self, target: Self::Target) -> Result<()>;
}

pub struct Demo<B: RenderBackend> {
    backend: B,
    settings: DemoSettings,
    extent: vk::Extent2D,
    pipeline: PipelineSlot<B::Pipeline>,
    plan: Option<FramePlan>,
    assets_loaded: bool,
    prepared: bool,
}

impl<B: RenderBackend> Demo<B> {
    pub fn new(backend: B, mut settings: DemoSettings) -> Self {
        let extent = backend.framebuffer_extent();
        settings.clamp_offsets(extent.width, extent.height);

        Demo {
            backend,
            settings,
            extent,
            pipeline: PipelineSlot::new(),
            plan: None,
            assets_loaded: false,
            prepared: false,
        }
    }

    pub fn settings(&self) -> &DemoSettings {
        &self.settings
    }

    pub fn framebuffer_extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn plan(&self) -> Option<&FramePlan> {
        self.plan.as_ref()
    }

    pub fn pipeline(&self) -> Option<&B::Pipeline> {
        self.pipeline.get()
    }

    pub fn pipeline_generation(&self) -> u64 {
        self.pipeline.generation()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn load_assets(&mut self) -> Result<()> {
        if self.assets_loaded {
            return Ok(());
        }

        self.backend.load_assets(self.aspect())?;
        self.assets_loaded = true;

        log::info!("Loaded quad geometry and orientation textures");
        Ok(())
    }

    pub fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }

        self.load_assets()?;
        self.backend.setup_descriptors()?;
        self.rebuild_pipeline()?;
        self.re_record()?;
        self.prepared = true;

        Ok(())
    }

    /// Stores new settings and performs the smallest rebuild they require.
    /// When the rebuild fails the previous settings stay in effect, matching
    /// the pipeline that is still live.
    pub fn apply_settings(&mut self, mut settings: DemoSettings) -> Result<Option<SettingsChange>> {
        settings.clamp_offsets(self.extent.width, self.extent.height);

        let change = SettingsChange::between(&self.settings, &settings);
        let previous = std::mem::replace(&mut self.settings, settings);

        if !self.prepared {
            // prepare() builds from whatever is current
            return Ok(change);
        }

        let rebuilt = match change {
            Some(SettingsChange::PipelineAffecting) => {
                self.rebuild_pipeline().and_then(|_| self.re_record())
            }
            Some(SettingsChange::ViewportOnly) => self.re_record(),
            None => Ok(()),
        };

        if let Err(err) = rebuilt {
            self.settings = previous;
            return Err(err);
        }

        Ok(change)
    }

    /// New framebuffer size. The quad vertices are scaled by the aspect ratio
    /// and the viewport spans the framebuffer, so both are refreshed.
    pub fn resize(&mut self, extent: vk::Extent2D) -> Result<()> {
        if extent == self.extent {
            return Ok(());
        }

        self.extent = extent;
        self.settings.clamp_offsets(extent.width, extent.height);

        if self.assets_loaded {
            // The vertex buffers may still be read by a frame in flight
            self.backend.wait_idle()?;
            self.backend.update_vertices(self.aspect())?;
        }

        if self.prepared {
            self.re_record()?;
        }
        Ok(())
    }

    /// Replays the pre-recorded commands. Returns false until `prepare` finished.
    pub fn render(&mut self, target: B::Target) -> Result<bool> {
        if !self.prepared {
            return Ok(false);
        }

        self.backend.execute(target)?;
        Ok(true)
    }

    /// Framebuffer height over width, the horizontal scale of the quad.
    fn aspect(&self) -> f32 {
        self.extent.height as f32 / self.extent.width as f32
    }

    fn rebuild_pipeline(&mut self) -> Result<()> {
        puffin::profile_function!();

        let state = self.settings.rasterization_state();
        let pipeline = self.backend.create_pipeline(&state)?;

        // The old pipeline may still be referenced by a frame in flight.
        self.backend.wait_idle()?;
        if let Some(previous) = self.pipeline.replace(pipeline) {
            self.backend.destroy_pipeline(previous);
        }

        log::debug!(
            "Built pipeline #{} with {:?}",
            self.pipeline.generation(),
            state
        );
        Ok(())
    }

    fn re_record(&mut self) -> Result<()> {
        puffin::profile_function!();

        let plan = record_frame(&self.settings, self.extent.width, self.extent.height);

        if let Some(pipeline) = self.pipeline.get() {
            self.backend.wait_idle()?;
            self.backend.record(pipeline, &plan)?;
        }

        self.log_presentation(&plan);
        self.plan = Some(plan);
        Ok(())
    }

    fn log_presentation(&self, plan: &FramePlan) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }

        let viewport = match plan.viewport() {
            Some(viewport) => viewport,
            None => return,
        };
        let vertices = self
            .settings
            .quad_orientation
            .vertex_set()
            .vertices(self.aspect());
        let state = self.settings.rasterization_state();

        for index_set in [IndexSet::Clockwise, IndexSet::CounterClockwise] {
            log::debug!(
                "{:?} quad: {} of 2 triangles visible, upright: {}",
                index_set,
                quad::visible_triangles(&vertices, index_set.indices(), &viewport, &state),
                quad::appears_upright(&vertices, &viewport)
            );
        }
    }
}

impl<B: RenderBackend> Drop for Demo<B> {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(err) = self.backend.wait_idle() {
                log::error!("Failed waiting for the device before teardown: {}", err);
            }
            self.backend.destroy_pipeline(pipeline);
        }
    }
}
