use serde::{Deserialize, Serialize};

use crate::quad::QuadOrientation;
use crate::viewport::{compute_viewport, Viewport};
use crate::winding::{CullMode, FrontFace, RasterizationState};

/// Every parameter the overlay can change. Passed explicitly into the rebuild
/// paths so viewport and pipeline state can be derived without ambient state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub quad_orientation: QuadOrientation,
    pub negative_viewport: bool,
    pub offset_x: i32,
    pub offset_y: i32,
    pub front_face: FrontFace,
    pub cull_mode: CullMode,
}

impl Default for DemoSettings {
    fn default() -> Self {
        let rasterization = RasterizationState::default();
        Self {
            quad_orientation: QuadOrientation::Vulkan,
            negative_viewport: true,
            offset_x: 0,
            offset_y: 0,
            front_face: rasterization.front_face,
            cull_mode: rasterization.cull_mode,
        }
    }
}

impl DemoSettings {
    pub fn rasterization_state(&self) -> RasterizationState {
        RasterizationState {
            front_face: self.front_face,
            cull_mode: self.cull_mode,
        }
    }

    pub fn viewport(&self, fb_width: u32, fb_height: u32) -> Viewport {
        compute_viewport(
            self.negative_viewport,
            self.offset_x,
            self.offset_y,
            fb_width,
            fb_height,
        )
    }

    /// Keeps the offsets inside the slider range of +-framebuffer extent.
    pub fn clamp_offsets(&mut self, fb_width: u32, fb_height: u32) {
        let (w, h) = (fb_width as i32, fb_height as i32);
        self.offset_x = self.offset_x.clamp(-w, w);
        self.offset_y = self.offset_y.clamp(-h, h);
    }
}

/// The minimal amount of work a settings change requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsChange {
    /// Only the recorded commands change: viewport, offsets or vertex set.
    ViewportOnly,
    /// Static pipeline state changed; the pipeline is rebuilt and the commands
    /// re-recorded.
    PipelineAffecting,
}

impl SettingsChange {
    pub fn between(old: &DemoSettings, new: &DemoSettings) -> Option<SettingsChange> {
        if old.rasterization_state() != new.rasterization_state() {
            Some(SettingsChange::PipelineAffecting)
        } else if old != new {
            Some(SettingsChange::ViewportOnly)
        } else {
            None
        }
    }

    pub fn rebuilds_pipeline(self) -> bool {
        self == SettingsChange::PipelineAffecting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo_start_state() {
        let settings = DemoSettings::default();
        assert!(settings.negative_viewport);
        assert_eq!(settings.offset_x, 0);
        assert_eq!(settings.offset_y, 0);
        assert_eq!(settings.front_face, FrontFace::CounterClockwise);
        assert_eq!(settings.cull_mode, CullMode::Back);
        assert_eq!(settings.quad_orientation, QuadOrientation::Vulkan);
    }

    #[test]
    fn identical_settings_need_no_rebuild() {
        let settings = DemoSettings::default();
        assert_eq!(SettingsChange::between(&settings, &settings), None);
    }

    #[test]
    fn viewport_parameters_only_re_record() {
        let old = DemoSettings::default();
        let changes = [
            DemoSettings {
                negative_viewport: false,
                ..old
            },
            DemoSettings {
                offset_x: 12,
                ..old
            },
            DemoSettings {
                offset_y: -300,
                ..old
            },
            DemoSettings {
                quad_orientation: QuadOrientation::OpenGl,
                ..old
            },
        ];
        for new in changes.iter() {
            let change = SettingsChange::between(&old, new);
            assert_eq!(change, Some(SettingsChange::ViewportOnly));
            assert!(!change.map_or(false, SettingsChange::rebuilds_pipeline));
        }
    }

    #[test]
    fn winding_and_cull_changes_rebuild_the_pipeline() {
        let old = DemoSettings::default();
        let winding = DemoSettings {
            front_face: FrontFace::Clockwise,
            ..old
        };
        let cull = DemoSettings {
            cull_mode: CullMode::None,
            ..old
        };
        let both = DemoSettings {
            cull_mode: CullMode::Front,
            offset_x: 5,
            ..old
        };
        for new in [winding, cull, both].iter() {
            assert_eq!(
                SettingsChange::between(&old, new),
                Some(SettingsChange::PipelineAffecting)
            );
        }
    }

    #[test]
    fn offsets_clamp_to_framebuffer_extent() {
        let mut settings = DemoSettings {
            offset_x: 5000,
            offset_y: -5000,
            ..DemoSettings::default()
        };
        settings.clamp_offsets(800, 600);
        assert_eq!(settings.offset_x, 800);
        assert_eq!(settings.offset_y, -600);
    }

    #[test]
    fn settings_derive_their_viewport() {
        let settings = DemoSettings {
            offset_y: 100,
            ..DemoSettings::default()
        };
        let viewport = settings.viewport(800, 600);
        assert_eq!(viewport.y, 500.0);
        assert_eq!(viewport.height, -600.0);
    }

    #[test]
    fn partial_settings_deserialize_over_defaults() {
        let settings: DemoSettings =
            ron::from_str("(negative_viewport: false, cull_mode: Front)").unwrap();
        assert!(!settings.negative_viewport);
        assert_eq!(settings.cull_mode, CullMode::Front);
        assert_eq!(settings.front_face, FrontFace::CounterClockwise);
    }
}
