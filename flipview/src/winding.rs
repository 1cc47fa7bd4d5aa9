use ash::vk;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Which vertex order the rasterizer treats as the front face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Orientation of a triangle as seen in framebuffer space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
    Degenerate,
}

/// The static rasterization state baked into a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RasterizationState {
    pub front_face: FrontFace,
    pub cull_mode: CullMode,
}

const FRONT_FACES: [(FrontFace, vk::FrontFace); 2] = [
    (FrontFace::Clockwise, vk::FrontFace::CLOCKWISE),
    (FrontFace::CounterClockwise, vk::FrontFace::COUNTER_CLOCKWISE),
];

const CULL_MODES: [(CullMode, vk::CullModeFlags); 3] = [
    (CullMode::None, vk::CullModeFlags::NONE),
    (CullMode::Front, vk::CullModeFlags::FRONT),
    (CullMode::Back, vk::CullModeFlags::BACK),
];

impl FrontFace {
    pub const LABELS: [&'static str; 2] = ["clock wise", "counter clock wise"];

    /// Index 0 is clockwise, anything else counter-clockwise.
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            FrontFace::Clockwise
        } else {
            FrontFace::CounterClockwise
        }
    }

    pub fn index(self) -> usize {
        match self {
            FrontFace::Clockwise => 0,
            FrontFace::CounterClockwise => 1,
        }
    }

    pub fn to_vk(self) -> vk::FrontFace {
        FRONT_FACES[self.index()].1
    }

    fn matches(self, winding: Winding) -> bool {
        matches!(
            (self, winding),
            (FrontFace::Clockwise, Winding::Clockwise)
                | (FrontFace::CounterClockwise, Winding::CounterClockwise)
        )
    }
}

impl CullMode {
    pub const LABELS: [&'static str; 3] = ["none", "front face", "back face"];

    pub fn from_index(index: usize) -> Option<Self> {
        CULL_MODES.get(index).map(|(mode, _)| *mode)
    }

    pub fn index(self) -> usize {
        match self {
            CullMode::None => 0,
            CullMode::Front => 1,
            CullMode::Back => 2,
        }
    }

    pub fn to_vk(self) -> vk::CullModeFlags {
        CULL_MODES[self.index()].1
    }
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            front_face: FrontFace::CounterClockwise,
            cull_mode: CullMode::Back,
        }
    }
}

impl Winding {
    /// Classifies a triangle given in framebuffer coordinates (y pointing down).
    ///
    /// Uses the rasterizer's own area formula, `a = -1/2 * sum(x_i * y_(i+1) - x_(i+1) * y_i)`,
    /// where a positive area is counter-clockwise.
    pub fn of_framebuffer_triangle(points: [Vec2; 3]) -> Self {
        let area = signed_area(points);
        if area > 0.0 {
            Winding::CounterClockwise
        } else if area < 0.0 {
            Winding::Clockwise
        } else {
            Winding::Degenerate
        }
    }
}

pub fn signed_area(points: [Vec2; 3]) -> f32 {
    let mut sum = 0.0;
    for i in 0..3 {
        let a = points[i];
        let b = points[(i + 1) % 3];
        sum += a.x * b.y - b.x * a.y;
    }
    -0.5 * sum
}

impl RasterizationState {
    pub fn is_front_facing(&self, winding: Winding) -> bool {
        self.front_face.matches(winding)
    }

    /// Whether a triangle with the given framebuffer winding produces no
    /// fragments. Zero-area triangles never rasterize.
    pub fn is_culled(&self, winding: Winding) -> bool {
        if winding == Winding::Degenerate {
            return true;
        }
        let front = self.is_front_facing(winding);
        match self.cull_mode {
            CullMode::None => false,
            CullMode::Front => front,
            CullMode::Back => !front,
        }
    }

    pub fn to_vk(&self) -> vk::PipelineRasterizationStateCreateInfo {
        vk::PipelineRasterizationStateCreateInfo {
            front_face: self.front_face.to_vk(),
            cull_mode: self.cull_mode.to_vk(),
            line_width: 1.0,
            polygon_mode: vk::PolygonMode::FILL,
            ..Default::default()
        }
    }
}
