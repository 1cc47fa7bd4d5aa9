use ash::vk;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::viewport::Viewport;
use crate::winding::{RasterizationState, Winding};

#[repr(C)]
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct QuadVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

pub const QUAD_INDEX_COUNT: u32 = 6;

pub const CLOCKWISE_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];
pub const COUNTER_CLOCKWISE_INDICES: [u32; 6] = [2, 1, 0, 0, 3, 2];

/// The two vertex sets share corner positions and differ in which way
/// texture-space Y runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexSet {
    /// OpenGL style, y points upwards.
    PositiveY,
    /// Vulkan style, y points downwards.
    NegativeY,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexSet {
    Clockwise,
    CounterClockwise,
}

/// The "quad type" choice exposed in the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuadOrientation {
    Vulkan,
    OpenGl,
}

impl QuadOrientation {
    pub const LABELS: [&'static str; 2] = ["VK (y negative)", "GL (y positive)"];

    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            QuadOrientation::Vulkan
        } else {
            QuadOrientation::OpenGl
        }
    }

    pub fn index(self) -> usize {
        match self {
            QuadOrientation::Vulkan => 0,
            QuadOrientation::OpenGl => 1,
        }
    }

    pub fn vertex_set(self) -> VertexSet {
        match self {
            QuadOrientation::Vulkan => VertexSet::NegativeY,
            QuadOrientation::OpenGl => VertexSet::PositiveY,
        }
    }
}

impl VertexSet {
    /// `aspect` is framebuffer height over width, keeping the quad square on screen.
    pub fn vertices(self, aspect: f32) -> [QuadVertex; 4] {
        match self {
            VertexSet::PositiveY => positive_y_vertices(aspect),
            VertexSet::NegativeY => negative_y_vertices(aspect),
        }
    }
}

impl IndexSet {
    pub fn indices(self) -> &'static [u32; 6] {
        match self {
            IndexSet::Clockwise => &CLOCKWISE_INDICES,
            IndexSet::CounterClockwise => &COUNTER_CLOCKWISE_INDICES,
        }
    }
}

pub fn positive_y_vertices(aspect: f32) -> [QuadVertex; 4] {
    [
        QuadVertex {
            pos: [-aspect, 1.0, 1.0],
            uv: [0.0, 1.0],
        },
        QuadVertex {
            pos: [-aspect, -1.0, 1.0],
            uv: [0.0, 0.0],
        },
        QuadVertex {
            pos: [aspect, -1.0, 1.0],
            uv: [1.0, 0.0],
        },
        QuadVertex {
            pos: [aspect, 1.0, 1.0],
            uv: [1.0, 1.0],
        },
    ]
}

pub fn negative_y_vertices(aspect: f32) -> [QuadVertex; 4] {
    [
        QuadVertex {
            pos: [-aspect, -1.0, 1.0],
            uv: [0.0, 1.0],
        },
        QuadVertex {
            pos: [-aspect, 1.0, 1.0],
            uv: [0.0, 0.0],
        },
        QuadVertex {
            pos: [aspect, 1.0, 1.0],
            uv: [1.0, 0.0],
        },
        QuadVertex {
            pos: [aspect, -1.0, 1.0],
            uv: [1.0, 1.0],
        },
    ]
}

pub fn vertex_input_binding_descriptions() -> Vec<vk::VertexInputBindingDescription> {
    vec![vk::VertexInputBindingDescription {
        binding: 0,
        stride: std::mem::size_of::<QuadVertex>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }]
}

pub fn vertex_input_attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
    vec![
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: 0,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: std::mem::size_of::<[f32; 3]>() as u32,
        },
    ]
}

fn framebuffer_position(vertex: &QuadVertex, viewport: &Viewport) -> Vec2 {
    viewport.ndc_to_framebuffer(Vec2::new(vertex.pos[0], vertex.pos[1]))
}

/// Winding of each of the quad's two triangles after the viewport transform.
pub fn rasterized_windings(
    vertices: &[QuadVertex; 4],
    indices: &[u32; 6],
    viewport: &Viewport,
) -> [Winding; 2] {
    let triangle = |first: usize| {
        let corner = |i: usize| framebuffer_position(&vertices[indices[first + i] as usize], viewport);
        Winding::of_framebuffer_triangle([corner(0), corner(1), corner(2)])
    };
    [triangle(0), triangle(3)]
}

/// Number of the quad's triangles that survive face culling.
pub fn visible_triangles(
    vertices: &[QuadVertex; 4],
    indices: &[u32; 6],
    viewport: &Viewport,
    state: &RasterizationState,
) -> usize {
    rasterized_windings(vertices, indices, viewport)
        .iter()
        .filter(|winding| !state.is_culled(**winding))
        .count()
}

/// Whether the first texel row of the texture lands at the top of the screen,
/// i.e. the image is not shown upside down.
pub fn appears_upright(vertices: &[QuadVertex; 4], viewport: &Viewport) -> bool {
    let first_row = vertices.iter().min_by(|a, b| a.uv[1].total_cmp(&b.uv[1]));
    let last_row = vertices.iter().max_by(|a, b| a.uv[1].total_cmp(&b.uv[1]));

    match (first_row, last_row) {
        (Some(first), Some(last)) => {
            framebuffer_position(first, viewport).y < framebuffer_position(last, viewport).y
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::compute_viewport;
    use crate::winding::{CullMode, FrontFace};

    const ASPECT: f32 = 600.0 / 800.0;

    fn native() -> Viewport {
        compute_viewport(false, 0, 0, 800, 600)
    }

    fn flipped() -> Viewport {
        compute_viewport(true, 0, 0, 800, 600)
    }

    #[test]
    fn index_sets_reference_the_same_corners() {
        let mut cw = CLOCKWISE_INDICES;
        let mut ccw = COUNTER_CLOCKWISE_INDICES;
        cw.sort_unstable();
        ccw.sort_unstable();
        assert_eq!(cw, ccw);
        assert_eq!(CLOCKWISE_INDICES.len() as u32, QUAD_INDEX_COUNT);
        assert!(CLOCKWISE_INDICES.iter().all(|&i| i < 4));
    }

    #[test]
    fn vertex_sets_share_positions() {
        let mut up: Vec<_> = positive_y_vertices(ASPECT).iter().map(|v| v.pos).collect();
        let mut down: Vec<_> = negative_y_vertices(ASPECT).iter().map(|v| v.pos).collect();
        let key = |p: &[f32; 3]| ((p[0] * 1000.0) as i32, (p[1] * 1000.0) as i32);
        up.sort_by_key(key);
        down.sort_by_key(key);
        assert_eq!(up, down);
    }

    #[test]
    fn index_sets_wind_as_named_in_native_space() {
        let corners = positive_y_vertices(ASPECT);
        assert_eq!(
            rasterized_windings(&corners, &CLOCKWISE_INDICES, &native()),
            [Winding::Clockwise; 2]
        );
        assert_eq!(
            rasterized_windings(&corners, &COUNTER_CLOCKWISE_INDICES, &native()),
            [Winding::CounterClockwise; 2]
        );
    }

    #[test]
    fn flipping_the_viewport_reverses_winding() {
        let corners = positive_y_vertices(ASPECT);
        assert_eq!(
            rasterized_windings(&corners, &CLOCKWISE_INDICES, &flipped()),
            [Winding::CounterClockwise; 2]
        );

        // Mirrored vertices and a mirrored viewport cancel out.
        let corners = negative_y_vertices(ASPECT);
        assert_eq!(
            rasterized_windings(&corners, &CLOCKWISE_INDICES, &flipped()),
            [Winding::Clockwise; 2]
        );
        assert_eq!(
            rasterized_windings(&corners, &CLOCKWISE_INDICES, &native()),
            [Winding::CounterClockwise; 2]
        );
    }

    #[test]
    fn offsets_do_not_change_winding() {
        let corners = positive_y_vertices(ASPECT);
        for &(x, y) in &[(100, 0), (0, -300), (-800, 600)] {
            let viewport = compute_viewport(true, x, y, 800, 600);
            assert_eq!(
                rasterized_windings(&corners, &CLOCKWISE_INDICES, &viewport),
                [Winding::CounterClockwise; 2]
            );
        }
    }

    #[test]
    fn back_face_culling_hides_the_counter_clockwise_quad() {
        let state = RasterizationState {
            front_face: FrontFace::Clockwise,
            cull_mode: CullMode::Back,
        };
        let corners = positive_y_vertices(ASPECT);
        assert_eq!(
            visible_triangles(&corners, &COUNTER_CLOCKWISE_INDICES, &native(), &state),
            0
        );
        assert_eq!(
            visible_triangles(&corners, &CLOCKWISE_INDICES, &native(), &state),
            2
        );
    }

    #[test]
    fn default_configuration_shows_only_the_counter_clockwise_quad() {
        let state = RasterizationState::default();
        let corners = QuadOrientation::Vulkan.vertex_set().vertices(ASPECT);
        assert_eq!(
            visible_triangles(&corners, &CLOCKWISE_INDICES, &flipped(), &state),
            0
        );
        assert_eq!(
            visible_triangles(&corners, &COUNTER_CLOCKWISE_INDICES, &flipped(), &state),
            2
        );
    }

    #[test]
    fn no_culling_draws_both_quads() {
        let state = RasterizationState {
            front_face: FrontFace::CounterClockwise,
            cull_mode: CullMode::None,
        };
        for set in [VertexSet::PositiveY, VertexSet::NegativeY] {
            let corners = set.vertices(ASPECT);
            for indices in [IndexSet::Clockwise, IndexSet::CounterClockwise] {
                assert_eq!(
                    visible_triangles(&corners, indices.indices(), &flipped(), &state),
                    2
                );
            }
        }
    }

    #[test]
    fn texture_orientation_depends_on_vertex_set_and_flip() {
        assert!(appears_upright(&positive_y_vertices(ASPECT), &native()));
        assert!(!appears_upright(&positive_y_vertices(ASPECT), &flipped()));
        assert!(!appears_upright(&negative_y_vertices(ASPECT), &native()));
        assert!(appears_upright(&negative_y_vertices(ASPECT), &flipped()));
    }

    #[test]
    fn quad_orientation_selects_vertex_set() {
        assert_eq!(QuadOrientation::from_index(0), QuadOrientation::Vulkan);
        assert_eq!(QuadOrientation::from_index(1), QuadOrientation::OpenGl);
        assert_eq!(QuadOrientation::Vulkan.vertex_set(), VertexSet::NegativeY);
        assert_eq!(QuadOrientation::OpenGl.vertex_set(), VertexSet::PositiveY);
    }

    #[test]
    fn vertex_layout_matches_struct() {
        let bindings = vertex_input_binding_descriptions();
        assert_eq!(bindings[0].stride, 20);
        let attributes = vertex_input_attribute_descriptions();
        assert_eq!(attributes[0].offset, 0);
        assert_eq!(attributes[1].offset, 12);
    }
}
