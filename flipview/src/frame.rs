use ash::vk;

use crate::quad::{IndexSet, VertexSet, QUAD_INDEX_COUNT};
use crate::settings::DemoSettings;
use crate::viewport::{full_scissor, Viewport};

/// Which texture a draw samples from. Each texture is labeled with the
/// winding of the index set it is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Cw,
    Ccw,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawCommand {
    SetViewport(Viewport),
    SetScissor(vk::Rect2D),
    BindPipeline,
    BindDescriptorSet(TextureSlot),
    BindIndexBuffer(IndexSet),
    BindVertexBuffer(VertexSet),
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
    },
}

/// A command sequence recorded once per configuration change and replayed
/// every frame until the next one.
#[derive(Clone, Debug, PartialEq)]
pub struct FramePlan {
    pub commands: Vec<DrawCommand>,
}

/// Both quads are drawn every frame with the same vertex buffer; the
/// pipeline's culling decides which of them produces fragments.
pub fn record_frame(settings: &DemoSettings, fb_width: u32, fb_height: u32) -> FramePlan {
    let viewport = settings.viewport(fb_width, fb_height);
    let vertex_set = settings.quad_orientation.vertex_set();
    let draw = DrawCommand::DrawIndexed {
        index_count: QUAD_INDEX_COUNT,
        instance_count: 1,
    };

    FramePlan {
        commands: vec![
            DrawCommand::SetViewport(viewport),
            DrawCommand::SetScissor(full_scissor(fb_width, fb_height)),
            DrawCommand::BindPipeline,
            DrawCommand::BindDescriptorSet(TextureSlot::Cw),
            DrawCommand::BindIndexBuffer(IndexSet::Clockwise),
            DrawCommand::BindVertexBuffer(vertex_set),
            draw,
            DrawCommand::BindDescriptorSet(TextureSlot::Ccw),
            DrawCommand::BindIndexBuffer(IndexSet::CounterClockwise),
            draw,
        ],
    }
}

impl FramePlan {
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::DrawIndexed { .. }))
            .count()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.commands.iter().find_map(|command| match command {
            DrawCommand::SetViewport(viewport) => Some(*viewport),
            _ => None,
        })
    }

    /// The (vertex set, index set, texture) bound at each indexed draw.
    pub fn draws(&self) -> Vec<(Option<VertexSet>, Option<IndexSet>, Option<TextureSlot>)> {
        let mut vertex_set = None;
        let mut index_set = None;
        let mut texture = None;
        let mut draws = Vec::new();

        for command in &self.commands {
            match *command {
                DrawCommand::BindVertexBuffer(set) => vertex_set = Some(set),
                DrawCommand::BindIndexBuffer(set) => index_set = Some(set),
                DrawCommand::BindDescriptorSet(slot) => texture = Some(slot),
                DrawCommand::DrawIndexed { .. } => draws.push((vertex_set, index_set, texture)),
                _ => {}
            }
        }

        draws
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::QuadOrientation;
    use crate::winding::{CullMode, FrontFace};

    fn all_settings() -> Vec<DemoSettings> {
        let mut all = Vec::new();
        for &quad_orientation in &[QuadOrientation::Vulkan, QuadOrientation::OpenGl] {
            for &negative_viewport in &[false, true] {
                for &front_face in &[FrontFace::Clockwise, FrontFace::CounterClockwise] {
                    for &cull_mode in &[CullMode::None, CullMode::Front, CullMode::Back] {
                        all.push(DemoSettings {
                            quad_orientation,
                            negative_viewport,
                            offset_x: -30,
                            offset_y: 75,
                            front_face,
                            cull_mode,
                        });
                    }
                }
            }
        }
        all
    }

    #[test]
    fn every_plan_draws_both_quads_once() {
        for settings in all_settings() {
            let plan = record_frame(&settings, 800, 600);
            assert_eq!(plan.draw_count(), 2);
            for command in &plan.commands {
                if let DrawCommand::DrawIndexed {
                    index_count,
                    instance_count,
                } = command
                {
                    assert_eq!(*index_count, 6);
                    assert_eq!(*instance_count, 1);
                }
            }
        }
    }

    #[test]
    fn both_draws_share_the_selected_vertex_set() {
        let settings = DemoSettings {
            quad_orientation: QuadOrientation::OpenGl,
            ..DemoSettings::default()
        };
        let draws = record_frame(&settings, 800, 600).draws();
        assert_eq!(
            draws,
            vec![
                (
                    Some(VertexSet::PositiveY),
                    Some(IndexSet::Clockwise),
                    Some(TextureSlot::Cw)
                ),
                (
                    Some(VertexSet::PositiveY),
                    Some(IndexSet::CounterClockwise),
                    Some(TextureSlot::Ccw)
                ),
            ]
        );
    }

    #[test]
    fn state_is_set_before_the_first_draw() {
        let plan = record_frame(&DemoSettings::default(), 800, 600);
        assert_eq!(
            plan.commands[..3],
            [
                DrawCommand::SetViewport(crate::viewport::compute_viewport(true, 0, 0, 800, 600)),
                DrawCommand::SetScissor(full_scissor(800, 600)),
                DrawCommand::BindPipeline,
            ]
        );
    }

    #[test]
    fn plan_carries_the_computed_viewport() {
        let settings = DemoSettings {
            negative_viewport: true,
            offset_y: 100,
            ..DemoSettings::default()
        };
        let viewport = record_frame(&settings, 800, 600).viewport().unwrap();
        assert_eq!(viewport.y, 500.0);
        assert_eq!(viewport.height, -600.0);
    }

    #[test]
    fn scissor_ignores_offsets() {
        let settings = DemoSettings {
            offset_x: 400,
            offset_y: -200,
            ..DemoSettings::default()
        };
        let plan = record_frame(&settings, 1024, 768);
        assert!(plan
            .commands
            .contains(&DrawCommand::SetScissor(full_scissor(1024, 768))));
    }
}
