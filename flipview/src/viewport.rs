use ash::vk;
use glam::Vec2;

/// Viewport rectangle handed to `vkCmdSetViewport`.
///
/// The sign of `height` selects the Y convention: positive is Vulkan's native
/// top-down mapping, negative flips the axis so NDC +Y points up like OpenGL.
/// The magnitude is always the framebuffer height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

// Flip along Y axis https://www.saschawillems.de/blog/2019/03/29/flipping-the-vulkan-viewport/
pub fn compute_viewport(
    flip: bool,
    offset_x: i32,
    offset_y: i32,
    fb_width: u32,
    fb_height: u32,
) -> Viewport {
    if flip {
        // The origin is the edge NDC -1 maps to, which is now the bottom of the
        // framebuffer. Offsets are measured from there, like GL window coordinates.
        Viewport {
            x: offset_x as f32,
            y: fb_height as f32 - offset_y as f32,
            width: fb_width as f32,
            height: -(fb_height as f32),
        }
    } else {
        Viewport {
            x: offset_x as f32,
            y: offset_y as f32,
            width: fb_width as f32,
            height: fb_height as f32,
        }
    }
}

pub fn full_scissor(fb_width: u32, fb_height: u32) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: vk::Extent2D {
            width: fb_width,
            height: fb_height,
        },
    }
}

impl Viewport {
    pub fn is_flipped(&self) -> bool {
        self.height < 0.0
    }

    /// Maps a normalized device coordinate to framebuffer pixels, the same
    /// transform the rasterizer applies.
    pub fn ndc_to_framebuffer(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            self.x + (ndc.x + 1.0) * 0.5 * self.width,
            self.y + (ndc.y + 1.0) * 0.5 * self.height,
        )
    }

    pub fn to_vk(&self) -> vk::Viewport {
        vk::Viewport {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}
