use ash::vk;
use std::path::Path;

use crate::buffer::Buffer;
use crate::drop_guard::Guard;
use crate::error::Result;
use crate::frame::TextureSlot;
use crate::quad::{IndexSet, VertexSet};
use crate::texture::Texture;
use crate::Device;

pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
pub const CW_TEXTURE_PATH: &str = "textures/texture_orientation_cw_rgba.png";
pub const CCW_TEXTURE_PATH: &str = "textures/texture_orientation_ccw_rgba.png";

/// Everything the quads are drawn from. Uploaded once, never modified, and
/// released together.
pub struct GeometryStore {
    pub positive_y_vertices: Buffer,
    pub negative_y_vertices: Buffer,
    pub clockwise_indices: Buffer,
    pub counter_clockwise_indices: Buffer,
    pub cw_texture: Texture,
    pub ccw_texture: Texture,
}

impl GeometryStore {
    pub fn load(device: &Device, asset_root: &Path, aspect: f32) -> Result<GeometryStore> {
        puffin::profile_function!();

        let vertex_buffer = |set: VertexSet, name: &str| {
            Buffer::new(
                device,
                &set.vertices(aspect),
                vk::BufferUsageFlags::VERTEX_BUFFER,
                name,
            )
        };
        let index_buffer = |set: IndexSet, name: &str| {
            Buffer::new(
                device,
                set.indices(),
                vk::BufferUsageFlags::INDEX_BUFFER,
                name,
            )
        };

        let positive_y_vertices =
            Guard::new(device, vertex_buffer(VertexSet::PositiveY, "positive_y vertices")?);
        let negative_y_vertices =
            Guard::new(device, vertex_buffer(VertexSet::NegativeY, "negative_y vertices")?);
        let clockwise_indices =
            Guard::new(device, index_buffer(IndexSet::Clockwise, "clockwise indices")?);
        let counter_clockwise_indices = Guard::new(
            device,
            index_buffer(IndexSet::CounterClockwise, "counter_clockwise indices")?,
        );

        let texture_path = |relative: &str| asset_root.join(relative).to_string_lossy().into_owned();
        let cw_texture = Guard::new(
            device,
            Texture::load(device, &texture_path(CW_TEXTURE_PATH), TEXTURE_FORMAT)?,
        );
        let ccw_texture = Texture::load(device, &texture_path(CCW_TEXTURE_PATH), TEXTURE_FORMAT)?;

        Ok(GeometryStore {
            positive_y_vertices: positive_y_vertices.take(),
            negative_y_vertices: negative_y_vertices.take(),
            clockwise_indices: clockwise_indices.take(),
            counter_clockwise_indices: counter_clockwise_indices.take(),
            cw_texture: cw_texture.take(),
            ccw_texture,
        })
    }

    /// Rewrites both vertex sets in place for a new aspect ratio. The buffers
    /// are host visible; the caller makes sure no frame is reading them.
    pub fn update_vertices(&self, aspect: f32) -> Result<()> {
        for set in [VertexSet::PositiveY, VertexSet::NegativeY] {
            self.vertex_buffer(set).update_memory(&set.vertices(aspect))?;
        }

        log::debug!("Rescaled quad vertices for aspect {:.3}", aspect);
        Ok(())
    }

    pub fn vertex_buffer(&self, set: VertexSet) -> &Buffer {
        match set {
            VertexSet::PositiveY => &self.positive_y_vertices,
            VertexSet::NegativeY => &self.negative_y_vertices,
        }
    }

    pub fn index_buffer(&self, set: IndexSet) -> &Buffer {
        match set {
            IndexSet::Clockwise => &self.clockwise_indices,
            IndexSet::CounterClockwise => &self.counter_clockwise_indices,
        }
    }

    pub fn texture(&self, slot: TextureSlot) -> &Texture {
        match slot {
            TextureSlot::Cw => &self.cw_texture,
            TextureSlot::Ccw => &self.ccw_texture,
        }
    }

    /// The caller waits for the device to go idle first.
    pub fn destroy(self, device: &Device) {
        self.positive_y_vertices.destroy(device);
        self.negative_y_vertices.destroy(device);
        self.clockwise_indices.destroy(device);
        self.counter_clockwise_indices.destroy(device);
        self.cw_texture.destroy(device);
        self.ccw_texture.destroy(device);
    }
}
