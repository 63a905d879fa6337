use lode_geom::Frustum;
use lode_world::{ChunkPosition, SectionPosition};

/// Copyable snapshot of what the camera can see. Published by the frame
/// driver on camera change; everyone else works on a copy.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VisibilityTest {
    pub camera_chunk: ChunkPosition,
    pub view_distance: i32,
    pub frustum: Frustum,
}

impl VisibilityTest {
    pub fn new(camera_chunk: ChunkPosition, view_distance: i32, frustum: Frustum) -> Self {
        Self {
            camera_chunk,
            view_distance,
            frustum,
        }
    }

    /// Render distance plus frustum test of the section-local box `[min, max)`.
    pub fn is_visible(&self, chunk: ChunkPosition, height: i32, min: [i32; 3], max: [i32; 3]) -> bool {
        if !chunk.is_in_render_distance(self.camera_chunk, self.view_distance) {
            return false;
        }
        let aabb = SectionPosition::new(chunk, height).local_box(min, max);
        self.frustum.contains_aabb(&aabb)
    }

    /// Test against the whole 16x16x16 section.
    #[inline]
    pub fn is_section_visible(&self, pos: SectionPosition) -> bool {
        self.is_visible(pos.chunk, pos.height, [0; 3], [16; 3])
    }

    #[inline]
    pub fn is_camera_column(&self, chunk: ChunkPosition) -> bool {
        chunk == self.camera_chunk
    }
}
