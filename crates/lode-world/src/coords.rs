use lode_geom::{Aabb, Vec3};

use crate::direction::Direction;

pub const SECTION_WIDTH: i32 = 16;
pub const SECTION_HEIGHT: i32 = 16;
pub const SECTION_MAX: i32 = 15;
pub const SECTION_VOLUME: usize = (SECTION_WIDTH * SECTION_WIDTH * SECTION_HEIGHT) as usize;

/// Column coordinate: `(x, z)` in units of 16 blocks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPosition {
    pub x: i32,
    pub z: i32,
}

impl ChunkPosition {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// Neighbor column in a horizontal direction; vertical directions return `self`.
    #[inline]
    pub fn neighbor(self, dir: Direction) -> Self {
        let (dx, _, dz) = dir.delta();
        self.offset(dx, dz)
    }

    /// Chebyshev distance in columns.
    #[inline]
    pub fn distance(self, other: ChunkPosition) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    #[inline]
    pub fn is_in_render_distance(self, camera: ChunkPosition, view_distance: i32) -> bool {
        self.distance(camera) <= view_distance
    }

    /// Column holding a world-space point.
    #[inline]
    pub fn containing(p: Vec3) -> Self {
        Self::new(
            (p.x.floor() as i32).div_euclid(SECTION_WIDTH),
            (p.z.floor() as i32).div_euclid(SECTION_WIDTH),
        )
    }
}

/// One 16x16x16 section: a column plus a section height.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionPosition {
    pub chunk: ChunkPosition,
    pub height: i32,
}

impl SectionPosition {
    #[inline]
    pub const fn new(chunk: ChunkPosition, height: i32) -> Self {
        Self { chunk, height }
    }

    #[inline]
    pub fn neighbor(self, dir: Direction) -> Self {
        let (_, dy, _) = dir.delta();
        Self::new(self.chunk.neighbor(dir), self.height + dy)
    }

    /// World-space block coordinate of the section's minimum corner.
    #[inline]
    pub fn origin(self) -> BlockPosition {
        BlockPosition::new(
            self.chunk.x * SECTION_WIDTH,
            self.height * SECTION_HEIGHT,
            self.chunk.z * SECTION_WIDTH,
        )
    }

    #[inline]
    pub fn center(self) -> Vec3 {
        let o = self.origin();
        Vec3::new(
            (o.x + SECTION_WIDTH / 2) as f32,
            (o.y + SECTION_HEIGHT / 2) as f32,
            (o.z + SECTION_WIDTH / 2) as f32,
        )
    }

    /// World-space box for a section-local `[min, max)` block range.
    pub fn local_box(self, min: [i32; 3], max: [i32; 3]) -> Aabb {
        let o = self.origin();
        Aabb::new(
            Vec3::new((o.x + min[0]) as f32, (o.y + min[1]) as f32, (o.z + min[2]) as f32),
            Vec3::new((o.x + max[0]) as f32, (o.y + max[1]) as f32, (o.z + max[2]) as f32),
        )
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn chunk_position(self) -> ChunkPosition {
        ChunkPosition::new(
            self.x.div_euclid(SECTION_WIDTH),
            self.z.div_euclid(SECTION_WIDTH),
        )
    }

    #[inline]
    pub fn section_height(self) -> i32 {
        self.y.div_euclid(SECTION_HEIGHT)
    }

    #[inline]
    pub fn section_position(self) -> SectionPosition {
        SectionPosition::new(self.chunk_position(), self.section_height())
    }

    /// Local coordinates inside the owning section, each in `0..16`.
    #[inline]
    pub fn in_section(self) -> (usize, usize, usize) {
        (
            self.x.rem_euclid(SECTION_WIDTH) as usize,
            self.y.rem_euclid(SECTION_HEIGHT) as usize,
            self.z.rem_euclid(SECTION_WIDTH) as usize,
        )
    }
}
