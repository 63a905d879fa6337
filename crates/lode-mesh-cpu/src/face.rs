use lode_geom::Vec3;
use lode_world::Direction;

/// Unit normal of a block face.
#[inline]
pub fn face_normal(dir: Direction) -> Vec3 {
    let (x, y, z) = dir.delta();
    Vec3::new(x as f32, y as f32, z as f32)
}
