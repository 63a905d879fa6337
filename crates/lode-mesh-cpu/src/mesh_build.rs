use lode_geom::Vec3;
use lode_world::Direction;

use crate::face::face_normal;

/// Interleaved CPU vertex data for one render phase of one section.
#[derive(Default, Clone, Debug)]
pub struct MeshBuild {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub idx: Vec<u32>,
    pub col: Vec<u8>,
}

impl MeshBuild {
    #[inline]
    pub fn reserve_quads(&mut self, n_quads: usize) {
        self.pos.reserve(n_quads * 4 * 3);
        self.norm.reserve(n_quads * 4 * 3);
        self.uv.reserve(n_quads * 4 * 2);
        self.col.reserve(n_quads * 4 * 4);
        self.idx.reserve(n_quads * 6);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.idx.len() / 6
    }

    /// Bytes a GPU upload of this batch would occupy.
    pub fn byte_len(&self) -> usize {
        (self.pos.len() + self.norm.len() + self.uv.len()) * 4 + self.col.len() + self.idx.len() * 4
    }

    /// Appends a quad `a b c d` with per-vertex UVs. Winding is fixed up so
    /// the front face points along `n`.
    pub fn add_quad_uv(
        &mut self,
        a: Vec3,
        b: Vec3,
        c: Vec3,
        d: Vec3,
        n: Vec3,
        mut uvs: [(f32, f32); 4],
        rgba: [u8; 4],
    ) {
        let base = self.vertex_count() as u32;
        let mut vs = [a, b, c, d];
        if (vs[1] - vs[0]).cross(vs[2] - vs[0]).dot(n) < 0.0 {
            vs.swap(1, 3);
            uvs.swap(1, 3);
        }
        for i in 0..4 {
            self.pos.extend_from_slice(&[vs[i].x, vs[i].y, vs[i].z]);
            self.norm.extend_from_slice(&[n.x, n.y, n.z]);
            self.uv.extend_from_slice(&[uvs[i].0, uvs[i].1]);
            self.col.extend_from_slice(&rgba);
        }
        self.idx
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Emits the unit face of the block whose minimum corner is `origin`.
    /// `rotation` turns the texture by quarter steps.
    pub fn add_face_rect(&mut self, face: Direction, origin: Vec3, rotation: u8, rgba: [u8; 4]) {
        let o = origin;
        let v = |x: f32, y: f32, z: f32| Vec3::new(o.x + x, o.y + y, o.z + z);
        let (a, b, c, d) = match face {
            Direction::Up => (v(0., 1., 0.), v(0., 1., 1.), v(1., 1., 1.), v(1., 1., 0.)),
            Direction::Down => (v(0., 0., 0.), v(1., 0., 0.), v(1., 0., 1.), v(0., 0., 1.)),
            Direction::North => (v(1., 0., 0.), v(0., 0., 0.), v(0., 1., 0.), v(1., 1., 0.)),
            Direction::South => (v(0., 0., 1.), v(1., 0., 1.), v(1., 1., 1.), v(0., 1., 1.)),
            Direction::West => (v(0., 0., 0.), v(0., 0., 1.), v(0., 1., 1.), v(0., 1., 0.)),
            Direction::East => (v(1., 0., 1.), v(1., 0., 0.), v(1., 1., 0.), v(1., 1., 1.)),
        };
        let uvs = rotated_uvs(rotation);
        self.add_quad_uv(a, b, c, d, face_normal(face), uvs, rgba);
    }

    /// One diagonal plane through the block, emitted front and back.
    pub fn add_cross_plane(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3, rotation: u8, rgba: [u8; 4]) {
        let n = (b - a).cross(d - a).normalized();
        let uvs = rotated_uvs(rotation);
        self.add_quad_uv(a, b, c, d, n, uvs, rgba);
        self.add_quad_uv(a, b, c, d, -n, uvs, rgba);
    }
}

fn rotated_uvs(rotation: u8) -> [(f32, f32); 4] {
    let mut uvs = [(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)];
    uvs.rotate_left((rotation % 4) as usize);
    uvs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri_normal(m: &MeshBuild, tri: usize) -> Vec3 {
        let p = |i: u32| {
            let i = i as usize * 3;
            Vec3::new(m.pos[i], m.pos[i + 1], m.pos[i + 2])
        };
        let t = &m.idx[tri * 3..tri * 3 + 3];
        (p(t[1]) - p(t[0])).cross(p(t[2]) - p(t[0]))
    }

    #[test]
    fn faces_wind_toward_their_normal() {
        for dir in Direction::ALL {
            let mut m = MeshBuild::default();
            m.add_face_rect(dir, Vec3::ZERO, 0, [255; 4]);
            assert_eq!(m.quad_count(), 1);
            let n = face_normal(dir);
            assert!(tri_normal(&m, 0).dot(n) > 0.0, "{dir:?}");
            assert!(tri_normal(&m, 1).dot(n) > 0.0, "{dir:?}");
        }
    }

    #[test]
    fn cross_plane_is_double_sided() {
        let mut m = MeshBuild::default();
        m.add_cross_plane(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
            0,
            [255; 4],
        );
        assert_eq!(m.quad_count(), 2);
        assert!(tri_normal(&m, 0).dot(tri_normal(&m, 2)) < 0.0);
    }

    #[test]
    fn rotation_cycles() {
        assert_eq!(rotated_uvs(0), rotated_uvs(4));
        assert_ne!(rotated_uvs(0), rotated_uvs(1));
    }
}
