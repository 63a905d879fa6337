use lode_geom::{Frustum, Vec3};
use lode_world::ChunkPosition;

/// Free-flying perspective camera.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Movement since the previous frame; zero means standing still.
    pub velocity: Vec3,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            yaw_deg: 0.0,
            pitch_deg: 0.0,
            fov_y_deg: 70.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1024.0,
            velocity: Vec3::ZERO,
        }
    }

    /// Unit view direction. Yaw 0 looks down +X, positive yaw turns toward +Z.
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw_deg.to_radians().sin_cos();
        let (sp, cp) = self.pitch_deg.to_radians().sin_cos();
        Vec3::new(cy * cp, sp, sy * cp).normalized()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_camera(
            self.position,
            self.forward(),
            Vec3::UP,
            self.fov_y_deg,
            self.aspect,
            self.near,
            self.far,
        )
    }

    #[inline]
    pub fn chunk(&self) -> ChunkPosition {
        ChunkPosition::containing(self.position)
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        !self.velocity.is_zero()
    }

    /// Moves by `delta` and records it as this frame's velocity.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.velocity = delta;
    }

    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
    }

    pub fn look_at(&mut self, target: Vec3) {
        let d = (target - self.position).normalized();
        if d.is_zero() {
            return;
        }
        self.yaw_deg = d.z.atan2(d.x).to_degrees();
        self.pitch_deg = d.y.clamp(-1.0, 1.0).asin().to_degrees();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_points_forward_at_target() {
        let mut c = Camera::new(Vec3::new(0.0, 64.0, 0.0));
        let target = Vec3::new(10.0, 74.0, -10.0);
        c.look_at(target);
        let f = c.forward();
        let want = (target - c.position).normalized();
        assert!((f.dot(want) - 1.0).abs() < 1e-4);
        assert!(c.frustum().contains_point(target));
    }

    #[test]
    fn moving_follows_translate() {
        let mut c = Camera::new(Vec3::new(-1.0, 0.0, 17.0));
        assert_eq!(c.chunk(), ChunkPosition::new(-1, 1));
        assert!(!c.is_moving());
        c.translate(Vec3::new(2.0, 0.0, 0.0));
        assert!(c.is_moving());
        assert_eq!(c.chunk(), ChunkPosition::new(0, 1));
        c.stop();
        assert!(!c.is_moving());
    }
}
