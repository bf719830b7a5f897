use crate::{Mat4, Vec3};

/// Perspective camera (right-handed, y-up).
///
/// The projection matrix is cached and only recomputed by
/// [`PerspectiveCamera::update_projection_matrix`], so changing `aspect`
/// without that call leaves the previous projection in effect.
#[derive(Clone, Copy, Debug)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
    target: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    /// Vertical field of view in degrees, like most DCC tools expose it.
    pub fn new(fov_y_deg: f32, aspect: f32, z_near: f32, z_far: f32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_rad: fov_y_deg.to_radians(),
            z_near,
            z_far,
            aspect,
            target: Vec3::NEG_Z,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        );
    }

    /// Point the camera at a world-space position.
    #[inline]
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    #[inline]
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Unit vector the camera is facing.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Depth in [0, 1], as wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }
}
