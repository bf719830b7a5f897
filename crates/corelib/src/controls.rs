//! Damped orbit controls: pointer drags rotate the camera around a target
//! on a sphere, with optional limits on azimuth, polar angle and distance.

use std::f32::consts::{PI, TAU};

use crate::Vec3;
use crate::camera::PerspectiveCamera;

const EPS: f32 = 1e-6;

/// Spherical coordinates with y up.
/// `theta` is the azimuth around +Y measured from +Z, `phi` the polar angle from +Y.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub fn from_vec3(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_vec3(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keep phi away from the poles so `look_at` stays well defined.
    pub fn make_safe(&mut self) {
        self.phi = self.phi.clamp(EPS, PI - EPS);
    }
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    /// Point the camera orbits around.
    pub target: Vec3,

    pub enable_damping: bool,
    pub damping_factor: f32,

    pub enable_rotate: bool,
    pub rotate_speed: f32,
    pub enable_zoom: bool,
    pub enable_pan: bool,

    pub min_azimuth_angle: f32,
    pub max_azimuth_angle: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    spherical: Spherical,
    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vec3,
    last_position: Vec3,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: false,
            damping_factor: 0.05,
            enable_rotate: true,
            rotate_speed: 1.0,
            enable_zoom: true,
            enable_pan: true,
            min_azimuth_angle: f32::NEG_INFINITY,
            max_azimuth_angle: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            spherical: Spherical::default(),
            spherical_delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            last_position: Vec3::ZERO,
        }
    }
}

impl OrbitControls {
    /// Bind to a camera: the initial spherical state is taken from its position.
    pub fn new(camera: &PerspectiveCamera) -> Self {
        let mut controls = Self::default();
        controls.spherical = Spherical::from_vec3(camera.position - controls.target);
        controls.last_position = camera.position;
        controls
    }

    /// Current azimuth after the last [`update`](Self::update).
    #[inline]
    pub fn azimuthal_angle(&self) -> f32 {
        self.spherical.theta
    }

    /// Current polar angle after the last [`update`](Self::update).
    #[inline]
    pub fn polar_angle(&self) -> f32 {
        self.spherical.phi
    }

    #[inline]
    pub fn distance(&self) -> f32 {
        self.spherical.radius
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Pointer drag of `(dx, dy)` logical pixels over an element `element_height` tall.
    pub fn handle_drag(&mut self, dx: f32, dy: f32, element_height: f32) {
        if !self.enable_rotate || element_height <= 0.0 {
            return;
        }
        self.rotate_left(TAU * dx / element_height * self.rotate_speed);
        self.rotate_up(TAU * dy / element_height * self.rotate_speed);
    }

    /// Multiply the orbit radius; ignored while zoom is disabled.
    pub fn dolly(&mut self, scale: f32) {
        if !self.enable_zoom || scale <= 0.0 {
            return;
        }
        self.scale *= scale;
    }

    /// Move the orbit target in world space; ignored while pan is disabled.
    pub fn pan(&mut self, offset: Vec3) {
        if !self.enable_pan {
            return;
        }
        self.pan_offset += offset;
    }

    /// Integrate pending input into the camera. Returns `true` if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_vec3(offset);

        if self.enable_damping {
            spherical.theta += self.spherical_delta.theta * self.damping_factor;
            spherical.phi += self.spherical_delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }

        spherical.theta = self.restrict_azimuth(spherical.theta);
        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle);
        spherical.make_safe();

        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        camera.position = self.target + spherical.to_vec3();
        camera.look_at(self.target);

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= keep;
            self.spherical_delta.phi *= keep;
            self.pan_offset *= keep;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;
        self.spherical = spherical;

        let moved = self.last_position.distance_squared(camera.position) > EPS;
        self.last_position = camera.position;
        moved
    }

    fn restrict_azimuth(&self, theta: f32) -> f32 {
        let (mut min, mut max) = (self.min_azimuth_angle, self.max_azimuth_angle);
        if !(min.is_finite() && max.is_finite()) {
            return theta;
        }
        if min < -PI {
            min += TAU;
        } else if min > PI {
            min -= TAU;
        }
        if max < -PI {
            max += TAU;
        } else if max > PI {
            max -= TAU;
        }

        if min <= max {
            theta.clamp(min, max)
        } else if theta > (min + max) / 2.0 {
            theta.max(min)
        } else {
            theta.min(max)
        }
    }
}
