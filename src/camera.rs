//! A free-fly camera with yaw/pitch orientation and zoomable field of view.
//!
//! This module provides [`Camera`], the viewpoint used for the scene pass.
//! The camera stores Euler angles (yaw and pitch, in degrees) and derives an
//! orthonormal basis from them whenever they change. Movement is expressed
//! through [`CameraMovement`] so the caller maps keys to directions without
//! the camera knowing about input devices.
//!
//! Conventions:
//! - Yaw is measured in the XZ plane; −90° looks down −Z.
//! - Pitch is clamped to ±89° to avoid flipping over the pole.
//! - Zoom is the vertical field of view in degrees, clamped to `[1, 45]`.

use glam::{Mat4, Vec3};

/// Default yaw in degrees (looking down −Z).
pub const DEFAULT_YAW: f32 = -90.0;
/// Default pitch in degrees (level).
pub const DEFAULT_PITCH: f32 = 0.0;
/// Default movement speed in world units per second.
pub const DEFAULT_SPEED: f32 = 8.0;
/// Default mouse-look sensitivity (degrees per pixel of mouse travel).
pub const DEFAULT_SENSITIVITY: f32 = 0.005;
/// Default vertical field of view in degrees; also the zoom upper bound.
pub const DEFAULT_ZOOM: f32 = 45.0;

/// A movement direction relative to the camera's current basis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// A free-fly camera.
///
/// `front`, `right`, and `up` are derived from `yaw`/`pitch` and kept
/// orthonormal by [`Camera::refresh_basis`]; mutate the angles through
/// [`Camera::look`] rather than writing the vectors directly.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    /// World-space position.
    pub position: Vec3,
    /// Unit vector the camera looks along.
    pub front: Vec3,
    /// Unit vector to the camera's right.
    pub right: Vec3,
    /// Unit vector out the top of the camera.
    pub up: Vec3,
    /// World up used to re-derive the basis.
    pub world_up: Vec3,
    /// Horizontal angle in degrees.
    pub yaw: f32,
    /// Vertical angle in degrees, clamped to ±89.
    pub pitch: f32,
    /// Movement speed in units per second.
    pub speed: f32,
    /// Mouse-look sensitivity.
    pub sensitivity: f32,
    /// Vertical field of view in degrees, clamped to `[1, 45]`.
    pub zoom: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            speed: DEFAULT_SPEED,
            sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
            near: 0.1,
            far: 100.0,
        };
        camera.refresh_basis();
        camera
    }
}

impl Camera {
    /// Create a camera with default orientation at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the camera position.
    pub fn position(mut self, position: impl Into<Vec3>) -> Self {
        self.position = position.into();
        self
    }

    /// Set the initial yaw and pitch in degrees.
    pub fn angles(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-89.0, 89.0);
        self.refresh_basis();
        self
    }

    /// Set movement speed in units per second.
    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set mouse-look sensitivity.
    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Set near and far clipping planes.
    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Move the camera along one of its basis directions.
    ///
    /// `Forward`/`Backward` follow the full look direction, so pitching up
    /// and moving forward gains altitude.
    pub fn advance(&mut self, direction: CameraMovement, dt: f32) {
        let velocity = self.speed * dt;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Apply a mouse-look delta (in pixels of mouse travel).
    ///
    /// Positive `dx` turns right; positive `dy` looks up. Pitch saturates at
    /// ±89° and the basis is re-derived.
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch += dy * self.sensitivity;
        self.pitch = self.pitch.clamp(-89.0, 89.0);
        self.refresh_basis();
    }

    /// Apply a scroll-wheel zoom step. Positive `dy` narrows the view.
    pub fn zoom_by(&mut self, dy: f32) {
        self.zoom = (self.zoom - dy * 0.05).clamp(1.0, DEFAULT_ZOOM);
    }

    /// Re-derive `front`, `right`, and `up` from the current angles.
    pub fn refresh_basis(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }

    /// View matrix looking from `position` along `front`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection for the given aspect ratio, using the current
    /// zoom as the vertical field of view.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn default_looks_down_negative_z() {
        let camera = Camera::new();
        assert!(camera.front.distance(Vec3::NEG_Z) < 1e-6);
        assert!(camera.right.distance(Vec3::X) < 1e-6);
        assert!(camera.up.distance(Vec3::Y) < 1e-6);
    }

    #[test]
    fn basis_stays_orthonormal_across_angles() {
        let mut camera = Camera::new();
        for yaw_step in 0..24 {
            for pitch_step in -8..=8 {
                camera.yaw = yaw_step as f32 * 15.0;
                camera.pitch = pitch_step as f32 * 11.0;
                camera.pitch = camera.pitch.clamp(-89.0, 89.0);
                camera.refresh_basis();

                assert_close(camera.front.length(), 1.0);
                assert_close(camera.right.length(), 1.0);
                assert_close(camera.up.length(), 1.0);
                assert_close(camera.front.dot(camera.right), 0.0);
                assert_close(camera.front.dot(camera.up), 0.0);
                assert_close(camera.right.dot(camera.up), 0.0);
            }
        }
    }

    #[test]
    fn pitch_saturates_under_sustained_look() {
        let mut camera = Camera::new();
        // A huge upward drag lands exactly on the clamp, not past it.
        camera.look(0.0, 1e9);
        assert_eq!(camera.pitch, 89.0);
        camera.look(0.0, 1.0);
        assert_eq!(camera.pitch, 89.0);
        camera.look(0.0, -2e9);
        assert_eq!(camera.pitch, -89.0);
        // Basis is still finite and unit-length at the pole clamp.
        assert_close(camera.front.length(), 1.0);
    }

    #[test]
    fn zoom_saturates_at_both_bounds() {
        let mut camera = Camera::new();
        camera.zoom_by(1e9);
        assert_eq!(camera.zoom, 1.0);
        camera.zoom_by(-1e9);
        assert_eq!(camera.zoom, DEFAULT_ZOOM);
    }

    #[test]
    fn zoom_steps_scale_with_scroll_delta() {
        let mut camera = Camera::new();
        camera.zoom_by(10.0);
        assert_close(camera.zoom, 44.5);
    }

    #[test]
    fn view_matrix_matches_look_at() {
        let camera = Camera::new().position([0.0, 2.5, 8.0]);
        let expected = Mat4::look_at_rh(
            Vec3::new(0.0, 2.5, 8.0),
            Vec3::new(0.0, 2.5, 7.0),
            Vec3::Y,
        );
        let got = camera.view_matrix();
        for (a, b) in got
            .to_cols_array()
            .iter()
            .zip(expected.to_cols_array().iter())
        {
            assert_close(*a, *b);
        }
    }

    #[test]
    fn forward_movement_follows_pitch() {
        let mut camera = Camera::new().angles(-90.0, 45.0);
        camera.advance(CameraMovement::Forward, 1.0);
        assert!(camera.position.y > 0.0);
        assert!(camera.position.z < 0.0);
    }
}
