//! # 3D Camera System
//!
//! [`Camera`] is a plain value owned by the scene. Orientation is stored as
//! Euler angles in degrees (pitch about X, yaw about Y, roll about Z) and
//! applied as `Ry * Rx * Rz`; the camera looks down -Z when all are zero.
//!
//! Interactive movement lives in a [`CameraController`], which the scene runs
//! before the camera recomputes its view.

use crate::foundation::math::{utils, Mat4, Vec3};
use crate::gpu::Viewport;
use crate::input::{InputState, KeyCode};

/// Perspective camera
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    rotation: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    view: Mat4,
    projection: Mat4,
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    max_light_distance: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(45.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl Camera {
    /// Create a camera at the origin looking down -Z
    ///
    /// # Arguments
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            forward: Vec3::new(0.0, 0.0, -1.0),
            right: Vec3::x(),
            up: Vec3::y(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
            fov: fov_degrees,
            aspect,
            near,
            far,
            max_light_distance: 1_000_000.0,
        };
        camera.update_projection();
        camera.update_view();
        camera
    }

    /// Per-frame update: adopt the new viewport aspect and rebuild the view
    pub fn update(&mut self, resized: Option<Viewport>) {
        if let Some(viewport) = resized {
            self.set_aspect_ratio(viewport.aspect_ratio());
        }
        self.update_view();
    }

    fn update_view(&mut self) {
        let rotation = Mat4::from_axis_angle(&Vec3::y_axis(), utils::deg_to_rad(self.rotation.y))
            * Mat4::from_axis_angle(&Vec3::x_axis(), utils::deg_to_rad(self.rotation.x))
            * Mat4::from_axis_angle(&Vec3::z_axis(), utils::deg_to_rad(self.rotation.z));

        self.forward = rotation.transform_vector(&Vec3::new(0.0, 0.0, -1.0)).normalize();
        self.right = rotation.transform_vector(&Vec3::x()).normalize();
        self.up = rotation.transform_vector(&Vec3::y()).normalize();
        self.view = utils::look_at(self.position, self.position + self.forward, self.up);
    }

    fn update_projection(&mut self) {
        self.projection = utils::perspective(utils::deg_to_rad(self.fov), self.aspect, self.near, self.far);
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Move the camera
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view();
    }

    /// Euler rotation in degrees (pitch, yaw, roll)
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Set the Euler rotation in degrees (pitch, yaw, roll)
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.update_view();
    }

    /// Turn the camera towards a world-space point.
    ///
    /// The rotation is rewritten to match, so later updates keep the
    /// direction. Roll is reset.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(direction) = (target - self.position).try_normalize(f32::EPSILON) else {
            return;
        };
        let pitch = utils::rad_to_deg(direction.y.clamp(-1.0, 1.0).asin());
        let yaw = utils::rad_to_deg((-direction.x).atan2(-direction.z));
        self.rotation = Vec3::new(pitch, yaw, 0.0);
        self.update_view();
    }

    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Unit right vector
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Unit up vector
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// View-to-clip matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Update camera aspect ratio for viewport changes
    ///
    /// Only logs when the difference is significant (> 0.01) to reduce log
    /// noise during window resize events.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if !aspect.is_finite() || aspect <= 0.0 {
            return;
        }
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        if (self.aspect - aspect).abs() > f32::EPSILON {
            self.aspect = aspect;
            self.update_projection();
        }
    }

    /// Aspect ratio
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    /// Vertical field of view in degrees
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Set the vertical field of view in degrees
    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov = fov_degrees;
        self.update_projection();
    }

    /// Near plane distance
    pub fn near_plane(&self) -> f32 {
        self.near
    }

    /// Set the near plane distance
    pub fn set_near_plane(&mut self, near: f32) {
        self.near = near;
        self.update_projection();
    }

    /// Far plane distance
    pub fn far_plane(&self) -> f32 {
        self.far
    }

    /// Set the far plane distance
    pub fn set_far_plane(&mut self, far: f32) {
        self.far = far;
        self.update_projection();
    }

    /// Lights further away than this are not shaded
    pub fn max_light_distance(&self) -> f32 {
        self.max_light_distance
    }

    /// Set the light cut-off distance
    pub fn set_max_light_distance(&mut self, distance: f32) {
        self.max_light_distance = distance;
    }
}

/// Drives a camera from input every frame
pub trait CameraController {
    /// Move or turn the camera
    fn update(&mut self, camera: &mut Camera, input: &InputState, delta_time: f32);
}

/// Mouse-look fly camera.
///
/// Active only while the mouse is locked: the mouse turns the camera, WASD
/// moves on the horizontal plane, Space/Left Control move up and down and
/// Left Shift speeds everything up.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    /// Degrees per pixel of mouse movement
    pub sensitivity: f32,
    /// Units per second
    pub speed: f32,
    /// Units per second while Left Shift is held
    pub fast_speed: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            sensitivity: 0.1,
            speed: 10.0,
            fast_speed: 32.0,
        }
    }
}

impl CameraController for FlyCamera {
    fn update(&mut self, camera: &mut Camera, input: &InputState, delta_time: f32) {
        if !input.is_mouse_locked() {
            return;
        }

        let delta = input.mouse_delta() * self.sensitivity;
        let mut rotation = camera.rotation();
        rotation.y += delta.x;
        rotation.x = (rotation.x + delta.y).clamp(-89.0, 89.0);
        camera.set_rotation(rotation);

        let speed = if input.is_key_pressed(KeyCode::LeftShift) {
            self.fast_speed
        } else {
            self.speed
        };
        let step = speed * delta_time;
        let forward = camera.forward();
        let flat_forward = Vec3::new(forward.x, 0.0, forward.z)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::zeros);
        let right = camera.right();

        let mut position = camera.position();
        if input.is_key_pressed(KeyCode::W) {
            position += flat_forward * step;
        }
        if input.is_key_pressed(KeyCode::S) {
            position -= flat_forward * step;
        }
        if input.is_key_pressed(KeyCode::A) {
            position -= right * step;
        }
        if input.is_key_pressed(KeyCode::D) {
            position += right * step;
        }
        if input.is_key_pressed(KeyCode::Space) {
            position.y += step;
        }
        if input.is_key_pressed(KeyCode::LeftControl) {
            position.y -= step;
        }
        camera.set_position(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        assert_relative_eq!(camera.forward(), Vec3::new(0.0, 0.0, -1.0), epsilon = EPSILON);
        assert_relative_eq!(camera.aspect_ratio(), 16.0 / 9.0);
        assert_relative_eq!(camera.max_light_distance(), 1_000_000.0);
    }

    #[test]
    fn test_resize_updates_aspect_and_projection() {
        let mut camera = Camera::default();
        let before = camera.projection_matrix();

        camera.update(None);
        assert_relative_eq!(camera.projection_matrix(), before);

        camera.update(Some(Viewport::new(800, 800)));
        assert_relative_eq!(camera.aspect_ratio(), 1.0);
        assert!((camera.projection_matrix() - before).norm() > EPSILON);

        // Degenerate viewport leaves the aspect alone
        camera.update(Some(Viewport::new(800, 0)));
        assert_relative_eq!(camera.aspect_ratio(), 1.0);
    }

    #[test]
    fn test_look_at_persists_across_updates() {
        let mut camera = Camera::default();
        camera.set_position(Vec3::new(0.0, 10.0, 10.0));
        camera.look_at(Vec3::zeros());
        camera.update(None);

        let expected = Vec3::new(0.0, -1.0, -1.0).normalize();
        assert_relative_eq!(camera.forward(), expected, epsilon = EPSILON);
    }

    #[test]
    fn test_fly_camera_ignores_input_while_unlocked() {
        let mut camera = Camera::default();
        let mut input = InputState::new();
        input.handle_key_input(KeyCode::W, true);

        FlyCamera::default().update(&mut camera, &input, 1.0);
        assert_relative_eq!(camera.position(), Vec3::zeros());

        input.set_mouse_locked(true);
        FlyCamera::default().update(&mut camera, &input, 1.0);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, -10.0), epsilon = EPSILON);
    }

    #[test]
    fn test_fly_camera_clamps_pitch() {
        let mut camera = Camera::default();
        let mut input = InputState::new();
        input.set_mouse_locked(true);
        input.handle_mouse_move(0.0, 5000.0);
        input.handle_mouse_move(0.0, 0.0);

        FlyCamera::default().update(&mut camera, &input, 0.0);
        assert_relative_eq!(camera.rotation().x, 89.0);
    }
}
