//! Position, rotation and scale of a game object

use crate::foundation::math::{utils, Mat4, Quat, Vec3};

/// Spatial state of a game object.
///
/// The quaternion is canonical; the Euler angles (degrees, XYZ, applied as
/// `Rz * Ry * Rx`) are cached for editing and rewritten whenever the
/// quaternion changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    euler_degrees: Vec3,
    scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            euler_degrees: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Identity transform
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity rotation and unit scale at `position`
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Set the position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Move by `delta`
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Euler angles in degrees
    pub fn rotation(&self) -> Vec3 {
        self.euler_degrees
    }

    /// Rotation quaternion
    pub fn rotation_quaternion(&self) -> Quat {
        self.rotation
    }

    /// Set the rotation from Euler angles in degrees
    pub fn set_rotation(&mut self, euler_degrees: Vec3) {
        self.euler_degrees = euler_degrees;
        self.rotation = utils::quat_from_euler_degrees(euler_degrees);
    }

    /// Set the rotation from a quaternion
    pub fn set_rotation_quaternion(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.euler_degrees = utils::euler_degrees_from_quat(&rotation);
    }

    /// Add `delta_degrees` to the Euler angles
    pub fn rotate(&mut self, delta_degrees: Vec3) {
        self.set_rotation(self.euler_degrees + delta_degrees);
    }

    /// Scale per axis
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Set the scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    /// Add `delta` to the scale
    pub fn add_scale(&mut self, delta: Vec3) {
        self.scale += delta;
    }

    /// `T * R * S`
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Local -Z in world space
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::new(0.0, 0.0, -1.0)
    }

    /// Local +X in world space
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::x()
    }

    /// Local +Y in world space
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_euler_quaternion_round_trip() {
        for euler in [
            Vec3::new(10.0, 20.0, 30.0),
            Vec3::new(-45.0, 60.0, 170.0),
            Vec3::new(0.0, -80.0, 0.0),
            Vec3::new(120.0, 5.0, -15.0),
        ] {
            let mut transform = Transform::new();
            transform.set_rotation(euler);
            let q = transform.rotation_quaternion();

            let mut round_trip = Transform::new();
            round_trip.set_rotation_quaternion(q);
            assert_relative_eq!(round_trip.rotation(), euler, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_round_trip_near_gimbal_lock_compares_quaternions() {
        for pitch in [89.9_f32, 90.0, -90.0] {
            let mut transform = Transform::new();
            transform.set_rotation(Vec3::new(25.0, pitch, 40.0));
            let q = transform.rotation_quaternion();

            let mut round_trip = Transform::new();
            round_trip.set_rotation_quaternion(q);
            let back = utils::quat_from_euler_degrees(round_trip.rotation());
            assert!(back.angle_to(&q) < 1e-3);
        }
    }

    #[test]
    fn test_model_matrix_is_translate_rotate_scale() {
        let mut transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        transform.set_rotation(Vec3::new(0.0, 90.0, 0.0));
        transform.set_scale(Vec3::new(2.0, 1.0, 1.0));

        // +X is scaled to 2, turned onto -Z, then moved
        let p = transform.model_matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.xyz(), Vec3::new(1.0, 2.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_relative_edits() {
        let mut transform = Transform::new();
        transform.translate(Vec3::new(1.0, 0.0, 0.0));
        transform.translate(Vec3::new(0.0, 2.0, 0.0));
        transform.rotate(Vec3::new(0.0, 45.0, 0.0));
        transform.rotate(Vec3::new(0.0, 45.0, 0.0));
        transform.add_scale(Vec3::new(1.0, 0.0, 0.0));

        assert_relative_eq!(transform.position(), Vec3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(transform.rotation(), Vec3::new(0.0, 90.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(transform.scale(), Vec3::new(2.0, 1.0, 1.0));
        assert_relative_eq!(transform.forward(), Vec3::new(-1.0, 0.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(transform.up(), Vec3::y(), epsilon = EPSILON);
    }
}
