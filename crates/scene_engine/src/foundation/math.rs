//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics and game development.
//! The aliases are the same nalgebra types rapier uses, so poses cross the
//! physics boundary without conversion.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Point3, Quat, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Build a rotation from XYZ Euler angles in degrees.
    ///
    /// The resulting rotation is `Rz * Ry * Rx`: X is applied first, Z last.
    pub fn quat_from_euler_degrees(euler: Vec3) -> Quat {
        Quat::from_euler_angles(
            deg_to_rad(euler.x),
            deg_to_rad(euler.y),
            deg_to_rad(euler.z),
        )
    }

    /// Inverse of [`quat_from_euler_degrees`].
    ///
    /// The Y angle is confined to [-90, 90]; outside that range an equivalent
    /// triple is returned.
    pub fn euler_degrees_from_quat(rotation: &Quat) -> Vec3 {
        let (x, y, z) = rotation.euler_angles();
        Vec3::new(rad_to_deg(x), rad_to_deg(y), rad_to_deg(z))
    }

    /// Right-handed look-at view matrix.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    /// Right-handed perspective projection (clip depth in [-1, 1]).
    pub fn perspective(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y_radians, near, far)
    }

    /// Orthographic projection with explicit bounds.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_orthographic(left, right, bottom, top, near, far)
    }

    /// Drop the translation part of a view matrix (the `mat3(view)` trick).
    pub fn strip_translation(view: &Mat4) -> Mat4 {
        let mut rotation_only = *view;
        rotation_only[(0, 3)] = 0.0;
        rotation_only[(1, 3)] = 0.0;
        rotation_only[(2, 3)] = 0.0;
        rotation_only
    }

    /// True when every component of the vector is finite.
    pub fn is_finite(v: &Vec3) -> bool {
        v.iter().all(|c| c.is_finite())
    }
}
