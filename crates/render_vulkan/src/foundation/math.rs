//! Math utilities and types

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Build a rotation from Euler angles in degrees, applied X then Y then Z
pub fn quat_from_euler_degrees(angles: Vec3) -> Quat {
    Quat::from_euler_angles(
        angles.x.to_radians(),
        angles.y.to_radians(),
        angles.z.to_radians(),
    )
}

/// Wrap every component of an angle vector into `[0, 360)`
pub fn wrap_degrees(angles: Vec3) -> Vec3 {
    angles.map(|angle| angle.rem_euclid(360.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap_degrees_handles_negative_and_overflowing_angles() {
        let wrapped = wrap_degrees(Vec3::new(-0.01, 370.0, 360.0));
        assert_relative_eq!(wrapped.x, 359.99, epsilon = 1e-3);
        assert_relative_eq!(wrapped.y, 10.0, epsilon = 1e-4);
        assert_relative_eq!(wrapped.z, 0.0);
    }

    #[test]
    fn test_quat_from_euler_degrees_rotates_about_z() {
        let rotation = quat_from_euler_degrees(Vec3::new(0.0, 0.0, 90.0));
        let rotated = rotation * Vec3::x();
        assert_relative_eq!(rotated, Vec3::y(), epsilon = 1e-6);
    }
}
