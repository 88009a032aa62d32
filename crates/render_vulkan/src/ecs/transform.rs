//! Object placement in world space
//!
//! Rotation is stored as Euler angles in degrees and wrapped into `[0, 360)`.
//! The world matrix is `T * R * S`, recomputed lazily after a change.

use crate::foundation::math::{quat_from_euler_degrees, wrap_degrees, Mat4, Vec3};

/// Position, rotation and scale of a game object
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    world_matrix: Mat4,
    dirty: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            world_matrix: Mat4::identity(),
            dirty: false,
        }
    }
}

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Builder pattern: set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    /// Builder pattern: set rotation in degrees
    pub fn with_rotation(mut self, degrees: Vec3) -> Self {
        self.set_rotation(degrees);
        self
    }

    /// Builder pattern: set scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    /// Position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Rotation in degrees, each component in `[0, 360)`
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Set position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty = true;
    }

    /// Set rotation in degrees
    pub fn set_rotation(&mut self, degrees: Vec3) {
        self.rotation = wrap_degrees(degrees);
        self.dirty = true;
    }

    /// Set scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.dirty = true;
    }

    /// Move by `offset`
    pub fn translate(&mut self, offset: Vec3) {
        self.set_position(self.position + offset);
    }

    /// Add `degrees` to the rotation
    pub fn rotate(&mut self, degrees: Vec3) {
        self.set_rotation(self.rotation + degrees);
    }

    /// Multiply the scale component-wise
    pub fn scale_by(&mut self, factor: Vec3) {
        self.set_scale(self.scale.component_mul(&factor));
    }

    /// Object-to-world matrix
    pub fn world_matrix(&mut self) -> Mat4 {
        if self.dirty {
            self.world_matrix = Mat4::new_translation(&self.position)
                * quat_from_euler_degrees(self.rotation).to_homogeneous()
                * Mat4::new_nonuniform_scaling(&self.scale);
            self.dirty = false;
        }
        self.world_matrix
    }

    /// Local +Z in world space
    pub fn forward(&mut self) -> Vec3 {
        self.axis(2)
    }

    /// Local +X in world space
    pub fn right(&mut self) -> Vec3 {
        self.axis(0)
    }

    /// Local +Y in world space
    pub fn up(&mut self) -> Vec3 {
        self.axis(1)
    }

    fn axis(&mut self, column: usize) -> Vec3 {
        let matrix = self.world_matrix();
        let axis = matrix.fixed_view::<3, 1>(0, column).into_owned();
        axis.try_normalize(f32::EPSILON).unwrap_or(axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_identity() {
        let mut transform = Transform::default();
        assert_relative_eq!(transform.world_matrix(), Mat4::identity());
        assert_relative_eq!(transform.forward(), Vec3::z());
        assert_relative_eq!(transform.right(), Vec3::x());
        assert_relative_eq!(transform.up(), Vec3::y());
    }

    #[test]
    fn test_world_matrix_applies_scale_then_rotation_then_translation() {
        let mut transform = Transform::default()
            .with_position(Vec3::new(10.0, 0.0, 0.0))
            .with_rotation(Vec3::new(0.0, 0.0, 90.0))
            .with_scale(Vec3::new(2.0, 1.0, 1.0));

        let point = transform.world_matrix() * nalgebra::Vector4::new(1.0, 0.0, 0.0, 1.0);

        // (1,0,0) -> scale (2,0,0) -> rotate (0,2,0) -> translate (10,2,0)
        assert_relative_eq!(point.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(point.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(point.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rotate_wraps_angles() {
        let mut transform = Transform::default();
        transform.rotate(Vec3::new(0.0, 0.0, -0.01));
        assert_relative_eq!(transform.rotation().z, 359.99, epsilon = 1e-3);

        transform.rotate(Vec3::new(0.0, 0.0, 0.02));
        assert_relative_eq!(transform.rotation().z, 0.01, epsilon = 1e-3);
    }

    #[test]
    fn test_matrix_recomputed_after_change() {
        let mut transform = Transform::default();
        let before = transform.world_matrix();

        transform.translate(Vec3::new(0.0, 1.0, 0.0));
        let after = transform.world_matrix();

        assert_ne!(before, after);
        assert_relative_eq!(after[(1, 3)], 1.0);
    }

    #[test]
    fn test_direction_vectors_follow_rotation() {
        let mut transform = Transform::default().with_rotation(Vec3::new(0.0, 90.0, 0.0));

        // +90 degrees about Y turns +Z toward +X
        assert_relative_eq!(transform.forward(), Vec3::x(), epsilon = 1e-5);
        assert_relative_eq!(transform.up(), Vec3::y(), epsilon = 1e-5);
    }

    #[test]
    fn test_scale_by_is_component_wise() {
        let mut transform = Transform::default().with_scale(Vec3::new(1.0, 2.0, 3.0));
        transform.scale_by(Vec3::new(2.0, 2.0, 2.0));
        assert_relative_eq!(transform.scale(), Vec3::new(2.0, 4.0, 6.0));
        assert_relative_eq!(transform.forward(), Vec3::z(), epsilon = 1e-6);
    }
}
