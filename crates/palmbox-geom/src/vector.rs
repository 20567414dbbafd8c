//! Direction vector helpers.

use nalgebra::{Matrix2, Vector2};

use crate::GeometryError;

/// Scales `v` to unit length.
///
/// Returns [`GeometryError::ZeroLength`] if `v` has (near) zero length, and
/// [`GeometryError::NonFinite`] if either component is NaN or infinite.
pub fn normalize(v: Vector2<f32>) -> Result<Vector2<f32>, GeometryError> {
    if !v.x.is_finite() || !v.y.is_finite() {
        return Err(GeometryError::NonFinite);
    }

    v.try_normalize(f32::EPSILON).ok_or(GeometryError::ZeroLength)
}

/// Rotates `v` by 90° using the matrix `[[0, 1], [-1, 0]]`.
///
/// With Y pointing down this turns a vector pointing up (`(0, -1)`) into one pointing left
/// (`(-1, 0)`).
pub fn rotate_90(v: Vector2<f32>) -> Vector2<f32> {
    Matrix2::new(0.0, 1.0, -1.0, 0.0) * v
}
