use std::fmt;

use nalgebra::{Matrix3, Point2, Vector2, Vector3};

use crate::GeometryError;

/// A 2D affine transform (rotation, non-uniform scale, shear and translation).
///
/// Internally, the transform is stored as a homogeneous 3x3 matrix in `f64` precision to keep
/// round trips through [`Affine2::inverse`] accurate. Points are passed in and out as `f32`.
#[derive(Clone, Copy, PartialEq)]
pub struct Affine2 {
    matrix: Matrix3<f64>,
}

impl Affine2 {
    /// A uniform scale about the origin.
    pub fn scale(factor: f32) -> Self {
        let f = factor as f64;
        Self {
            matrix: Matrix3::new_nonuniform_scaling(&Vector2::new(f, f)),
        }
    }

    /// Solves the affine transform that maps each point in `src` onto the point at the same index
    /// in `dst`.
    ///
    /// Three non-collinear correspondences determine an affine transform exactly. If the points
    /// in `src` are collinear (or coincide), no such transform exists and
    /// [`GeometryError::Singular`] is returned.
    pub fn from_triangles(
        src: [Point2<f32>; 3],
        dst: [Point2<f32>; 3],
    ) -> Result<Self, GeometryError> {
        // Both triangles are expressed as the image of the unit triangle (0,0), (1,0), (0,1).
        // Going from `src` to `dst` then means undoing the first mapping and applying the second.
        let from_unit_src = triangle_basis(&src)?;
        let from_unit_dst = triangle_basis(&dst)?;
        let to_unit_src = invert(&from_unit_src)?;

        Ok(Self {
            matrix: from_unit_dst * to_unit_src,
        })
    }

    /// Returns the inverse of this transform.
    pub fn inverse(&self) -> Result<Self, GeometryError> {
        Ok(Self {
            matrix: invert(&self.matrix)?,
        })
    }

    /// Returns a transform that first applies `self`, then `next`.
    #[must_use]
    pub fn then(&self, next: &Affine2) -> Self {
        Self {
            matrix: next.matrix * self.matrix,
        }
    }

    /// Maps a point through this transform.
    pub fn apply(&self, point: Point2<f32>) -> Point2<f32> {
        let v = self.matrix * Vector3::new(point.x as f64, point.y as f64, 1.0);
        Point2::new(v.x as f32, v.y as f32)
    }

}

impl fmt::Debug for Affine2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.matrix;
        write!(
            f,
            "Affine2 [{:.4} {:.4} {:.4}; {:.4} {:.4} {:.4}]",
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
        )
    }
}

#[rustfmt::skip]
fn triangle_basis(tri: &[Point2<f32>; 3]) -> Result<Matrix3<f64>, GeometryError> {
    if tri.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(GeometryError::NonFinite);
    }

    let [a, b, c] = tri.map(|p| p.cast::<f64>());
    Ok(Matrix3::new(
        b.x - a.x, c.x - a.x, a.x,
        b.y - a.y, c.y - a.y, a.y,
        0.0, 0.0, 1.0,
    ))
}

fn invert(m: &Matrix3<f64>) -> Result<Matrix3<f64>, GeometryError> {
    let det = m.determinant();
    if !det.is_finite() || det.abs() < f64::EPSILON {
        return Err(GeometryError::Singular);
    }

    m.try_inverse().ok_or(GeometryError::Singular)
}
