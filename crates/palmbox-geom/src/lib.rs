//! Geometry primitives used by the palm detector.
//!
//! Everything in this crate is stateless and operates on `f32` pixel coordinates, with X pointing
//! right and Y pointing *down*, as in the images the detector works on. This means that positive
//! rotation angles are clockwise.
//!
//! - [`vector`]: normalization and 90° rotation of direction vectors.
//! - [`Affine2`]: 2D affine transforms solved from 3 point correspondences.
//! - [`Rect`]: axis-aligned rectangles and their intersection-over-union.
//! - [`Quad`]: arbitrary quadrilaterals, as produced by mapping a [`Rect`] through an [`Affine2`].

mod affine;
mod quad;
mod rect;
pub mod vector;

pub use affine::Affine2;
pub use nalgebra::{Point2, Vector2};
pub use quad::Quad;
pub use rect::Rect;

/// Errors raised when a geometric computation has no well-defined result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    /// A direction vector of zero length was normalized.
    #[error("cannot normalize a zero-length vector")]
    ZeroLength,
    /// A transform could not be solved or inverted because its points are collinear.
    #[error("transform is singular (points are collinear or coincide)")]
    Singular,
    /// An input or result contained NaN or infinite coordinates.
    #[error("non-finite coordinate encountered")]
    NonFinite,
}
