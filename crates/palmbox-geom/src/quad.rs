use nalgebra::Point2;

use crate::{Affine2, Rect};

/// A quadrilateral given by its 4 corners.
///
/// Mapping the corners of a [`Rect`] through an [`Affine2`] yields a parallelogram that may be
/// rotated; [`Quad`] keeps that shape around instead of flattening it into an axis-aligned box.
/// Corner order is preserved, so for a quad derived from [`Rect::corners`], corner 0 is the image
/// of the top left corner and corner 1 the image of the top right corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    corners: [Point2<f32>; 4],
}

impl Quad {
    #[inline]
    pub fn new(corners: [Point2<f32>; 4]) -> Self {
        Self { corners }
    }

    /// Maps each corner of `rect` through `transform`.
    pub fn from_rect(rect: &Rect, transform: &Affine2) -> Self {
        Self::new(rect.corners().map(|p| transform.apply(p)))
    }

    #[inline]
    pub fn corners(&self) -> &[Point2<f32>; 4] {
        &self.corners
    }

    /// Returns the angle of the edge from corner 0 to corner 1, in radians, clockwise.
    ///
    /// This is 0.0 for a quad whose top edge points right, and lies in `-π..=π`.
    pub fn angle(&self) -> f32 {
        let edge = self.corners[1] - self.corners[0];
        edge.y.atan2(edge.x)
    }

    /// Returns the axis-aligned rectangle enclosing all 4 corners.
    pub fn bounding_rect(&self) -> Rect {
        let [a, b, c, d] = self.corners;
        let min = a.inf(&b).inf(&c).inf(&d);
        let max = a.sup(&b).sup(&c).sup(&d);
        Rect::from_corners(min, max)
    }

    pub fn is_finite(&self) -> bool {
        self.corners.iter().all(|p| p.x.is_finite() && p.y.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn angle_follows_top_edge() {
        let rect = Rect::from_top_left(0.0, 0.0, 4.0, 2.0);
        let upright = Quad::from_rect(&rect, &Affine2::scale(1.0));
        assert_eq!(upright.angle(), 0.0);

        // top edge pointing down: rotated a quarter turn clockwise
        let rotated = Quad::new([
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 4.0),
            Point2::new(8.0, 4.0),
            Point2::new(8.0, 0.0),
        ]);
        assert_abs_diff_eq!(rotated.angle(), FRAC_PI_2);

        let flip = |quad: &Quad| Quad::new((*quad.corners()).map(|p| Point2::new(-p.x, -p.y)));
        assert_abs_diff_eq!(flip(&rotated).angle(), -FRAC_PI_2);
        assert_abs_diff_eq!(flip(&upright).angle().abs(), PI);

        let doubled = Quad::from_rect(&rect, &Affine2::scale(2.0));
        assert_eq!(doubled.corners()[2], Point2::new(8.0, 4.0));
        assert_eq!(doubled.angle(), 0.0);
    }

    #[test]
    fn bounding_rect() {
        let quad = Quad::new([
            Point2::new(5.0, 0.0),
            Point2::new(10.0, 5.0),
            Point2::new(5.0, 10.0),
            Point2::new(0.0, 5.0),
        ]);
        assert_eq!(quad.bounding_rect(), Rect::from_top_left(0.0, 0.0, 10.0, 10.0));
        assert!(quad.is_finite());
    }
}
