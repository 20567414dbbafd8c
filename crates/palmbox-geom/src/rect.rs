use std::fmt;

use nalgebra::{Point2, Vector2};

/// An axis-aligned rectangle.
///
/// Rectangles are stored in center format, which is what detection networks regress. They are
/// allowed to have zero height and/or width. Negative dimensions are not allowed.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    center: Point2<f32>,
    size: Vector2<f32>,
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            center: Point2::new(x_center, y_center),
            size: Vector2::new(width, height),
        }
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self::from_center(
            top_left_x + width * 0.5,
            top_left_y + height * 0.5,
            width,
            height,
        )
    }

    /// Creates a rectangle from its top left and bottom right corners.
    ///
    /// # Panics
    ///
    /// Panics if `min` is not above and to the left of `max`.
    pub fn from_corners(min: Point2<f32>, max: Point2<f32>) -> Self {
        assert!(min.x <= max.x, "x_min={}, x_max={}", min.x, max.x);
        assert!(min.y <= max.y, "y_min={}, y_max={}", min.y, max.y);
        Self::from_top_left(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Computes the bounding rectangle that encompasses `points`.
    ///
    /// Returns [`None`] if `points` is an empty iterator.
    pub fn bounding<I: IntoIterator<Item = Point2<f32>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();

        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for pt in iter {
            min = min.inf(&pt);
            max = max.sup(&pt);
        }

        Some(Self::from_corners(min, max))
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.top_left().x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.top_left().y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        self.center
    }

    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        self.size
    }

    #[inline]
    pub fn top_left(&self) -> Point2<f32> {
        self.center - self.size * 0.5
    }

    #[inline]
    pub fn bottom_right(&self) -> Point2<f32> {
        self.center + self.size * 0.5
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.size.x * self.size.y
    }

    /// Returns the four corners, clockwise, starting at the top left.
    pub fn corners(&self) -> [Point2<f32>; 4] {
        let (min, max) = (self.top_left(), self.bottom_right());
        [
            min,
            Point2::new(max.x, min.y),
            max,
            Point2::new(min.x, max.y),
        ]
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns [`None`] when the rectangles do not overlap. Rectangles that merely touch produce
    /// an intersection with zero area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = self.top_left().sup(&other.top_left());
        let max = self.bottom_right().inf(&other.bottom_right());
        if min.x > max.x || min.y > max.y {
            return None;
        }

        Some(Rect::from_corners(min, max))
    }

    /// Returns the area of the intersection of `self` and `other`.
    ///
    /// The overlap along each axis is clamped to 0, so this is never negative.
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        let min = self.top_left().sup(&other.top_left());
        let max = self.bottom_right().inf(&other.bottom_right());
        f32::max(0.0, max.x - min.x) * f32::max(0.0, max.y - min.y)
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    ///
    /// Returns 0.0 if both rectangles have zero area.
    pub fn iou(&self, other: &Rect) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Restricts `self` to the area covered by `bounds`.
    ///
    /// Returns [`None`] if nothing of `self` with a positive area is left.
    pub fn clip_to(&self, bounds: &Rect) -> Option<Rect> {
        self.intersection(bounds)
            .filter(|rect| rect.area() > 0.0)
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.center.x, self.center.y, self.size.x, self.size.y
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn center_and_corner_format() {
        let rect = Rect::from_center(10.0, 20.0, 4.0, 6.0);
        assert_eq!(rect.x(), 8.0);
        assert_eq!(rect.y(), 17.0);
        assert_eq!(rect.bottom_right(), Point2::new(12.0, 23.0));
        assert_eq!(
            Rect::from_top_left(8.0, 17.0, 4.0, 6.0),
            Rect::from_center(10.0, 20.0, 4.0, 6.0)
        );
        assert_eq!(
            rect.corners(),
            [
                Point2::new(8.0, 17.0),
                Point2::new(12.0, 17.0),
                Point2::new(12.0, 23.0),
                Point2::new(8.0, 23.0),
            ]
        );
    }

    #[test]
    fn bounding() {
        assert_eq!(Rect::bounding([]), None);

        let rect = Rect::bounding([
            Point2::new(1.0, 5.0),
            Point2::new(-2.0, 3.0),
            Point2::new(4.0, 4.0),
        ])
        .unwrap();
        assert_eq!(rect, Rect::from_top_left(-2.0, 3.0, 6.0, 2.0));
    }

    #[test]
    fn intersection() {
        let a = Rect::from_top_left(0.0, 0.0, 4.0, 4.0);
        let b = Rect::from_top_left(2.0, 1.0, 4.0, 4.0);
        assert_eq!(a.intersection(&b), Some(Rect::from_top_left(2.0, 1.0, 2.0, 3.0)));
        assert_eq!(a.intersection_area(&b), 6.0);

        let far = Rect::from_top_left(10.0, 10.0, 1.0, 1.0);
        assert_eq!(a.intersection(&far), None);
        assert_eq!(a.intersection_area(&far), 0.0);
    }

    #[test]
    fn iou_properties() {
        let a = Rect::from_center(0.0, 0.0, 2.0, 2.0);
        let b = Rect::from_center(1.0, 0.5, 3.0, 1.0);
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&b), b.iou(&a));

        let inner = Rect::from_top_left(-1.0, -1.0, 2.0, 1.0);
        assert_abs_diff_eq!(a.iou(&inner), 0.5);

        let disjoint = Rect::from_center(10.0, 0.0, 2.0, 2.0);
        assert_eq!(a.iou(&disjoint), 0.0);
        assert_eq!(disjoint.iou(&a), 0.0);

        let empty = Rect::from_center(0.0, 0.0, 0.0, 0.0);
        assert_eq!(empty.iou(&empty), 0.0);
    }

    #[test]
    fn iou_symmetry_random() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut rect = || {
            Rect::from_center(
                rng.f32() * 100.0,
                rng.f32() * 100.0,
                rng.f32() * 50.0 + 1.0,
                rng.f32() * 50.0 + 1.0,
            )
        };

        for _ in 0..500 {
            let (a, b) = (rect(), rect());
            let iou = a.iou(&b);
            assert!((0.0..=1.0).contains(&iou), "{a:?} {b:?} -> {iou}");
            assert_abs_diff_eq!(iou, b.iou(&a), epsilon = 1e-6);
            assert_abs_diff_eq!(a.iou(&a), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn clip() {
        let bounds = Rect::from_top_left(0.0, 0.0, 100.0, 50.0);
        let rect = Rect::from_top_left(-10.0, 40.0, 30.0, 30.0);
        assert_eq!(
            rect.clip_to(&bounds),
            Some(Rect::from_top_left(0.0, 40.0, 20.0, 10.0))
        );

        let outside = Rect::from_top_left(100.0, 0.0, 10.0, 10.0);
        assert_eq!(outside.clip_to(&bounds), None);
    }
}
