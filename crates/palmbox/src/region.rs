//! Hand region estimation from palm keypoints.
//!
//! The palm detector's box only covers the palm itself. To obtain a region containing the whole
//! hand, a canonical box is placed relative to the wrist and middle finger keypoints, enlarged,
//! shifted towards the fingers and mapped back onto the source image.

use std::f32::consts::PI;

use palmbox_geom::{vector, Affine2, GeometryError, Point2, Quad, Rect};

use crate::{
    detection::{Candidate, Keypoint},
    preprocess::Letterbox,
};

/// The square reference frame hand regions are defined in.
///
/// The source triangle built from the keypoints is mapped onto `triangle`; the region is the
/// `size`x`size` box of this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalFrame {
    triangle: [[f32; 2]; 3],
    size: f32,
}

impl CanonicalFrame {
    /// The 256x256 frame of the palm detection pipeline.
    pub const PALM_256: Self = Self {
        triangle: [[128.0, 128.0], [128.0, 0.0], [0.0, 128.0]],
        size: 256.0,
    };

    /// Creates a frame from the destination of the (anchor, axis, side) triangle and its box size.
    pub fn new(triangle: [[f32; 2]; 3], size: f32) -> Self {
        Self { triangle, size }
    }

    pub fn triangle(&self) -> [Point2<f32>; 3] {
        self.triangle.map(|[x, y]| Point2::new(x, y))
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Returns the frame's box, with its top left corner at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.size, self.size)
    }
}

impl Default for CanonicalFrame {
    fn default() -> Self {
        Self::PALM_256
    }
}

/// An axis-aligned box around a detected hand, in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Detection confidence between 0.0 and 1.0.
    pub confidence: f32,
}

impl BoundingBox {
    pub fn from_rect(rect: Rect, confidence: f32) -> Self {
        Self {
            x: rect.x(),
            y: rect.y(),
            width: rect.width(),
            height: rect.height(),
            confidence,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_top_left(self.x, self.y, self.width, self.height)
    }
}

/// How the oriented hand quad was reduced to a [`BoundingBox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// The quad is close to axis-aligned; the box spans from the first corner to the width of the
    /// top edge and the height of the right edge.
    CornerReadout,
    /// The quad is rotated; the box is its axis-aligned bounding rectangle.
    BoundingRect,
}

/// A detected hand region.
#[derive(Debug, Clone)]
pub struct HandRegion {
    quad: Quad,
    angle: f32,
    bounding_box: BoundingBox,
    reduction: Reduction,
}

impl HandRegion {
    /// Returns the oriented region, in source image pixels.
    ///
    /// The corners are the images of the canonical frame's box corners, clockwise for an upright
    /// hand, starting at the corner left of the fingers.
    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    /// Returns the clockwise rotation of the region, in radians.
    ///
    /// 0.0 means the fingers point up.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn confidence(&self) -> f32 {
        self.bounding_box.confidence
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    /// Clips the bounding box to `bounds`.
    ///
    /// Returns [`None`] if nothing of the box remains. The quad is left untouched.
    pub fn clipped(mut self, bounds: &Rect) -> Option<Self> {
        let rect = self.bounding_box.rect().clip_to(bounds)?;
        self.bounding_box = BoundingBox::from_rect(rect, self.bounding_box.confidence);
        Some(self)
    }
}

/// Computes [`HandRegion`]s from palm [`Candidate`]s.
#[derive(Debug, Clone)]
pub struct RegionEstimator {
    box_enlarge: f32,
    box_shift: f32,
    frame: CanonicalFrame,
    axis_tolerance: f32,
}

impl RegionEstimator {
    pub const DEFAULT_BOX_ENLARGE: f32 = 1.5;
    pub const DEFAULT_BOX_SHIFT: f32 = 0.2;
    /// 15 degrees.
    pub const DEFAULT_AXIS_TOLERANCE: f32 = PI / 12.0;

    pub fn new() -> Self {
        Self {
            box_enlarge: Self::DEFAULT_BOX_ENLARGE,
            box_shift: Self::DEFAULT_BOX_SHIFT,
            frame: CanonicalFrame::PALM_256,
            axis_tolerance: Self::DEFAULT_AXIS_TOLERANCE,
        }
    }

    /// Sets the factor the longer side of the palm box is scaled by.
    pub fn with_box_enlarge(mut self, box_enlarge: f32) -> Self {
        self.box_enlarge = box_enlarge;
        self
    }

    /// Sets how far the region is moved from the wrist towards the middle finger, as a fraction
    /// of the distance between the two.
    pub fn with_box_shift(mut self, box_shift: f32) -> Self {
        self.box_shift = box_shift;
        self
    }

    pub fn with_frame(mut self, frame: CanonicalFrame) -> Self {
        self.frame = frame;
        self
    }

    /// Sets the largest rotation (in radians) for which [`Reduction::CornerReadout`] is used.
    pub fn with_axis_tolerance(mut self, axis_tolerance: f32) -> Self {
        self.axis_tolerance = axis_tolerance;
        self
    }

    /// Estimates the hand region of `candidate`, in the source coordinates of `letterbox`.
    pub fn estimate(
        &self,
        candidate: &Candidate,
        letterbox: &Letterbox,
    ) -> Result<HandRegion, GeometryError> {
        let wrist = candidate.keypoint(Keypoint::Wrist);
        let middle = candidate.keypoint(Keypoint::MiddleFingerMcp);

        let dir = vector::normalize(middle - wrist)?;
        let dir_r = vector::rotate_90(dir);

        let rect = candidate.rect();
        let side = rect.width().max(rect.height()) * self.box_enlarge;
        let shift = -(wrist - middle) * self.box_shift;
        let source = [middle, middle + dir * side, middle + dir_r * side].map(|p| p + shift);

        let to_frame = Affine2::from_triangles(source, self.frame.triangle())?;
        let to_source = to_frame.inverse()?.then(&letterbox.to_source());

        let quad = Quad::from_rect(&self.frame.bounds(), &to_source);
        if !quad.is_finite() {
            return Err(GeometryError::NonFinite);
        }

        let angle = quad.angle();
        let (rect, reduction) = self.reduce(&quad, angle);
        log::trace!(
            "hand region: angle={angle} {:?} ({reduction:?})",
            quad.corners()
        );

        Ok(HandRegion {
            quad,
            angle,
            bounding_box: BoundingBox::from_rect(rect, candidate.probability()),
            reduction,
        })
    }

    fn reduce(&self, quad: &Quad, angle: f32) -> (Rect, Reduction) {
        let [c0, c1, c2, _] = *quad.corners();
        let width = c1.x - c0.x;
        let height = c2.y - c1.y;

        if angle.abs() <= self.axis_tolerance && width > 0.0 && height > 0.0 {
            (
                Rect::from_top_left(c0.x, c0.y, width, height),
                Reduction::CornerReadout,
            )
        } else {
            log::warn!(
                "hand region rotated by {:.1} degrees, using its bounding rectangle",
                angle.to_degrees()
            );
            (quad.bounding_rect(), Reduction::BoundingRect)
        }
    }
}

impl Default for RegionEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;

    use crate::detection::Keypoints;

    use super::*;

    fn candidate(wrist: [f32; 2], middle: [f32; 2], size: f32) -> Candidate {
        let mut points = [Point2::new(90.0, 100.0); 7];
        points[Keypoint::Wrist as usize] = Point2::new(wrist[0], wrist[1]);
        points[Keypoint::MiddleFingerMcp as usize] = Point2::new(middle[0], middle[1]);
        Candidate::new(
            Rect::from_center(96.0, 96.0, size, size),
            Keypoints::new(points),
            0.9,
            0,
        )
    }

    fn assert_rect(bb: &BoundingBox, [x, y, w, h]: [f32; 4], epsilon: f32) {
        assert_abs_diff_eq!(bb.x, x, epsilon = epsilon);
        assert_abs_diff_eq!(bb.y, y, epsilon = epsilon);
        assert_abs_diff_eq!(bb.width, w, epsilon = epsilon);
        assert_abs_diff_eq!(bb.height, h, epsilon = epsilon);
    }

    #[test]
    fn upright_hand() {
        let letterbox = Letterbox::for_image(192, 192, 192).unwrap();
        let region = RegionEstimator::new()
            .estimate(&candidate([96.0, 136.0], [96.0, 96.0], 50.0), &letterbox)
            .unwrap();

        assert_eq!(region.reduction(), Reduction::CornerReadout);
        assert_abs_diff_eq!(region.angle(), 0.0, epsilon = 1e-5);
        assert_rect(region.bounding_box(), [21.0, 13.0, 150.0, 150.0], 1e-3);
        assert_eq!(region.confidence(), 0.9);

        let expected = [[21.0, 13.0], [171.0, 13.0], [171.0, 163.0], [21.0, 163.0]];
        for (corner, [x, y]) in region.quad().corners().iter().zip(expected) {
            assert_abs_diff_eq!(corner.x, x, epsilon = 1e-3);
            assert_abs_diff_eq!(corner.y, y, epsilon = 1e-3);
        }
    }

    #[test]
    fn scales_to_source() {
        let letterbox = Letterbox::for_image(4000, 2000, 192).unwrap();
        let s = letterbox.scale();
        let region = RegionEstimator::new()
            .estimate(&candidate([96.0, 136.0], [96.0, 96.0], 50.0), &letterbox)
            .unwrap();

        assert_rect(
            region.bounding_box(),
            [21.0 * s, 13.0 * s, 150.0 * s, 150.0 * s],
            0.05,
        );

        let clipped = region.clipped(&letterbox.source_bounds()).unwrap();
        assert_rect(
            clipped.bounding_box(),
            [21.0 * s, 13.0 * s, 150.0 * s, 2000.0 - 13.0 * s],
            0.05,
        );
        // the quad is not clipped
        assert_abs_diff_eq!(clipped.quad().corners()[2].y, 163.0 * s, epsilon = 0.05);
    }

    #[test]
    fn rotated_hand_uses_bounding_rect() {
        let letterbox = Letterbox::for_image(192, 192, 192).unwrap();
        // fingers pointing right
        let region = RegionEstimator::new()
            .estimate(&candidate([56.0, 96.0], [96.0, 96.0], 50.0), &letterbox)
            .unwrap();

        assert_abs_diff_eq!(region.angle(), FRAC_PI_2, epsilon = 1e-5);
        assert_eq!(region.reduction(), Reduction::BoundingRect);
        assert_rect(region.bounding_box(), [29.0, 21.0, 150.0, 150.0], 1e-3);

        let expected = [[179.0, 21.0], [179.0, 171.0], [29.0, 171.0], [29.0, 21.0]];
        for (corner, [x, y]) in region.quad().corners().iter().zip(expected) {
            assert_abs_diff_eq!(corner.x, x, epsilon = 1e-3);
            assert_abs_diff_eq!(corner.y, y, epsilon = 1e-3);
        }

        // the readout of this quad has zero width, so any tolerance falls back
        let region = RegionEstimator::new()
            .with_axis_tolerance(PI)
            .estimate(&candidate([56.0, 96.0], [96.0, 96.0], 50.0), &letterbox)
            .unwrap();
        assert_eq!(region.reduction(), Reduction::BoundingRect);
    }

    #[test]
    fn slight_rotation_uses_readout() {
        let letterbox = Letterbox::for_image(192, 192, 192).unwrap();
        // tilted by atan(4/40) ~= 5.7 degrees
        let region = RegionEstimator::new()
            .estimate(&candidate([92.0, 136.0], [96.0, 96.0], 50.0), &letterbox)
            .unwrap();

        assert_eq!(region.reduction(), Reduction::CornerReadout);
        assert!(region.angle() > 0.0 && region.angle() < 0.2);
    }

    #[test]
    fn coincident_keypoints() {
        let letterbox = Letterbox::for_image(192, 192, 192).unwrap();
        let err = RegionEstimator::new()
            .estimate(&candidate([96.0, 96.0], [96.0, 96.0], 50.0), &letterbox)
            .unwrap_err();
        assert_eq!(err, GeometryError::ZeroLength);
    }

    #[test]
    fn zero_size_palm_is_singular() {
        let letterbox = Letterbox::for_image(192, 192, 192).unwrap();
        let err = RegionEstimator::new()
            .estimate(&candidate([96.0, 136.0], [96.0, 96.0], 0.0), &letterbox)
            .unwrap_err();
        assert_eq!(err, GeometryError::Singular);
    }

    #[test]
    fn clipping_outside_drops_region() {
        let letterbox = Letterbox::for_image(192, 192, 192).unwrap();
        let region = RegionEstimator::new()
            .estimate(&candidate([96.0, 136.0], [96.0, 96.0], 50.0), &letterbox)
            .unwrap();
        let far_away = Rect::from_top_left(1000.0, 1000.0, 10.0, 10.0);
        assert!(region.clipped(&far_away).is_none());
    }
}
