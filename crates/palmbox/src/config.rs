//! Detector configuration.

use std::f32::consts::PI;

use palmbox_geom::Affine2;

use crate::{
    detection::{decode::Decoder, nms::NonMaxSuppression},
    region::{CanonicalFrame, RegionEstimator},
    ConfigError,
};

/// Parameters of a [`PalmDetector`][crate::PalmDetector].
///
/// The defaults match the 192x192 palm detection network.
///
/// ```
/// use palmbox::DetectorConfig;
///
/// let config = DetectorConfig::default()
///     .with_threshold(0.7)
///     .with_max_detections(2);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    threshold: f32,
    iou_threshold: f32,
    box_enlarge: f32,
    box_shift: f32,
    max_detections: usize,
    axis_tolerance: f32,
    clip_to_image: bool,
    frame: CanonicalFrame,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: Decoder::DEFAULT_THRESHOLD,
            iou_threshold: NonMaxSuppression::DEFAULT_IOU_THRESH,
            box_enlarge: RegionEstimator::DEFAULT_BOX_ENLARGE,
            box_shift: RegionEstimator::DEFAULT_BOX_SHIFT,
            max_detections: 1,
            axis_tolerance: RegionEstimator::DEFAULT_AXIS_TOLERANCE,
            clip_to_image: true,
            frame: CanonicalFrame::PALM_256,
        }
    }
}

impl DetectorConfig {
    /// Sets the confidence a prediction needs to exceed to be considered a palm.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the overlap above which a less confident detection is suppressed.
    pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }

    pub fn with_box_enlarge(mut self, box_enlarge: f32) -> Self {
        self.box_enlarge = box_enlarge;
        self
    }

    pub fn with_box_shift(mut self, box_shift: f32) -> Self {
        self.box_shift = box_shift;
        self
    }

    /// Sets how many of the best non-overlapping detections are reported.
    pub fn with_max_detections(mut self, max_detections: usize) -> Self {
        self.max_detections = max_detections;
        self
    }

    /// Sets the largest region rotation, in radians, that is reduced by reading off the corners.
    /// More rotated regions report their bounding rectangle.
    pub fn with_axis_tolerance(mut self, axis_tolerance: f32) -> Self {
        self.axis_tolerance = axis_tolerance;
        self
    }

    /// Sets whether reported boxes are clipped to the image.
    pub fn with_clip_to_image(mut self, clip_to_image: bool) -> Self {
        self.clip_to_image = clip_to_image;
        self
    }

    pub fn with_frame(mut self, frame: CanonicalFrame) -> Self {
        self.frame = frame;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn box_enlarge(&self) -> f32 {
        self.box_enlarge
    }

    pub fn box_shift(&self) -> f32 {
        self.box_shift
    }

    pub fn max_detections(&self) -> usize {
        self.max_detections
    }

    pub fn axis_tolerance(&self) -> f32 {
        self.axis_tolerance
    }

    pub fn clip_to_image(&self) -> bool {
        self.clip_to_image
    }

    pub fn frame(&self) -> &CanonicalFrame {
        &self.frame
    }

    /// Checks that all parameters are in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(ConfigError::invalid(
                "threshold",
                format!("{} is not between 0 and 1", self.threshold),
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(ConfigError::invalid(
                "iou_threshold",
                format!("{} is not between 0 and 1", self.iou_threshold),
            ));
        }
        if !(self.box_enlarge > 0.0 && self.box_enlarge.is_finite()) {
            return Err(ConfigError::invalid(
                "box_enlarge",
                format!("{} is not a positive number", self.box_enlarge),
            ));
        }
        if !self.box_shift.is_finite() {
            return Err(ConfigError::invalid(
                "box_shift",
                format!("{} is not finite", self.box_shift),
            ));
        }
        if self.max_detections == 0 {
            return Err(ConfigError::invalid(
                "max_detections",
                "at least 1 detection must be allowed",
            ));
        }
        if !(0.0..=PI).contains(&self.axis_tolerance) {
            return Err(ConfigError::invalid(
                "axis_tolerance",
                format!("{} is not between 0 and π", self.axis_tolerance),
            ));
        }
        if !(self.frame.size() > 0.0 && self.frame.size().is_finite()) {
            return Err(ConfigError::invalid(
                "frame",
                format!("box size {} is not a positive number", self.frame.size()),
            ));
        }
        let triangle = self.frame.triangle();
        if let Err(e) = Affine2::from_triangles(triangle, triangle) {
            return Err(ConfigError::invalid(
                "frame",
                format!("triangle {triangle:?} does not span a plane: {e}"),
            ));
        }
        Ok(())
    }

    pub(crate) fn decoder(&self, input_size: u32) -> Decoder {
        Decoder::new(input_size, self.threshold)
    }

    pub(crate) fn nms(&self) -> NonMaxSuppression {
        NonMaxSuppression::new().with_iou_thresh(self.iou_threshold)
    }

    pub(crate) fn region_estimator(&self) -> RegionEstimator {
        RegionEstimator::new()
            .with_box_enlarge(self.box_enlarge)
            .with_box_shift(self.box_shift)
            .with_frame(self.frame)
            .with_axis_tolerance(self.axis_tolerance)
    }
}
