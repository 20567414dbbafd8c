//! Non-Maximum Suppression.
//!
//! Typical Single-Shot MultiBox Detectors (SSD) produce duplicate detections for individual
//! objects. Non-Maximum Suppression (NMS) is an algorithm that filters these duplicates out,
//! leaving only a single detection with high confidence for each object.

use std::cmp::Reverse;

use crate::num::TotalF32;

use super::Candidate;

/// A greedy non-maximum suppression algorithm.
#[derive(Debug, Clone)]
pub struct NonMaxSuppression {
    iou_thresh: f32,
}

impl NonMaxSuppression {
    /// The default intersection-over-union threshold used to determine if two detections overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    /// Creates a new non-maximum suppressor using [`Self::DEFAULT_IOU_THRESH`].
    pub fn new() -> Self {
        Self {
            iou_thresh: Self::DEFAULT_IOU_THRESH,
        }
    }

    /// Sets the intersection-over-union threshold to consider two detections as overlapping.
    ///
    /// Detections overlapping a better detection by *more* than this are removed.
    pub fn set_iou_thresh(&mut self, iou_thresh: f32) {
        self.iou_thresh = iou_thresh;
    }

    pub fn with_iou_thresh(mut self, iou_thresh: f32) -> Self {
        self.set_iou_thresh(iou_thresh);
        self
    }

    pub fn iou_thresh(&self) -> f32 {
        self.iou_thresh
    }

    /// Performs non-maximum suppression on `candidates`.
    ///
    /// Returns the indices of the surviving candidates, ordered by descending probability.
    /// Candidates with equal probability keep their relative input order.
    pub fn process(&self, candidates: &[Candidate]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by_key(|&i| Reverse(TotalF32(candidates[i].probability())));

        let mut active = vec![true; candidates.len()];
        let mut survivors = Vec::new();
        for (pos, &seed) in order.iter().enumerate() {
            if !active[pos] {
                continue;
            }
            survivors.push(seed);

            let seed_rect = candidates[seed].rect();
            for (other_pos, &other) in order.iter().enumerate().skip(pos + 1) {
                if active[other_pos] && seed_rect.iou(&candidates[other].rect()) > self.iou_thresh
                {
                    active[other_pos] = false;
                }
            }
        }

        log::trace!(
            "nms kept {} of {} candidates",
            survivors.len(),
            candidates.len()
        );
        survivors
    }
}

impl Default for NonMaxSuppression {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use palmbox_geom::{Point2, Rect};

    use crate::detection::Keypoints;

    use super::*;

    fn candidate(probability: f32, rect: Rect) -> Candidate {
        Candidate::new(rect, Keypoints::new([Point2::origin(); 7]), probability, 0)
    }

    #[test]
    fn nms_suppresses_non_maximum() {
        let nms = NonMaxSuppression::new();

        // IoU 0.5
        let a = candidate(0.9, Rect::from_top_left(0.0, 0.0, 2.0, 2.0));
        let b = candidate(0.8, Rect::from_top_left(0.0, 0.0, 2.0, 1.0));
        assert_eq!(nms.process(&[b.clone(), a.clone()]), [1]);
        assert_eq!(nms.process(&[a, b]), [0]);
    }

    #[test]
    fn nms_keeps_low_overlap() {
        let nms = NonMaxSuppression::new();

        // IoU 0.1
        let a = candidate(0.9, Rect::from_top_left(0.0, 0.0, 1.0, 1.0));
        let b = candidate(0.8, Rect::from_top_left(0.0, 0.0, 10.0, 1.0));
        assert_eq!(nms.process(&[b, a]), [1, 0]);
    }

    #[test]
    fn nms_ignores_nonoverlapping() {
        let nms = NonMaxSuppression::new();

        let a = candidate(1.0, Rect::from_center(0.0, 0.0, 1.0, 1.0));
        let b = candidate(1.0, Rect::from_center(5.0, 0.0, 1.0, 1.0));
        assert_eq!(nms.process(&[a, b]), [0, 1]);
        assert!(nms.process(&[]).is_empty());
    }

    #[test]
    fn ties_keep_input_order() {
        let nms = NonMaxSuppression::new();

        let rect = Rect::from_center(0.0, 0.0, 1.0, 1.0);
        let candidates = [candidate(0.7, rect), candidate(0.7, rect), candidate(0.7, rect)];
        assert_eq!(nms.process(&candidates), [0]);
    }

    #[test]
    fn threshold_is_exclusive() {
        // IoU is exactly 0.5
        let a = candidate(0.9, Rect::from_top_left(0.0, 0.0, 2.0, 2.0));
        let b = candidate(0.8, Rect::from_top_left(0.0, 0.0, 2.0, 1.0));

        let nms = NonMaxSuppression::new().with_iou_thresh(0.5);
        assert_eq!(nms.process(&[a.clone(), b.clone()]), [0, 1]);

        let nms = NonMaxSuppression::new().with_iou_thresh(0.49);
        assert_eq!(nms.process(&[a, b]), [0]);
    }

    #[test]
    fn suppressed_candidates_do_not_suppress() {
        let nms = NonMaxSuppression::new();

        // b overlaps both a and c, but a and c are disjoint
        let a = candidate(0.9, Rect::from_top_left(0.0, 0.0, 2.0, 2.0));
        let b = candidate(0.8, Rect::from_top_left(1.0, 0.0, 2.0, 2.0));
        let c = candidate(0.7, Rect::from_top_left(2.0, 0.0, 2.0, 2.0));
        assert_eq!(nms.process(&[c, b, a]), [2, 0]);
    }
}
