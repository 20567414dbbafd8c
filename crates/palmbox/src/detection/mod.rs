//! Palm detection candidates and their extraction from raw network output.
//!
//! The functionality here is split into [`decode`], which turns the per-anchor network output
//! into [`Candidate`]s, and [`nms`], which filters out overlapping duplicates.

pub mod decode;
pub mod nms;
mod observe;

use std::ops::Index;

use palmbox_geom::{Point2, Rect};

pub use observe::{DecodeObserver, LogObserver, NoopObserver};

/// Number of keypoints the palm detector outputs per box.
pub const KEYPOINT_COUNT: usize = 7;

/// A keypoint of a [`Candidate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

/// A list of all [`Keypoint`]s, in network output order.
pub const ALL_KEYPOINTS: [Keypoint; KEYPOINT_COUNT] = [
    Keypoint::Wrist,
    Keypoint::IndexFingerMcp,
    Keypoint::MiddleFingerMcp,
    Keypoint::RingFingerMcp,
    Keypoint::PinkyMcp,
    Keypoint::ThumbCmc,
    Keypoint::ThumbMcp,
];

/// The 7 palm keypoints of a [`Candidate`], indexable by [`Keypoint`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoints([Point2<f32>; KEYPOINT_COUNT]);

impl Keypoints {
    pub fn new(points: [Point2<f32>; KEYPOINT_COUNT]) -> Self {
        Self(points)
    }

    pub fn as_slice(&self) -> &[Point2<f32>] {
        &self.0
    }

    /// Returns an iterator yielding each keypoint alongside its position.
    pub fn iter(&self) -> impl Iterator<Item = (Keypoint, Point2<f32>)> + '_ {
        ALL_KEYPOINTS.into_iter().zip(self.0.iter().copied())
    }
}

impl Index<Keypoint> for Keypoints {
    type Output = Point2<f32>;

    fn index(&self, keypoint: Keypoint) -> &Point2<f32> {
        &self.0[keypoint as usize]
    }
}

/// A decoded palm detection that has not yet gone through non-maximum suppression.
///
/// All coordinates are in the pixel space of the network input.
#[derive(Debug, Clone)]
pub struct Candidate {
    rect: Rect,
    keypoints: Keypoints,
    probability: f32,
    anchor_index: usize,
}

impl Candidate {
    pub fn new(rect: Rect, keypoints: Keypoints, probability: f32, anchor_index: usize) -> Self {
        Self {
            rect,
            keypoints,
            probability,
            anchor_index,
        }
    }

    /// Returns the regressed palm box.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn keypoints(&self) -> &Keypoints {
        &self.keypoints
    }

    pub fn keypoint(&self, keypoint: Keypoint) -> Point2<f32> {
        self.keypoints[keypoint]
    }

    /// Returns the sigmoid-activated confidence, between 0.0 and 1.0.
    pub fn probability(&self) -> f32 {
        self.probability
    }

    /// Returns the index of the prediction slot (and anchor) this candidate was decoded from.
    pub fn anchor_index(&self) -> usize {
        self.anchor_index
    }
}
