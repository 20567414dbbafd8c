//! Neural network inference boundary.
//!
//! The detector does not care how the palm detection network is executed, as long as the engine
//! implements [`InferenceEngine`]: it takes a square, normalized RGB image tensor and returns the
//! box regression and classifier outputs as a [`RawOutput`].
//!
//! [`TractEngine`] runs ONNX models on the CPU via `tract`.

mod tract;

use std::ops::RangeInclusive;

use palmbox_geom::Vector2;

use crate::detection::KEYPOINT_COUNT;
use crate::InferenceError;

pub use self::tract::TractEngine;

/// Describes in what order a network expects its input image data.
///
/// - `N` is the number of images, fixed at 1.
/// - `C` is the number of color channels, 3 for RGB inputs.
/// - `H` and `W` are the height and width of the input, respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputLayout {
    /// Shape is `[N, H, W, C]`.
    Nhwc,
    /// Shape is `[N, C, H, W]`.
    Nchw,
}

impl InputLayout {
    pub fn shape(&self, size: u32) -> [usize; 4] {
        let size = size as usize;
        match self {
            InputLayout::Nhwc => [1, size, size, 3],
            InputLayout::Nchw => [1, 3, size, size],
        }
    }
}

/// Executes a palm detection network.
///
/// Implementations have to be usable from several threads at once, since one
/// [`PalmDetector`][crate::PalmDetector] may be shared between them.
pub trait InferenceEngine: Send + Sync {
    /// Returns the width and height of the (square) network input.
    fn input_size(&self) -> u32;

    /// Returns the memory layout of the input tensor.
    fn input_layout(&self) -> InputLayout;

    /// Returns the range that 8-bit color channels are linearly mapped onto.
    fn color_range(&self) -> RangeInclusive<f32> {
        -1.0..=1.0
    }

    /// Runs the network on `input`, blocking until the outputs are available.
    fn infer(&self, input: &InputTensor) -> Result<RawOutput, InferenceError>;
}

/// An image tensor fed to an [`InferenceEngine`].
#[derive(Debug, Clone)]
pub struct InputTensor {
    size: u32,
    layout: InputLayout,
    data: Vec<f32>,
}

impl InputTensor {
    /// Wraps tensor data of the given size and layout.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not contain exactly `3 * size * size` values.
    pub fn new(size: u32, layout: InputLayout, data: Vec<f32>) -> Self {
        let expected: usize = layout.shape(size).iter().product();
        assert_eq!(
            data.len(),
            expected,
            "input tensor of size {size} needs {expected} values"
        );
        Self { size, layout, data }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn layout(&self) -> InputLayout {
        self.layout
    }

    pub fn shape(&self) -> [usize; 4] {
        self.layout.shape(self.size)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// The regression of a single prediction slot.
///
/// On the wire this is `[dx, dy, dw, dh, kp0x, kp0y, ..., kp6x, kp6y]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRegression {
    /// Offset of the box center from the anchor, in input pixels.
    pub center_offset: Vector2<f32>,
    /// Box width and height, in input pixels.
    pub size: Vector2<f32>,
    /// Offset of each keypoint from the anchor, in input pixels.
    pub keypoint_offsets: [Vector2<f32>; KEYPOINT_COUNT],
}

impl RawRegression {
    /// Number of values per prediction in the regression output.
    pub const LEN: usize = 4 + 2 * KEYPOINT_COUNT;

    /// Reads a regression from the raw network output of one prediction.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have exactly [`RawRegression::LEN`] elements.
    pub fn from_slice(values: &[f32]) -> Self {
        assert_eq!(values.len(), Self::LEN);

        let keypoint_offsets = std::array::from_fn(|k| {
            let base = 4 + 2 * k;
            Vector2::new(values[base], values[base + 1])
        });
        Self {
            center_offset: Vector2::new(values[0], values[1]),
            size: Vector2::new(values[2], values[3]),
            keypoint_offsets,
        }
    }
}

/// The result of a palm detection inference pass.
///
/// Holds the box regression output (`[1, N, 18]`) and the classifier output (`[1, N, 1]`) of a
/// network with `N` prediction slots.
#[derive(Debug, Clone)]
pub struct RawOutput {
    regression: Vec<f32>,
    logits: Vec<f32>,
}

impl RawOutput {
    /// Creates a [`RawOutput`] from flattened output tensors.
    ///
    /// The number of predictions is taken from `logits`; `regression` has to contain
    /// [`RawRegression::LEN`] values for each of them.
    pub fn new(regression: Vec<f32>, logits: Vec<f32>) -> Result<Self, InferenceError> {
        let expected = logits.len() * RawRegression::LEN;
        if regression.len() != expected {
            return Err(InferenceError::OutputShape {
                output: "regression",
                expected,
                actual: regression.len(),
            });
        }

        Ok(Self { regression, logits })
    }

    /// Returns the number of prediction slots.
    pub fn num_predictions(&self) -> usize {
        self.logits.len()
    }

    /// Returns the raw confidence logits (before the sigmoid).
    pub fn logits(&self) -> &[f32] {
        &self.logits
    }

    /// Returns the flattened regression output.
    pub fn regression_values(&self) -> &[f32] {
        &self.regression
    }

    /// Returns the regression of prediction `index`.
    pub fn regression(&self, index: usize) -> RawRegression {
        let start = index * RawRegression::LEN;
        RawRegression::from_slice(&self.regression[start..start + RawRegression::LEN])
    }
}
