use std::{fs, path::Path, sync::Arc};

use tract_onnx::prelude::{
    tvec, Framework, Graph, InferenceModelExt, SimplePlan, TValue, Tensor, TypedFact, TypedModel,
    TypedOp,
};

use crate::InferenceError;

use super::{InferenceEngine, InputLayout, InputTensor, RawOutput, RawRegression};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

fn engine_error(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> InferenceError {
    InferenceError::Engine(e.into())
}

/// An [`InferenceEngine`] that runs an ONNX palm detection network on the CPU, using `tract`.
///
/// The network must have a single square RGB image input (`[1, S, S, 3]` or `[1, 3, S, S]`) and
/// two outputs: the box regressions (`[1, N, 18]`) and the classifier logits (`[1, N, 1]`).
pub struct TractEngine {
    model: Model,
    input_size: u32,
    input_layout: InputLayout,
    regression_output: usize,
    classifier_output: usize,
    predictions: usize,
}

impl TractEngine {
    /// Loads an ONNX model from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InferenceError> {
        let data = fs::read(path.as_ref())?;
        Self::from_onnx(&data)
    }

    /// Loads a model from an in-memory ONNX file.
    pub fn from_onnx(raw: &[u8]) -> Result<Self, InferenceError> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut &*raw)
            .and_then(|model| model.into_optimized())
            .map_err(engine_error)?;

        let (input_size, input_layout) = input_info(&graph)?;
        let (regression_output, classifier_output, predictions) = output_info(&graph)?;

        let model = SimplePlan::new(graph).map_err(engine_error)?;
        log::debug!(
            "loaded palm detection network: {input_size}x{input_size} {input_layout:?} input, \
             {predictions} predictions"
        );

        Ok(Self {
            model,
            input_size,
            input_layout,
            regression_output,
            classifier_output,
            predictions,
        })
    }

    /// Returns the number of prediction slots the network outputs.
    pub fn num_predictions(&self) -> usize {
        self.predictions
    }
}

fn input_info(graph: &TypedModel) -> Result<(u32, InputLayout), InferenceError> {
    if graph.inputs.len() != 1 {
        return Err(engine_error(format!(
            "expected a network with 1 input, got {}",
            graph.inputs.len()
        )));
    }

    let fact = graph.input_fact(0).map_err(engine_error)?;
    let shape = fact
        .shape
        .as_concrete()
        .ok_or_else(|| engine_error("network input has a symbolic shape"))?;

    let mismatch = || InferenceError::InputShape {
        expected: vec![1, 0, 0, 3],
        actual: shape.to_vec(),
    };
    let (layout, h, w) = match *shape {
        [1, h, w, 3] => (InputLayout::Nhwc, h, w),
        [1, 3, h, w] => (InputLayout::Nchw, h, w),
        _ => return Err(mismatch()),
    };
    if h != w || h == 0 {
        return Err(mismatch());
    }
    let size = u32::try_from(h).map_err(|_| mismatch())?;

    Ok((size, layout))
}

/// Returns the indices of the regression and classifier outputs, and the number of predictions.
fn output_info(graph: &TypedModel) -> Result<(usize, usize, usize), InferenceError> {
    let mut regression = None;
    let mut classifier = None;
    for i in 0..graph.outputs.len() {
        let fact = graph.output_fact(i).map_err(engine_error)?;
        match fact.shape.as_concrete() {
            Some(&[1, n, RawRegression::LEN]) => regression = Some((i, n)),
            Some(&[1, n, 1]) => classifier = Some((i, n)),
            shape => log::debug!("ignoring network output {i} with shape {shape:?}"),
        }
    }

    let (regression, n) = regression.ok_or(InferenceError::OutputShape {
        output: "regression",
        expected: RawRegression::LEN,
        actual: 0,
    })?;
    let (classifier, n_classifier) = classifier.ok_or(InferenceError::OutputShape {
        output: "classifier",
        expected: n,
        actual: 0,
    })?;
    if n != n_classifier {
        return Err(InferenceError::OutputShape {
            output: "classifier",
            expected: n,
            actual: n_classifier,
        });
    }

    Ok((regression, classifier, n))
}

impl InferenceEngine for TractEngine {
    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn input_layout(&self) -> InputLayout {
        self.input_layout
    }

    fn infer(&self, input: &InputTensor) -> Result<RawOutput, InferenceError> {
        let expected = self.input_layout.shape(self.input_size);
        if input.shape() != expected {
            return Err(InferenceError::InputShape {
                expected: expected.to_vec(),
                actual: input.shape().to_vec(),
            });
        }

        let tensor = Tensor::from_shape(&expected, input.data()).map_err(engine_error)?;
        let outputs = self
            .model
            .run(tvec![TValue::from_const(Arc::new(tensor))])
            .map_err(engine_error)?;

        let values = |index: usize| -> Result<Vec<f32>, InferenceError> {
            let tensor = outputs
                .get(index)
                .ok_or_else(|| engine_error(format!("missing network output {index}")))?;
            Ok(tensor.as_slice::<f32>().map_err(engine_error)?.to_vec())
        };
        let output = RawOutput::new(
            values(self.regression_output)?,
            values(self.classifier_output)?,
        )?;

        if output.num_predictions() != self.predictions {
            return Err(InferenceError::OutputShape {
                output: "classifier",
                expected: self.predictions,
                actual: output.num_predictions(),
            });
        }

        Ok(output)
    }
}
