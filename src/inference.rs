use std::collections::HashMap;
use std::path::Path;

use ndarray::{ArrayView3, Axis};
use ort::{GraphOptimizationLevel, Session, Tensor};
use tracing::info;

use crate::error::{ContinuationError, Result};
use crate::postprocessing::time_decoder::TimeHead;

const PITCH_OUTPUT: &str = "pitch";
const STEP_OUTPUT: &str = "step";
const DURATION_OUTPUT: &str = "duration";

/// A sequence model that predicts the next event from a window.
///
/// Implementations are shared between concurrent requests and must not keep
/// per-call state.
pub trait Oracle: Send + Sync {
    /// Run the model on one batch of shape `(1, WINDOW_LENGTH, 3)`.
    fn predict(&self, window: ArrayView3<f32>) -> Result<RawModelOutput>;
}

/// Model output as the model reported it, with batch element 0 of every
/// channel flattened to a vector.
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelOutput {
    Named(HashMap<String, Vec<f32>>),
    Positional(Vec<Vec<f32>>),
}

/// Validated model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub pitch: Vec<f32>,
    pub step: TimeHead,
    pub duration: TimeHead,
}

impl RawModelOutput {
    /// Check the shape once and normalise both layouts into a `ModelOutput`.
    pub fn normalize(self) -> Result<ModelOutput> {
        let (pitch, step, duration) = match self {
            RawModelOutput::Named(mut channels) => {
                let mut take = |name: &str| {
                    channels.remove(name).ok_or_else(|| {
                        ContinuationError::MalformedModelOutput(format!("missing `{name}` channel"))
                    })
                };
                (take(PITCH_OUTPUT)?, take(STEP_OUTPUT)?, take(DURATION_OUTPUT)?)
            }
            RawModelOutput::Positional(channels) => {
                let received = channels.len();
                let [pitch, step, duration]: [Vec<f32>; 3] = channels
                    .into_iter()
                    .take(3)
                    .collect::<Vec<_>>()
                    .try_into()
                    .map_err(|_| {
                        ContinuationError::MalformedModelOutput(format!(
                            "expected pitch, step and duration outputs, got {received} output(s)"
                        ))
                    })?;
                (pitch, step, duration)
            }
        };

        let empty =
            |name: &str| ContinuationError::MalformedModelOutput(format!("empty `{name}` channel"));
        if pitch.is_empty() {
            return Err(empty(PITCH_OUTPUT));
        }
        let step = TimeHead::from_values(step).ok_or_else(|| empty(STEP_OUTPUT))?;
        let duration = TimeHead::from_values(duration).ok_or_else(|| empty(DURATION_OUTPUT))?;

        Ok(ModelOutput { pitch, step, duration })
    }
}

/// An oracle backed by an ONNX export of the continuation model.
pub struct OnnxOracle {
    session: Session,
}

impl OnnxOracle {
    pub fn load<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(ContinuationError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)?;

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        info!(path = %model_path.display(), outputs = ?output_names, "loaded continuation model");

        Ok(OnnxOracle { session })
    }

    fn has_named_outputs(&self) -> bool {
        [PITCH_OUTPUT, STEP_OUTPUT, DURATION_OUTPUT]
            .iter()
            .all(|name| self.session.outputs.iter().any(|o| o.name == *name))
    }
}

impl Oracle for OnnxOracle {
    fn predict(&self, window: ArrayView3<f32>) -> Result<RawModelOutput> {
        let input_shape: Vec<i64> = window.shape().iter().map(|&dim| dim as i64).collect();
        let input_data: Vec<f32> = window.iter().copied().collect();
        let input_tensor = Tensor::from_array((input_shape, input_data))?;
        let outputs = self.session.run(ort::inputs![input_tensor]?)?;

        let mut channels: HashMap<String, Vec<f32>> = HashMap::new();
        for (&k, v) in outputs.iter() {
            let tensor = v.try_extract_tensor::<f32>()?;
            // First batch element, flattened.
            let values: Vec<f32> = if tensor.ndim() == 0 {
                tensor.iter().copied().collect()
            } else {
                tensor.index_axis(Axis(0), 0).iter().copied().collect()
            };
            channels.insert(k.to_string(), values);
        }

        if self.has_named_outputs() {
            return Ok(RawModelOutput::Named(channels));
        }

        let positional = self
            .session
            .outputs
            .iter()
            .filter_map(|o| channels.remove(&o.name))
            .collect();
        Ok(RawModelOutput::Positional(positional))
    }
}
