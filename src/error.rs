use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContinuationError>;

/// Everything that can abort a continuation request.
///
/// The empty-seed and single-logit fallbacks are not represented here: they
/// are regular outcomes, reported through `SeedOrigin` and `PitchChoice`.
#[derive(Debug, Error)]
pub enum ContinuationError {
    /// The model answered with something other than pitch/step/duration.
    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    /// The loop hit one of its guards before reaching the target duration.
    #[error("generation starved after {iterations} iterations ({generated} notes generated)")]
    LoopStarvation { iterations: usize, generated: usize },

    #[error("invalid seed file: {0}")]
    InvalidSeedFile(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("model not found at {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("inference error: {0}")]
    Inference(#[from] ort::Error),

    #[error("tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("MIDI error: {0}")]
    Midi(#[from] midly::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
