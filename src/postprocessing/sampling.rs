use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::debug;

use crate::constants::{MAX_PITCH, TEMPERATURE_FLOOR};
use crate::error::{ContinuationError, Result};

use super::helpers::ported::numpy::{clip, softmax};

/// How a pitch was obtained from the model's pitch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchChoice {
    /// Drawn from the tempered categorical distribution. Holds the raw index.
    Sampled(usize),
    /// The channel had a single value, read directly as a pitch estimate.
    Degenerate(u8),
}

impl PitchChoice {
    /// The pitch, limited to the MIDI range.
    pub fn pitch(self) -> u8 {
        match self {
            PitchChoice::Sampled(index) => index.min(MAX_PITCH as usize) as u8,
            PitchChoice::Degenerate(pitch) => pitch.min(MAX_PITCH),
        }
    }

    pub fn is_degenerate(self) -> bool {
        matches!(self, PitchChoice::Degenerate(_))
    }
}

/// Turn pitch logits into a concrete pitch.
///
/// # Arguments
///
/// * `logits` - The pitch channel of one model output.
/// * `temperature` - Sampling temperature, floored at `TEMPERATURE_FLOOR`.
/// * `rng` - Source of randomness for the categorical draw.
///
/// # Returns
///
/// * A single logit is rounded to the nearest pitch with no randomness involved.
///   Longer vectors are tempered, softmaxed and sampled.
pub fn sample_pitch<R: Rng + ?Sized>(
    logits: &[f32],
    temperature: f64,
    rng: &mut R,
) -> Result<PitchChoice> {
    match logits {
        [] => Err(ContinuationError::MalformedModelOutput(
            "pitch distribution is empty".to_string(),
        )),
        [estimate] => {
            let pitch = clip((*estimate as f64).round(), 0.0, MAX_PITCH as f64) as u8;
            debug!(estimate, pitch, "degenerate pitch distribution, rounding");
            Ok(PitchChoice::Degenerate(pitch))
        }
        _ => {
            let probs = softmax(logits, temperature.max(TEMPERATURE_FLOOR)).ok_or_else(|| {
                malformed("pitch distribution has no finite mass".to_string())
            })?;
            let distribution = WeightedIndex::new(&probs)
                .map_err(|e| malformed(format!("pitch distribution: {e}")))?;
            Ok(PitchChoice::Sampled(distribution.sample(rng)))
        }
    }
}

fn malformed(message: String) -> ContinuationError {
    ContinuationError::MalformedModelOutput(message)
}
