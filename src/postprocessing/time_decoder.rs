use crate::constants::{TIME_BUCKET_WIDTH, TIME_CLAMP_MAX, TIME_CLAMP_MIN};

use super::helpers::ported::numpy::{arg_max, clip};

/// A step or duration channel of the model output.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeHead {
    /// Regression head: the value in seconds.
    Scalar(f32),
    /// Classification head over buckets of `bucket_width` seconds.
    Buckets(Vec<f32>),
}

impl TimeHead {
    /// Classify a flattened channel. A single value is a scalar head; `None` if empty.
    pub fn from_values(values: Vec<f32>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => Some(TimeHead::Scalar(values[0])),
            _ => Some(TimeHead::Buckets(values)),
        }
    }
}

/// Decodes time heads into clamped seconds.
///
/// Bucketed heads always decode to the most probable bucket. They are never sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDecoder {
    pub clamp_min: f64,
    pub clamp_max: f64,
    pub bucket_width: f64,
}

impl Default for TimeDecoder {
    fn default() -> Self {
        TimeDecoder {
            clamp_min: TIME_CLAMP_MIN,
            clamp_max: TIME_CLAMP_MAX,
            bucket_width: TIME_BUCKET_WIDTH,
        }
    }
}

impl TimeDecoder {
    pub fn decode(&self, head: &TimeHead) -> f64 {
        let value = match head {
            TimeHead::Scalar(value) => *value as f64,
            TimeHead::Buckets(buckets) => match arg_max(buckets) {
                Some(index) => index as f64 * self.bucket_width,
                None => self.clamp_min,
            },
        };
        clip(value, self.clamp_min, self.clamp_max)
    }
}
