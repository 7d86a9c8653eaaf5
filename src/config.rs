use std::time::{Duration, Instant};

use crate::constants::{
    DEFAULT_SECONDS, DEFAULT_TEMPERATURE, MAX_ITERATIONS, MAX_SECONDS, MAX_TEMPERATURE, MIN_SECONDS,
    MIN_TEMPERATURE, STALL_LIMIT,
};

/// Per-request generation parameters, already limited to their allowed ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Seconds of material to generate.
    pub target_duration: f64,
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams::from_request(None, None)
    }
}

impl GenerationParams {
    /// Build parameters from untrusted request values.
    ///
    /// # Arguments
    ///
    /// * `seconds` - Requested length, defaults to 30 and is clamped to [5, 120].
    /// * `temperature` - Defaults to 1.0 when absent or not finite, clamped to [0.2, 2.0].
    pub fn from_request(seconds: Option<i64>, temperature: Option<f64>) -> Self {
        let seconds = seconds.unwrap_or(DEFAULT_SECONDS).clamp(MIN_SECONDS, MAX_SECONDS);
        let temperature = temperature
            .filter(|t| t.is_finite())
            .unwrap_or(DEFAULT_TEMPERATURE)
            .clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);

        GenerationParams {
            target_duration: seconds as f64,
            temperature,
        }
    }
}

/// Guards that keep a misbehaving model from running the loop forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopLimits {
    /// Hard cap on oracle calls per request, whatever progress is being made.
    pub max_iterations: usize,
    /// Consecutive iterations without any progress before giving up.
    pub stall_limit: usize,
    /// Past this instant the loop returns what it has generated so far.
    pub deadline: Option<Instant>,
}

impl Default for LoopLimits {
    fn default() -> Self {
        LoopLimits {
            max_iterations: MAX_ITERATIONS,
            stall_limit: STALL_LIMIT,
            deadline: None,
        }
    }
}

impl LoopLimits {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}
