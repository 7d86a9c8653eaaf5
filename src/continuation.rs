use std::time::Instant;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{GenerationParams, LoopLimits};
use crate::constants::{GENERATED_VELOCITY, MIN_NOTE_DURATION};
use crate::error::{ContinuationError, Result};
use crate::inference::Oracle;
use crate::postprocessing::sampling::sample_pitch;
use crate::postprocessing::time_decoder::TimeDecoder;
use crate::preprocessing::event_codec::{event_to_note, EventTriple, NoteEvent};
use crate::preprocessing::seed_window::{SeedOrigin, SeedWindow};

/// Why the loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    /// The deadline passed; the notes are whatever was generated until then.
    DeadlineExpired,
}

/// Mutable state of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationState {
    pub current_time: f64,
    /// Sum of decoded steps and durations. Never decreases.
    pub accumulated_duration: f64,
    pub generated_notes: Vec<NoteEvent>,
    /// Iterations whose pitch came from a single-value pitch channel.
    pub degenerate_pitches: usize,
}

impl GenerationState {
    pub fn new(start_time: f64) -> Self {
        GenerationState {
            current_time: start_time,
            accumulated_duration: 0.0,
            generated_notes: vec![],
            degenerate_pitches: 0,
        }
    }

    /// Place a decoded event after the current time and advance.
    ///
    /// The accumulated duration grows by the decoded `step + duration`, not by
    /// the span the placed note actually covers.
    pub fn advance(&mut self, event: &EventTriple) -> NoteEvent {
        let note = event_to_note(event, self.current_time, MIN_NOTE_DURATION, GENERATED_VELOCITY);
        self.generated_notes.push(note);
        self.current_time = note.end_time;
        self.accumulated_duration += event.step + event.duration;
        note
    }
}

/// Result of a completed continuation.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    pub notes: Vec<NoteEvent>,
    pub iterations: usize,
    pub accumulated_duration: f64,
    /// How many pitches were rounded from a single value instead of sampled.
    pub degenerate_pitches: usize,
    pub stop_reason: StopReason,
    pub seed_origin: SeedOrigin,
}

/// Generate notes after a seed until the target duration is covered.
///
/// # Arguments
///
/// * `oracle` - The sequence model.
/// * `seed` - Seed events in time order, possibly empty.
/// * `start_time` - Where the first generated note is anchored, usually the end of the seed.
/// * `params` - Target duration and pitch sampling temperature.
/// * `limits` - Iteration cap, stall limit and optional deadline.
/// * `rng` - Randomness for pitch sampling.
///
/// # Returns
///
/// * The generated notes on the absolute timeline, or `LoopStarvation` if a guard trips
///   before the target is reached. Malformed model output aborts immediately.
pub fn generate_continuation<O, R>(
    oracle: &O,
    seed: &[EventTriple],
    start_time: f64,
    params: &GenerationParams,
    limits: &LoopLimits,
    rng: &mut R,
) -> Result<Continuation>
where
    O: Oracle + ?Sized,
    R: Rng + ?Sized,
{
    let (mut window, seed_origin) = SeedWindow::from_seed(seed);
    let decoder = TimeDecoder::default();
    let mut state = GenerationState::new(start_time);
    let mut iterations = 0;
    let mut stalled = 0;

    while state.accumulated_duration < params.target_duration {
        if limits.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            warn!(
                iterations,
                generated = state.generated_notes.len(),
                "deadline expired, returning partial continuation"
            );
            return Ok(finish(state, iterations, StopReason::DeadlineExpired, seed_origin));
        }
        if iterations >= limits.max_iterations || stalled >= limits.stall_limit {
            warn!(
                iterations,
                stalled,
                accumulated = state.accumulated_duration,
                "generation starved"
            );
            return Err(ContinuationError::LoopStarvation {
                iterations,
                generated: state.generated_notes.len(),
            });
        }

        let output = oracle.predict(window.to_input_tensor().view())?.normalize()?;
        iterations += 1;

        let choice = sample_pitch(&output.pitch, params.temperature, rng)?;
        if choice.is_degenerate() {
            state.degenerate_pitches += 1;
        }
        let pitch = choice.pitch();
        let step = decoder.decode(&output.step);
        let duration = decoder.decode(&output.duration);
        let event = EventTriple::new(pitch, step, duration);

        let note = state.advance(&event);
        debug!(pitch, step, duration, start = note.start_time, "generated note");

        if step + duration > 0.0 {
            stalled = 0;
        } else {
            stalled += 1;
        }

        window.push(event);
    }

    Ok(finish(state, iterations, StopReason::TargetReached, seed_origin))
}

fn finish(
    state: GenerationState,
    iterations: usize,
    stop_reason: StopReason,
    seed_origin: SeedOrigin,
) -> Continuation {
    info!(
        iterations,
        notes = state.generated_notes.len(),
        degenerate_pitches = state.degenerate_pitches,
        accumulated = state.accumulated_duration,
        ?stop_reason,
        "continuation finished"
    );
    Continuation {
        notes: state.generated_notes,
        iterations,
        accumulated_duration: state.accumulated_duration,
        degenerate_pitches: state.degenerate_pitches,
        stop_reason,
        seed_origin,
    }
}

#[cfg(test)]
mod tests {
    use ndarray::ArrayView3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::inference::RawModelOutput;

    struct Fixed(Vec<Vec<f32>>);

    impl Oracle for Fixed {
        fn predict(&self, _window: ArrayView3<f32>) -> Result<RawModelOutput> {
            Ok(RawModelOutput::Positional(self.0.clone()))
        }
    }

    #[test]
    fn test_state_advance_applies_floor_and_accumulates_raw_values() {
        let mut state = GenerationState::new(2.0);
        let note = state.advance(&EventTriple::new(60, 0.0, 0.0));

        assert_eq!(note.start_time, 2.0);
        assert!((note.duration() - MIN_NOTE_DURATION).abs() < 1e-12);
        assert_eq!(state.accumulated_duration, 0.0);
        assert_eq!(state.current_time, note.end_time);
    }

    #[test]
    fn test_zero_progress_model_starves() {
        let oracle = Fixed(vec![vec![60.0], vec![0.0], vec![0.0]]);
        let params = GenerationParams::from_request(Some(5), None);
        let limits = LoopLimits {
            max_iterations: 1_000,
            stall_limit: 25,
            deadline: None,
        };
        let mut rng = StdRng::seed_from_u64(0);

        let result = generate_continuation(&oracle, &[], 0.0, &params, &limits, &mut rng);
        match result {
            Err(ContinuationError::LoopStarvation { iterations, generated }) => {
                assert_eq!(iterations, 25);
                assert_eq!(generated, 25);
            }
            other => panic!("expected starvation, got {other:?}"),
        }
    }

    #[test]
    fn test_iteration_cap() {
        let oracle = Fixed(vec![vec![60.0], vec![0.05], vec![0.0]]);
        let params = GenerationParams::from_request(Some(120), None);
        let limits = LoopLimits::default().with_max_iterations(10);
        let mut rng = StdRng::seed_from_u64(0);

        let result = generate_continuation(&oracle, &[], 0.0, &params, &limits, &mut rng);
        assert!(matches!(result, Err(ContinuationError::LoopStarvation { iterations: 10, .. })));
    }

    #[test]
    fn test_expired_deadline_returns_partial() {
        let oracle = Fixed(vec![vec![60.0], vec![0.5], vec![0.5]]);
        let params = GenerationParams::default();
        let limits = LoopLimits {
            deadline: Some(Instant::now()),
            ..LoopLimits::default()
        };
        let mut rng = StdRng::seed_from_u64(0);

        let continuation =
            generate_continuation(&oracle, &[], 0.0, &params, &limits, &mut rng).unwrap();
        assert_eq!(continuation.stop_reason, StopReason::DeadlineExpired);
        assert!(continuation.notes.is_empty());
    }

    #[test]
    fn test_degenerate_pitches_are_counted() {
        let mut rng = StdRng::seed_from_u64(0);
        let params = GenerationParams::from_request(Some(5), None);
        let limits = LoopLimits::default();

        let single = Fixed(vec![vec![63.7], vec![1.0], vec![0.0]]);
        let continuation =
            generate_continuation(&single, &[], 0.0, &params, &limits, &mut rng).unwrap();
        assert_eq!(continuation.iterations, 5);
        assert_eq!(continuation.degenerate_pitches, 5);
        assert!(continuation.notes.iter().all(|n| n.pitch == 64));

        let mut logits = vec![-1000.0; 128];
        logits[64] = 0.0;
        let sampled = Fixed(vec![logits, vec![1.0], vec![0.0]]);
        let continuation =
            generate_continuation(&sampled, &[], 0.0, &params, &limits, &mut rng).unwrap();
        assert_eq!(continuation.degenerate_pitches, 0);
        assert!(continuation.notes.iter().all(|n| n.pitch == 64));
    }

    #[test]
    fn test_malformed_output_aborts() {
        let oracle = Fixed(vec![vec![60.0]]);
        let params = GenerationParams::default();
        let mut rng = StdRng::seed_from_u64(0);

        let limits = LoopLimits::default();

        let result = generate_continuation(&oracle, &[], 0.0, &params, &limits, &mut rng);
        assert!(matches!(result, Err(ContinuationError::MalformedModelOutput(_))));
    }
}
