use crate::constants::{DEFAULT_SEED_DURATION, DEFAULT_SEED_PITCH, DEFAULT_SEED_STEP, MAX_PITCH};

/// A note on an absolute timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub pitch: u8,
    pub start_time: f64,
    pub end_time: f64,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(pitch: u8, start_time: f64, end_time: f64, velocity: u8) -> Self {
        NoteEvent {
            pitch: pitch.min(MAX_PITCH),
            start_time,
            end_time,
            velocity,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// The model's native unit: a pitch plus its onset distance to the previous
/// note and its own length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventTriple {
    pub pitch: u8,
    pub step: f64,
    pub duration: f64,
}

impl EventTriple {
    pub const DEFAULT: EventTriple = EventTriple {
        pitch: DEFAULT_SEED_PITCH,
        step: DEFAULT_SEED_STEP,
        duration: DEFAULT_SEED_DURATION,
    };

    pub fn new(pitch: u8, step: f64, duration: f64) -> Self {
        EventTriple {
            pitch: pitch.min(MAX_PITCH),
            step,
            duration,
        }
    }

    /// Feature row as fed to the model: `[pitch, step, duration]`.
    pub fn features(&self) -> [f32; 3] {
        [self.pitch as f32, self.step as f32, self.duration as f32]
    }
}

/// Convert time-ordered notes to event triples.
///
/// # Arguments
///
/// * `notes` - Notes sorted by start time.
///
/// # Returns
///
/// * One triple per note. The first step is measured against the first note itself,
///   so it is always 0. Steps and durations are floored at 0.
pub fn notes_to_events(notes: &[NoteEvent]) -> Vec<EventTriple> {
    let mut previous_start = notes.first().map_or(0.0, |note| note.start_time);

    notes
        .iter()
        .map(|note| {
            let step = (note.start_time - previous_start).max(0.0);
            let duration = (note.end_time - note.start_time).max(0.0);
            previous_start = note.start_time;
            EventTriple::new(note.pitch, step, duration)
        })
        .collect()
}

/// Place a triple on the absolute timeline after `anchor`.
///
/// Negative steps are treated as 0 and the note length is raised to at least
/// `min_duration`.
pub fn event_to_note(
    event: &EventTriple,
    anchor: f64,
    min_duration: f64,
    velocity: u8,
) -> NoteEvent {
    let start_time = anchor + event.step.max(0.0);
    let end_time = start_time + event.duration.max(min_duration);
    NoteEvent::new(event.pitch, start_time, end_time, velocity)
}
