//! Seed extraction, continuation and export through real MIDI files.

use std::collections::HashMap;

use ndarray::ArrayView3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use melody_continuation::config::{GenerationParams, LoopLimits};
use melody_continuation::constants::GENERATED_VELOCITY;
use melody_continuation::continue_midi;
use melody_continuation::error::{ContinuationError, Result};
use melody_continuation::inference::{Oracle, RawModelOutput};
use melody_continuation::postprocessing::midi::write_midi_file_data;
use melody_continuation::preprocessing::event_codec::NoteEvent;
use melody_continuation::preprocessing::load_midi::{load_seed_instrument, Instrument};
use melody_continuation::preprocessing::seed_window::SeedOrigin;

struct Arpeggio;

impl Oracle for Arpeggio {
    fn predict(&self, window: ArrayView3<f32>) -> Result<RawModelOutput> {
        // Answer a fifth above the newest pitch in the window.
        let newest = window[[0, window.shape()[1] - 1, 0]] as usize;
        let pitch: Vec<f32> = (0..128)
            .map(|i| if i == (newest + 7) % 128 { 0.0 } else { -1000.0 })
            .collect();
        Ok(RawModelOutput::Named(HashMap::from([
            ("pitch".to_string(), pitch),
            ("step".to_string(), vec![0.0]),
            ("duration".to_string(), vec![0.5]),
        ])))
    }
}

fn seed_file() -> Vec<u8> {
    let instrument = Instrument {
        channel: 0,
        program: 24,
        notes: vec![],
    };
    let notes = [
        NoteEvent::new(48, 0.0, 0.5, 100),
        NoteEvent::new(52, 0.5, 1.0, 100),
        NoteEvent::new(55, 1.0, 2.0, 100),
    ];
    write_midi_file_data(&instrument, &notes).unwrap()
}

#[test]
fn test_continue_midi_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("seed.mid");
    let output_path = dir.path().join("output.mid");
    std::fs::write(&input_path, seed_file()).unwrap();

    let input = std::fs::read(&input_path).unwrap();
    let params = GenerationParams::from_request(Some(5), None);
    let mut rng = StdRng::seed_from_u64(1);
    let limits = LoopLimits::default();
    let (output, continuation) =
        continue_midi(&Arpeggio, &input, &params, &limits, &mut rng).unwrap();
    std::fs::write(&output_path, output).unwrap();

    assert_eq!(continuation.seed_origin, SeedOrigin::Seeded);
    assert_eq!(continuation.notes.len(), 10);
    assert!((continuation.notes[0].start_time - 2.0).abs() < 1e-3);
    assert_eq!(continuation.notes[0].pitch, 62);
    assert_eq!(continuation.notes[1].pitch, 69);

    let merged = load_seed_instrument(&output_path).unwrap();
    assert_eq!(merged.program, 24);
    assert_eq!(merged.notes.len(), 13);

    let pitches: Vec<u8> = merged.notes.iter().take(5).map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![48, 52, 55, 62, 69]);
    assert_eq!(merged.notes[0].velocity, 100);
    assert_eq!(merged.notes[3].velocity, GENERATED_VELOCITY);
    assert!((merged.notes.last().unwrap().end_time - 7.0).abs() < 1e-3);
}

#[test]
fn test_file_without_pitched_notes() {
    let instrument = Instrument {
        channel: 9,
        program: 0,
        notes: vec![],
    };
    let data = write_midi_file_data(&instrument, &[NoteEvent::new(36, 0.0, 0.1, 100)]).unwrap();
    let mut rng = StdRng::seed_from_u64(0);

    let params = GenerationParams::default();
    let limits = LoopLimits::default();
    let result = continue_midi(&Arpeggio, &data, &params, &limits, &mut rng);
    assert!(matches!(result, Err(ContinuationError::InvalidSeedFile(_))));
}

#[test]
fn test_garbage_input_is_a_midi_error() {
    let mut rng = StdRng::seed_from_u64(0);
    let result = continue_midi(
        &Arpeggio,
        b"definitely not midi",
        &GenerationParams::default(),
        &LoopLimits::default(),
        &mut rng,
    );
    assert!(matches!(result, Err(ContinuationError::Midi(_))));
}
