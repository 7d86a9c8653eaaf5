use rand::Rng;

use config::{GenerationParams, LoopLimits};
use continuation::{generate_continuation, Continuation};
use error::Result;
use inference::Oracle;
use postprocessing::midi::{merge_notes, write_midi_file_data};
use preprocessing::load_midi::parse_seed_instrument;

pub mod config;
pub mod constants;
pub mod continuation;
pub mod error;
pub mod inference;
pub mod preprocessing {
    pub mod event_codec;
    pub mod load_midi;
    pub mod seed_window;
}
pub mod postprocessing {
    pub mod helpers {
        pub mod ported {
            pub mod numpy;
        }
    }
    pub mod midi;
    pub mod sampling;
    pub mod time_decoder;
}

/// Continue the main instrument of a MIDI file.
///
/// # Arguments
///
/// * `oracle` - The sequence model.
/// * `midi_data` - Standard MIDI File bytes holding the seed performance.
/// * `params` - Target duration and temperature.
/// * `limits` - Loop guards.
/// * `rng` - Randomness for pitch sampling.
///
/// # Returns
///
/// * The merged MIDI file (original notes followed by the continuation) and the
///   continuation itself.
pub fn continue_midi<O, R>(
    oracle: &O,
    midi_data: &[u8],
    params: &GenerationParams,
    limits: &LoopLimits,
    rng: &mut R,
) -> Result<(Vec<u8>, Continuation)>
where
    O: Oracle + ?Sized,
    R: Rng + ?Sized,
{
    let instrument = parse_seed_instrument(midi_data)?;
    let (seed, start_time) = instrument.seed();

    let continuation = generate_continuation(oracle, &seed, start_time, params, limits, rng)?;

    let merged = merge_notes(&instrument.notes, &continuation.notes);
    let output = write_midi_file_data(&instrument, &merged)?;

    Ok((output, continuation))
}
