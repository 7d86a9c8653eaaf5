use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::{debug, info};

use crate::constants::{DEFAULT_TEMPO_MICROS, PERCUSSION_CHANNEL};
use crate::error::{ContinuationError, Result};

use super::event_codec::{notes_to_events, EventTriple, NoteEvent};

/// The notes of one pitched instrument, sorted by start time.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub channel: u8,
    pub program: u8,
    pub notes: Vec<NoteEvent>,
}

impl Instrument {
    /// Seed triples plus the time the continuation should start at
    /// (end of the last note, or 0 without notes).
    pub fn seed(&self) -> (Vec<EventTriple>, f64) {
        let start_time = self.notes.last().map_or(0.0, |note| note.end_time);
        (notes_to_events(&self.notes), start_time)
    }
}

/// Converts absolute ticks to seconds.
enum TickClock {
    Metrical {
        ticks_per_beat: f64,
        // (tick, seconds at tick, microseconds per beat from tick on)
        tempo_changes: Vec<(u64, f64, u32)>,
    },
    Timecode {
        ticks_per_second: f64,
    },
}

impl TickClock {
    fn new(smf: &Smf) -> Result<Self> {
        let clock = match smf.header.timing {
            Timing::Timecode(_, 0) => {
                return Err(ContinuationError::InvalidSeedFile(
                    "SMPTE timing with zero subframes".to_string(),
                ));
            }
            Timing::Timecode(fps, subframes) => TickClock::Timecode {
                ticks_per_second: fps.as_f32() as f64 * subframes as f64,
            },
            Timing::Metrical(ticks_per_beat) => {
                let ticks_per_beat = ticks_per_beat.as_int().max(1) as f64;

                let mut tempos: BTreeMap<u64, u32> = BTreeMap::new();
                for track in smf.tracks.iter() {
                    let mut tick = 0u64;
                    for event in track.iter() {
                        tick += event.delta.as_int() as u64;
                        if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                            tempos.insert(tick, tempo.as_int());
                        }
                    }
                }

                let mut tempo_changes = vec![(0, 0.0, DEFAULT_TEMPO_MICROS)];
                for (tick, tempo) in tempos {
                    let seconds = Self::metrical_seconds(&tempo_changes, ticks_per_beat, tick);
                    if tick == 0 {
                        tempo_changes[0].2 = tempo;
                    } else {
                        tempo_changes.push((tick, seconds, tempo));
                    }
                }

                TickClock::Metrical {
                    ticks_per_beat,
                    tempo_changes,
                }
            }
        };
        Ok(clock)
    }

    fn metrical_seconds(tempo_changes: &[(u64, f64, u32)], ticks_per_beat: f64, tick: u64) -> f64 {
        let index = tempo_changes.partition_point(|&(t, _, _)| t <= tick).saturating_sub(1);
        let (change_tick, change_seconds, tempo) = tempo_changes[index];
        change_seconds + (tick - change_tick) as f64 * tempo as f64 / 1_000_000.0 / ticks_per_beat
    }

    fn seconds(&self, tick: u64) -> f64 {
        match self {
            TickClock::Metrical {
                ticks_per_beat,
                tempo_changes,
            } => Self::metrical_seconds(tempo_changes, *ticks_per_beat, tick),
            TickClock::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
        }
    }
}

/// Collect every pitched note of a parsed file, grouped by (channel, program).
fn collect_instruments(smf: &Smf) -> Result<Vec<Instrument>> {
    let clock = TickClock::new(smf)?;
    let mut instruments: BTreeMap<(u8, u8), Vec<NoteEvent>> = BTreeMap::new();

    for track in smf.tracks.iter() {
        let mut tick = 0u64;
        let mut programs: HashMap<u8, u8> = HashMap::new();
        // (channel, key) -> queue of (start tick, velocity, program)
        let mut sounding: HashMap<(u8, u8), VecDeque<(u64, u8, u8)>> = HashMap::new();

        for event in track.iter() {
            tick += event.delta.as_int() as u64;
            let TrackEventKind::Midi { channel, message } = event.kind else {
                continue;
            };
            let channel = channel.as_int();
            if channel == PERCUSSION_CHANNEL {
                continue;
            }

            match message {
                MidiMessage::ProgramChange { program } => {
                    programs.insert(channel, program.as_int());
                }
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    let program = programs.get(&channel).copied().unwrap_or(0);
                    sounding
                        .entry((channel, key.as_int()))
                        .or_default()
                        .push_back((tick, vel.as_int(), program));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    let key = key.as_int();
                    if let Some((start_tick, velocity, program)) =
                        sounding.get_mut(&(channel, key)).and_then(|queue| queue.pop_front())
                    {
                        instruments.entry((channel, program)).or_default().push(NoteEvent::new(
                            key,
                            clock.seconds(start_tick),
                            clock.seconds(tick),
                            velocity,
                        ));
                    }
                }
                _ => {}
            }
        }

        // Notes never released end with the track.
        for ((channel, key), queue) in sounding {
            for (start_tick, velocity, program) in queue {
                instruments.entry((channel, program)).or_default().push(NoteEvent::new(
                    key,
                    clock.seconds(start_tick),
                    clock.seconds(tick),
                    velocity,
                ));
            }
        }
    }

    Ok(instruments
        .into_iter()
        .map(|((channel, program), mut notes)| {
            notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
            Instrument { channel, program, notes }
        })
        .collect())
}

/// Pick the pitched instrument with the most notes from MIDI file data.
///
/// # Arguments
///
/// * `data` - Raw Standard MIDI File bytes.
///
/// # Returns
///
/// * The instrument to continue. Files without pitched notes are rejected.
pub fn parse_seed_instrument(data: &[u8]) -> Result<Instrument> {
    let smf = Smf::parse(data)?;
    let instruments = collect_instruments(&smf)?;
    debug!(instruments = instruments.len(), tracks = smf.tracks.len(), "parsed seed file");

    // Ties go to the lowest (channel, program).
    let instrument = instruments
        .into_iter()
        .filter(|instrument| !instrument.notes.is_empty())
        .rev()
        .max_by_key(|instrument| instrument.notes.len())
        .ok_or_else(|| {
            ContinuationError::InvalidSeedFile("no pitched (non-drum) notes".to_string())
        })?;

    info!(
        channel = instrument.channel,
        program = instrument.program,
        notes = instrument.notes.len(),
        "selected seed instrument"
    );
    Ok(instrument)
}

pub fn load_seed_instrument<P: AsRef<Path>>(path: P) -> Result<Instrument> {
    let data = std::fs::read(path)?;
    parse_seed_instrument(&data)
}
