use midly::num::{u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use crate::constants::{OUTPUT_BPM, TICKS_PER_BEAT};
use crate::error::Result;
use crate::preprocessing::event_codec::NoteEvent;
use crate::preprocessing::load_midi::Instrument;

#[derive(Debug, Clone)]
struct TrackEventAbsolute<'a> {
    tick: u32,
    kind: TrackEventKind<'a>,
}

fn is_note_on(kind: &TrackEventKind) -> bool {
    matches!(
        kind,
        TrackEventKind::Midi {
            message: MidiMessage::NoteOn { .. },
            ..
        }
    )
}

/// Original notes followed by generated ones, ordered by start time.
///
/// The sort is stable, so at equal start times original notes stay ahead.
pub fn merge_notes(original: &[NoteEvent], generated: &[NoteEvent]) -> Vec<NoteEvent> {
    let mut merged: Vec<NoteEvent> = original.iter().chain(generated.iter()).copied().collect();
    merged.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    merged
}

fn seconds_to_tick(seconds: f64, ticks_per_second: f64) -> u32 {
    (seconds.max(0.0) * ticks_per_second).round() as u32
}

pub fn generate_ordered_midi_events(
    notes: &[NoteEvent],
    channel: u4,
    ticks_per_second: f64,
) -> Vec<TrackEvent<'static>> {
    let mut track_events_absolute: Vec<TrackEventAbsolute> = vec![];
    for note in notes {
        let key = u7::new(note.pitch.min(127));
        let vel = u7::new(note.velocity.min(127));
        let start_tick = seconds_to_tick(note.start_time, ticks_per_second);
        let end_tick = seconds_to_tick(note.end_time, ticks_per_second).max(start_tick);

        track_events_absolute.push(TrackEventAbsolute {
            tick: start_tick,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            },
        });
        track_events_absolute.push(TrackEventAbsolute {
            tick: end_tick,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff { key, vel: u7::new(0) },
            },
        });
    }

    // NoteOff first at equal ticks so a repeated key is not cut short.
    track_events_absolute.sort_by_key(|event| (event.tick, is_note_on(&event.kind)));

    let mut previous_tick = 0;
    track_events_absolute
        .into_iter()
        .map(|event| {
            let delta = event.tick - previous_tick;
            previous_tick = event.tick;
            TrackEvent {
                delta: delta.into(),
                kind: event.kind,
            }
        })
        .collect()
}

/// Generate MIDI file data for one instrument.
///
/// # Arguments
///
/// * `instrument` - Supplies channel and program; its own notes are not written.
/// * `notes` - The notes to write, usually the output of `merge_notes`.
///
/// # Returns
///
/// * A single-track Standard MIDI File at `OUTPUT_BPM`.
pub fn write_midi_file_data(instrument: &Instrument, notes: &[NoteEvent]) -> Result<Vec<u8>> {
    let timing = Timing::Metrical(TICKS_PER_BEAT.into());
    let ticks_per_second = TICKS_PER_BEAT as f64 * OUTPUT_BPM as f64 / 60.0;
    let channel = u4::new(instrument.channel.min(15));

    let mut smf = Smf::new(Header {
        format: Format::SingleTrack,
        timing,
    });
    let mut track = Track::new();

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo((60_000_000 / OUTPUT_BPM).into())),
    });
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(instrument.program.min(127)),
            },
        },
    });
    track.extend(generate_ordered_midi_events(notes, channel, ticks_per_second));
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    smf.tracks.push(track);

    let mut buffer = Vec::new();
    smf.write_std(&mut buffer)?;

    Ok(buffer)
}
