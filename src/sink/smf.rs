//! Standard MIDI File output.
//!
//! Tracks are written as a format 1 file. Every track opens with its name and
//! a 60 BPM tempo, so one beat lasts one second and the file's ticks per beat
//! are ticks per second of metric time.

use std::fs;
use std::path::Path;

use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::info;

use super::SinkError;
use crate::events::Event;
use crate::timing::Track;

/// Microseconds per beat at 60 BPM.
const TEMPO_60_BPM: u32 = 1_000_000;

fn channel_message(event: &Event) -> TrackEventKind<'static> {
    let (channel, message) = match *event {
        Event::ProgramChange { channel, program } => (
            channel,
            MidiMessage::ProgramChange {
                program: u7::from_int_lossy(program),
            },
        ),
        Event::NoteOn {
            channel,
            note,
            velocity,
        } => (
            channel,
            MidiMessage::NoteOn {
                key: u7::from_int_lossy(note),
                vel: u7::from_int_lossy(velocity),
            },
        ),
        Event::NoteOff { channel, note } => (
            channel,
            MidiMessage::NoteOff {
                key: u7::from_int_lossy(note),
                vel: u7::from_int_lossy(0),
            },
        ),
    };
    TrackEventKind::Midi {
        channel: u4::from_int_lossy(channel),
        message,
    }
}

fn smf_track(track: &Track) -> Result<Vec<midly::TrackEvent<'_>>, SinkError> {
    let mut events = Vec::with_capacity(track.events.len() + 3);
    events.push(midly::TrackEvent {
        delta: u28::from_int_lossy(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(track.name.as_bytes())),
    });
    events.push(midly::TrackEvent {
        delta: u28::from_int_lossy(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from_int_lossy(TEMPO_60_BPM))),
    });

    for event in &track.events {
        let delta = u28::try_from(event.delta).ok_or_else(|| SinkError::DeltaOverflow {
            track: track.name.clone(),
            delta: event.delta,
        })?;
        events.push(midly::TrackEvent {
            delta,
            kind: channel_message(&event.event),
        });
    }

    events.push(midly::TrackEvent {
        delta: u28::from_int_lossy(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    Ok(events)
}

/// Encodes `tracks` as a complete MIDI file in memory.
pub fn encode_tracks(tracks: &[Track], ticks_per_beat: u16) -> Result<Vec<u8>, SinkError> {
    let ticks = u15::try_from(ticks_per_beat)
        .filter(|t| t.as_int() > 0)
        .ok_or(SinkError::InvalidTiming(ticks_per_beat))?;

    let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(ticks)));
    for track in tracks {
        smf.tracks.push(smf_track(track)?);
    }

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)?;
    Ok(bytes)
}

/// Encodes and writes `tracks` to `path`. Nothing is written if encoding fails.
pub fn write_tracks(tracks: &[Track], ticks_per_beat: u16, path: &Path) -> Result<(), SinkError> {
    let bytes = encode_tracks(tracks, ticks_per_beat)?;
    fs::write(path, &bytes)?;
    info!(
        "wrote {} tracks ({} bytes) to {}",
        tracks.len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Playing length of the longest track, in seconds.
pub fn length_seconds(tracks: &[Track], ticks_per_beat: u16) -> f64 {
    let longest = tracks
        .iter()
        .map(Track::total_ticks)
        .max()
        .unwrap_or(0);
    longest as f64 / ticks_per_beat.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TrackEvent;

    fn track(name: &str, channel: u8, events: Vec<TrackEvent>) -> Track {
        Track {
            name: name.to_string(),
            channel,
            events,
        }
    }

    fn sample_tracks() -> Vec<Track> {
        vec![
            track(
                "cpu",
                0,
                vec![
                    Event::ProgramChange {
                        channel: 0,
                        program: 5,
                    }
                    .at(0),
                    Event::NoteOn {
                        channel: 0,
                        note: 60,
                        velocity: 127,
                    }
                    .at(0),
                    Event::NoteOff {
                        channel: 0,
                        note: 60,
                    }
                    .at(960),
                ],
            ),
            track(
                "idle",
                1,
                vec![
                    Event::ProgramChange {
                        channel: 1,
                        program: 0,
                    }
                    .at(0),
                ],
            ),
        ]
    }

    #[test]
    fn encoded_file_parses_back() {
        let bytes = encode_tracks(&sample_tracks(), 480).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.header.timing, Timing::Metrical(u15::from_int_lossy(480)));
        assert_eq!(smf.tracks.len(), 2);

        let first = &smf.tracks[0];
        // name, tempo, program, on, off, end of track
        assert_eq!(first.len(), 6);
        assert_eq!(
            first[0].kind,
            TrackEventKind::Meta(MetaMessage::TrackName(b"cpu"))
        );
        assert_eq!(
            first[1].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(u24::from_int_lossy(1_000_000)))
        );
        assert_eq!(first[4].delta.as_int(), 960);
        assert_eq!(
            first[4].kind,
            TrackEventKind::Midi {
                channel: u4::from_int_lossy(0),
                message: MidiMessage::NoteOff {
                    key: u7::from_int_lossy(60),
                    vel: u7::from_int_lossy(0),
                },
            }
        );
        assert_eq!(first[5].kind, TrackEventKind::Meta(MetaMessage::EndOfTrack));
    }

    #[test]
    fn rejects_unrepresentable_timing_and_deltas() {
        assert!(matches!(
            encode_tracks(&sample_tracks(), 0),
            Err(SinkError::InvalidTiming(0))
        ));
        assert!(matches!(
            encode_tracks(&sample_tracks(), 40_000),
            Err(SinkError::InvalidTiming(40_000))
        ));

        let huge = vec![track(
            "huge",
            0,
            vec![Event::NoteOff { channel: 0, note: 1 }.at(u32::MAX)],
        )];
        assert!(matches!(
            encode_tracks(&huge, 480),
            Err(SinkError::DeltaOverflow { .. })
        ));
    }

    #[test]
    fn length_is_the_longest_track() {
        assert_eq!(length_seconds(&sample_tracks(), 480), 2.0);
        assert_eq!(length_seconds(&[], 480), 0.0);
    }

    #[test]
    fn write_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mid");
        write_tracks(&sample_tracks(), 480, &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"MThd");
    }
}
