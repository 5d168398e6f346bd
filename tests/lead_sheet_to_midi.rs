//! Integration test: lead sheet on disk → voices → tracks → MIDI file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crossbeam::channel::unbounded;
use midly::{MidiMessage, Smf, TrackEventKind};
use sonify::engine::{self, Common, GenerateSettings};
use sonify::source::SourceError;
use sonify::{Event, LeadSheet, MetricSource, QueryRange, Replacement, Sample};

const SHEET: &str = r#"(
    scale: (kind: Minor, tonic: "A"),
    instruments: {
        "bass": (program: 33, range: Pitches("A2", "A3")),
        "kit": (program: 0, range: Notes(36, 38)),
    },
    queries: [
        (name: "requests", instrument: "bass", query: "rate(http_requests_total{job=\"$job\"}[1m])"),
        (name: "errors", instrument: "kit", query: "rate(http_errors_total{job=\"$job\"}[1m])"),
    ],
)"#;

/// Answers by query, failing for anything unknown.
struct Canned(HashMap<String, Vec<Sample>>);

impl MetricSource for Canned {
    fn instant(&mut self, query: &str) -> Result<Sample, SourceError> {
        self.0
            .get(query)
            .and_then(|samples| samples.first().copied())
            .ok_or(SourceError::Empty)
    }

    fn range(&mut self, query: &str, _range: &QueryRange) -> Result<Vec<Sample>, SourceError> {
        self.0
            .get(query)
            .cloned()
            .ok_or_else(|| SourceError::Transport(format!("no route for {query}")))
    }
}

fn write_sheet(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("sheet.ron");
    fs::write(&path, SHEET).unwrap();
    path
}

fn settings(lead_sheet: &Path, output: &Path) -> GenerateSettings {
    GenerateSettings {
        common: Common {
            lead_sheet: lead_sheet.to_path_buf(),
            prometheus_host: "unused".to_string(),
            replacements: vec!["job=api".parse::<Replacement>().unwrap()],
        },
        range: QueryRange {
            start: 0,
            end: 60,
            step: 1,
        },
        factor: 2,
        ticks_per_beat: 96,
        output: output.to_path_buf(),
    }
}

fn canned() -> Canned {
    let mut answers = HashMap::new();
    answers.insert(
        "rate(http_requests_total{job=\"api\"}[1m])".to_string(),
        vec![
            Sample::new(0, 0.0),
            Sample::new(20, 0.0),
            Sample::new(30, 1.0),
        ],
    );
    answers.insert(
        "rate(http_errors_total{job=\"api\"}[1m])".to_string(),
        vec![Sample::new(10, 0.5)],
    );
    Canned(answers)
}

#[test]
fn generates_one_track_per_query() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_sheet(dir.path());
    let output = dir.path().join("out.mid");
    let settings = settings(&sheet, &output);

    let voices = LeadSheet::load(&sheet)
        .unwrap()
        .resolve(&settings.common.replacements)
        .unwrap();
    engine::generate_with(&settings, voices, &mut canned()).unwrap();

    let bytes = fs::read(&output).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(smf.tracks.len(), 2);

    let notes: Vec<(u32, u8, bool)> = smf.tracks[0]
        .iter()
        .filter_map(|e| match e.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, .. },
                ..
            } => Some((e.delta.as_int(), key.as_int(), true)),
            TrackEventKind::Midi {
                message: MidiMessage::NoteOff { key, .. },
                ..
            } => Some((e.delta.as_int(), key.as_int(), false)),
            _ => None,
        })
        .collect();
    // A minor from A2 to A3: 45 .. 57. The change at t=30 carries 30s / 2 * 96.
    assert_eq!(
        notes,
        vec![(0, 45, true), (1440, 45, false), (0, 57, true), (1440, 57, false)]
    );

    let errors_channel = smf.tracks[1].iter().find_map(|e| match e.kind {
        TrackEventKind::Midi { channel, .. } => Some(channel.as_int()),
        _ => None,
    });
    assert_eq!(errors_channel, Some(1));
}

#[test]
fn failed_fetch_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_sheet(dir.path());
    let output = dir.path().join("out.mid");
    let settings = settings(&sheet, &output);

    let voices = LeadSheet::load(&sheet).unwrap().resolve(&[]).unwrap();
    // Without the replacement the queries match nothing in the canned source.
    let result = engine::generate_with(&settings, voices, &mut canned());
    assert!(result.is_err());
    assert!(!output.exists());
}

#[test]
fn live_run_sets_programs_plays_and_silences() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_sheet(dir.path());
    let voices = LeadSheet::load(&sheet)
        .unwrap()
        .resolve(&["job=api".parse().unwrap()])
        .unwrap();

    let (tx, rx) = unbounded();
    tx.send(()).unwrap();
    let mut sink: Vec<Event> = Vec::new();
    let cycles = engine::run_live(voices, Duration::ZERO, &mut canned(), &mut sink, &rx);

    assert_eq!(cycles, 1);
    assert_eq!(
        sink,
        vec![
            Event::ProgramChange {
                channel: 0,
                program: 33
            },
            Event::ProgramChange {
                channel: 1,
                program: 0
            },
            Event::NoteOn {
                channel: 0,
                note: 45,
                velocity: 127
            },
            Event::NoteOn {
                channel: 1,
                note: 37,
                velocity: 127
            },
            Event::NoteOff {
                channel: 0,
                note: 45
            },
            Event::NoteOff {
                channel: 1,
                note: 37
            },
        ]
    );
}
