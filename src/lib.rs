//! Turns metric time series into MIDI.
//!
//! Each query in a lead sheet drives one voice: its value, normalized to
//! `0..=1`, picks a note from the voice's instrument, and only note changes
//! produce events. Voices are played live against a MIDI port or rendered
//! over a historical range into a Standard MIDI File.

pub mod cli;
pub mod engine;
pub mod error;
pub mod events;
pub mod lead_sheet;
pub mod music;
pub mod sink;
pub mod source;
pub mod timing;

pub use cli::{Command, USAGE, parse_args};
pub use engine::{GenerateSettings, LiveSettings};
pub use error::{Error, Result};
pub use events::{Event, TrackEvent};
pub use lead_sheet::{LeadSheet, Replacement};
pub use music::{Instrument, Scale, ScaleKind, ValueRange, Voice};
pub use sink::{EventSink, MidiPortSink};
pub use source::{MetricSource, Prometheus, QueryRange, Sample};
pub use timing::{LiveScheduler, RangeTrackBuilder, Track};
