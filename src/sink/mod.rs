mod midi_port;
mod smf;

use thiserror::Error;

use crate::events::Event;

pub use midi_port::MidiPortSink;
pub use smf::{encode_tracks, length_seconds, write_tracks};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("MIDI device error: {0}")]
    Device(String),

    #[error("MIDI port error: {0}")]
    Port(String),

    #[error("MIDI send error: {0}")]
    Send(String),

    #[error("track {track:?}: delta of {delta} ticks does not fit a MIDI file")]
    DeltaOverflow { track: String, delta: u32 },

    #[error("{0} ticks per beat does not fit a MIDI file header")]
    InvalidTiming(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<midir::InitError> for SinkError {
    fn from(e: midir::InitError) -> Self {
        SinkError::Device(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiOutput>> for SinkError {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        SinkError::Port(e.to_string())
    }
}

impl From<midir::SendError> for SinkError {
    fn from(e: midir::SendError) -> Self {
        SinkError::Send(e.to_string())
    }
}

/// Receives live events, each to be emitted immediately.
pub trait EventSink {
    fn send(&mut self, event: &Event) -> Result<(), SinkError>;
}

/// Collects events in memory.
impl EventSink for Vec<Event> {
    fn send(&mut self, event: &Event) -> Result<(), SinkError> {
        self.push(*event);
        Ok(())
    }
}
