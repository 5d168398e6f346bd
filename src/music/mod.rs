mod instrument;
mod pitch;
mod scale;
mod voice;

use thiserror::Error;

pub use instrument::{Instrument, ValueRange};
pub use pitch::{note_name, parse_pitch, parse_pitch_class};
pub use scale::{Scale, ScaleKind};
pub use voice::Voice;

pub const MAX_MIDI_VALUE: u8 = 127;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MusicError {
    #[error("invalid pitch name {0:?}")]
    InvalidPitch(String),

    #[error("pitch {name:?} is outside the MIDI note range")]
    PitchOutOfRange { name: String },

    #[error("instrument {instrument:?}: range {lo}..={hi} is reversed")]
    ReversedRange { instrument: String, lo: u8, hi: u8 },

    #[error("instrument {instrument:?}: value {value} exceeds 127")]
    ValueOutOfRange { instrument: String, value: u8 },

    #[error("instrument {instrument:?} has no playable values")]
    EmptyValueSet { instrument: String },

    #[error("instrument {instrument:?}: values must be strictly ascending")]
    UnorderedValues { instrument: String },
}
