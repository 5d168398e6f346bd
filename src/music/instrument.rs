use serde::{Deserialize, Serialize};

use super::{MAX_MIDI_VALUE, MusicError, Scale, parse_pitch};

/// Declared value set of an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueRange {
    /// Every MIDI note from `lo` to `hi`, inclusive.
    Notes(u8, u8),
    /// Scale pitches between two pitch names, inclusive.
    Pitches(String, String),
}

/// Maps a normalized metric value onto one of an ordered set of notes.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub program: u8,
    values: Vec<u8>,
}

impl Instrument {
    pub fn new(
        name: &str,
        program: u8,
        range: &ValueRange,
        scale: &Scale,
    ) -> Result<Self, MusicError> {
        if program > MAX_MIDI_VALUE {
            return Err(MusicError::ValueOutOfRange {
                instrument: name.to_string(),
                value: program,
            });
        }

        let (lo, hi) = match range {
            ValueRange::Notes(lo, hi) => (*lo, *hi),
            ValueRange::Pitches(lo, hi) => (parse_pitch(lo)?, parse_pitch(hi)?),
        };
        if lo > hi {
            return Err(MusicError::ReversedRange {
                instrument: name.to_string(),
                lo,
                hi,
            });
        }
        if hi > MAX_MIDI_VALUE {
            return Err(MusicError::ValueOutOfRange {
                instrument: name.to_string(),
                value: hi,
            });
        }

        let values = match range {
            ValueRange::Notes(..) => (lo..=hi).collect(),
            ValueRange::Pitches(..) => scale.pitches(lo, hi),
        };
        Self::from_values(name, program, values)
    }

    /// Wraps an explicit value set, which must be non-empty, strictly
    /// ascending and within the MIDI note range.
    pub fn from_values(name: &str, program: u8, values: Vec<u8>) -> Result<Self, MusicError> {
        let Some(&last) = values.last() else {
            return Err(MusicError::EmptyValueSet {
                instrument: name.to_string(),
            });
        };
        if values.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MusicError::UnorderedValues {
                instrument: name.to_string(),
            });
        }
        if last > MAX_MIDI_VALUE {
            return Err(MusicError::ValueOutOfRange {
                instrument: name.to_string(),
                value: last,
            });
        }
        Ok(Self {
            name: name.to_string(),
            program,
            values,
        })
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Picks the value at `round((n - 1) * value)`, rounding half away from
    /// zero. The index saturates into the value set, NaN selects the first.
    pub fn clamp(&self, value: f64) -> u8 {
        let last = self.values.len() - 1;
        let index = ((last as f64) * value).round();
        // `as` saturates: negatives and NaN become 0.
        let index = (index as usize).min(last);
        self.values[index]
    }
}
