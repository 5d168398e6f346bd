use serde::{Deserialize, Serialize};

use super::pitch::pitch_class_name;
use super::{MAX_MIDI_VALUE, MusicError, parse_pitch_class};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleKind {
    #[default]
    Major,
    Minor,
    HarmonicMinor,
    MelodicMinor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    MajorPentatonic,
    MinorPentatonic,
    Blues,
    WholeTone,
    Chromatic,
}

impl ScaleKind {
    /// Semitone offsets from the tonic, ascending, within one octave.
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleKind::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            ScaleKind::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleKind::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleKind::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleKind::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleKind::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleKind::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleKind::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleKind::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleKind::WholeTone => &[0, 2, 4, 6, 8, 10],
            ScaleKind::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    pub kind: ScaleKind,
    /// Pitch class of the tonic, 0 (C) through 11 (B).
    pub tonic: u8,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            kind: ScaleKind::Major,
            tonic: 0,
        }
    }
}

impl Scale {
    pub fn new(kind: ScaleKind, tonic: &str) -> Result<Self, MusicError> {
        Ok(Self {
            kind,
            tonic: parse_pitch_class(tonic)?,
        })
    }

    pub fn contains(&self, note: u8) -> bool {
        let degree = (note as i32 - self.tonic as i32).rem_euclid(12) as u8;
        self.kind.intervals().contains(&degree)
    }

    /// Every note of the scale in `lo..=hi`, ascending.
    pub fn pitches(&self, lo: u8, hi: u8) -> Vec<u8> {
        (lo..=hi.min(MAX_MIDI_VALUE))
            .filter(|&note| self.contains(note))
            .collect()
    }

    pub fn name(&self) -> String {
        format!("{} {:?}", pitch_class_name(self.tonic), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_major_between_c4_and_c5() {
        let scale = Scale::default();
        assert_eq!(scale.pitches(60, 72), vec![60, 62, 64, 65, 67, 69, 71, 72]);
    }

    #[test]
    fn tonic_shifts_the_collection() {
        let scale = Scale::new(ScaleKind::MinorPentatonic, "A").unwrap();
        assert_eq!(scale.pitches(57, 69), vec![57, 60, 62, 64, 67, 69]);
    }

    #[test]
    fn endpoints_outside_the_scale_are_skipped() {
        let scale = Scale::new(ScaleKind::Major, "D").unwrap();
        // C4 and C5 are not in D major.
        let pitches = scale.pitches(60, 72);
        assert_eq!(pitches.first(), Some(&61));
        assert_eq!(pitches.last(), Some(&71));
    }

    #[test]
    fn chromatic_keeps_every_note() {
        let scale = Scale::new(ScaleKind::Chromatic, "F#").unwrap();
        assert_eq!(scale.pitches(0, 127).len(), 128);
    }

    #[test]
    fn names_the_scale() {
        let scale = Scale::new(ScaleKind::Dorian, "Eb").unwrap();
        assert_eq!(scale.name(), "D# Dorian");
        assert_eq!(Scale::default().name(), "C Major");
    }
}
