use super::{MAX_MIDI_VALUE, MusicError};

const NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

fn letter_offset(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Splits a pitch name into its semitone offset from C (accidentals applied,
/// possibly outside 0..12) and the remaining octave text.
fn split_name(name: &str) -> Result<(i32, &str), MusicError> {
    let invalid = || MusicError::InvalidPitch(name.to_string());
    let trimmed = name.trim();
    let letter = trimmed.chars().next().ok_or_else(invalid)?;
    let mut semitone = letter_offset(letter).ok_or_else(invalid)?;

    let mut rest = &trimmed[letter.len_utf8()..];
    while let Some(c) = rest.chars().next() {
        match c {
            '#' => semitone += 1,
            'b' | '-' => semitone -= 1,
            _ => break,
        }
        rest = &rest[1..];
    }
    Ok((semitone, rest))
}

/// Parses scientific pitch notation (`C4` = 60, `F#3`, `Bb2`, `B-2`) into a
/// MIDI note number. `-` is a flat, so `C-1` is C-flat in octave 1.
pub fn parse_pitch(name: &str) -> Result<u8, MusicError> {
    let (semitone, octave) = split_name(name)?;
    let octave: i32 = octave
        .parse()
        .map_err(|_| MusicError::InvalidPitch(name.to_string()))?;

    let out_of_range = || MusicError::PitchOutOfRange {
        name: name.to_string(),
    };
    let midi = octave
        .checked_add(1)
        .and_then(|o| o.checked_mul(12))
        .and_then(|m| m.checked_add(semitone))
        .ok_or_else(out_of_range)?;
    if !(0..=MAX_MIDI_VALUE as i32).contains(&midi) {
        return Err(out_of_range());
    }
    Ok(midi as u8)
}

/// Parses a bare pitch class (`D`, `F#`, `Eb`) into 0..12.
pub fn parse_pitch_class(name: &str) -> Result<u8, MusicError> {
    let (semitone, rest) = split_name(name)?;
    if !rest.is_empty() {
        return Err(MusicError::InvalidPitch(name.to_string()));
    }
    Ok(semitone.rem_euclid(12) as u8)
}

pub fn pitch_class_name(pitch_class: u8) -> &'static str {
    NAMES[(pitch_class % 12) as usize]
}

/// Display name of a MIDI note, e.g. `C4` for 60.
pub fn note_name(note: u8) -> String {
    let octave = note as i32 / 12 - 1;
    format!("{}{}", pitch_class_name(note), octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scientific_pitch_notation() {
        assert_eq!(parse_pitch("C4"), Ok(60));
        assert_eq!(parse_pitch("A4"), Ok(69));
        assert_eq!(parse_pitch("c4"), Ok(60));
        assert_eq!(parse_pitch("F#3"), Ok(54));
        assert_eq!(parse_pitch("Bb2"), Ok(46));
        assert_eq!(parse_pitch("B-2"), Ok(46));
        assert_eq!(parse_pitch("C##4"), Ok(62));
        assert_eq!(parse_pitch("G9"), Ok(127));
    }

    #[test]
    fn dash_is_a_flat_not_a_sign() {
        assert_eq!(parse_pitch("C-1"), Ok(23));
    }

    #[test]
    fn rejects_malformed_and_out_of_range_names() {
        assert!(matches!(parse_pitch(""), Err(MusicError::InvalidPitch(_))));
        assert!(matches!(parse_pitch("H4"), Err(MusicError::InvalidPitch(_))));
        assert!(matches!(parse_pitch("C"), Err(MusicError::InvalidPitch(_))));
        assert!(matches!(
            parse_pitch("G#9"),
            Err(MusicError::PitchOutOfRange { .. })
        ));
    }

    #[test]
    fn huge_octaves_are_out_of_range() {
        for name in ["C2147483647", "C357913942", "Cb999999999", "B#2147483646"] {
            assert!(
                matches!(parse_pitch(name), Err(MusicError::PitchOutOfRange { .. })),
                "{name}"
            );
        }
    }

    #[test]
    fn pitch_classes_wrap_around() {
        assert_eq!(parse_pitch_class("C"), Ok(0));
        assert_eq!(parse_pitch_class("Cb"), Ok(11));
        assert_eq!(parse_pitch_class("B#"), Ok(0));
        assert_eq!(parse_pitch_class("E-"), Ok(3));
        assert!(parse_pitch_class("C4").is_err());
    }

    #[test]
    fn names_notes() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(70), "A#4");
    }
}
