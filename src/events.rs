/// Velocity used for every note-on.
pub const NOTE_ON_VELOCITY: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ProgramChange { channel: u8, program: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
}

/// An event positioned relative to the previous event of the same track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackEvent {
    /// Ticks since the previous event in the track.
    pub delta: u32,
    pub event: Event,
}

impl Event {
    pub fn channel(&self) -> u8 {
        match *self {
            Event::ProgramChange { channel, .. }
            | Event::NoteOn { channel, .. }
            | Event::NoteOff { channel, .. } => channel,
        }
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self, Event::NoteOff { .. })
    }

    /// Raw MIDI channel-voice bytes for this event.
    pub fn to_midi_bytes(&self) -> Vec<u8> {
        match *self {
            Event::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            Event::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            Event::NoteOff { channel, note } => vec![0x80 | (channel & 0x0F), note & 0x7F, 0],
        }
    }

    pub fn at(self, delta: u32) -> TrackEvent {
        TrackEvent { delta, event: self }
    }
}
