use tracing::{Span, debug, info, info_span};

use super::{Instrument, note_name};
use crate::events::{Event, NOTE_ON_VELOCITY};

/// One channel's note state: the instrument it plays, the query it tracks,
/// and the note it last sounded.
#[derive(Debug)]
pub struct Voice {
    pub name: String,
    pub channel: u8,
    pub query: String,
    instrument: Instrument,
    last_note: Option<u8>,
    span: Span,
}

impl Voice {
    pub fn new(name: &str, channel: u8, instrument: Instrument, query: String) -> Self {
        let span = info_span!("voice", id = %format!("{}:{}", name, instrument.name));
        Self {
            name: name.to_string(),
            channel,
            query,
            instrument,
            last_note: None,
            span,
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn last_note(&self) -> Option<u8> {
        self.last_note
    }

    /// Span scoping every log record about this voice.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn program_change(&self) -> Event {
        Event::ProgramChange {
            channel: self.channel,
            program: self.instrument.program,
        }
    }

    /// Quantizes `value` and returns the events needed to move to the new
    /// note: nothing if it is unchanged, otherwise the off for the previous
    /// note (if any) followed by the on for the new one.
    pub fn update(&mut self, value: f64) -> Vec<Event> {
        let _guard = self.span.enter();
        let note = self.instrument.clamp(value);
        debug!(value, note, name = %note_name(note), "quantized metric value");

        if self.last_note == Some(note) {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        events.extend(self.off_event());
        events.push(Event::NoteOn {
            channel: self.channel,
            note,
            velocity: NOTE_ON_VELOCITY,
        });
        info!("note {} ({})", note_name(note), note);
        self.last_note = Some(note);
        events
    }

    /// Final off for the sounding note, if any. Ends the voice's stream: the
    /// voice forgets the note so a repeated close emits nothing.
    pub fn close(&mut self) -> Option<Event> {
        let off = self.off_event();
        self.last_note = None;
        off
    }

    fn off_event(&self) -> Option<Event> {
        self.last_note.map(|note| Event::NoteOff {
            channel: self.channel,
            note,
        })
    }
}
