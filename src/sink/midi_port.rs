use midir::{MidiOutput, MidiOutputConnection};
use tracing::{debug, info, warn};

use super::{EventSink, SinkError};
use crate::events::Event;

const CLIENT_NAME: &str = "sonify";
const ALL_NOTES_OFF: u8 = 123;
const RESET_ALL_CONTROLLERS: u8 = 121;

/// Live MIDI output port.
pub struct MidiPortSink {
    connection: MidiOutputConnection,
}

impl MidiPortSink {
    /// Connects to the output named `name`, falling back to the first port
    /// whose name ends with it (e.g. an ALSA `client:port` id). With no name,
    /// publishes a virtual port to be wired up externally.
    pub fn open(name: Option<&str>) -> Result<Self, SinkError> {
        let output = MidiOutput::new(CLIENT_NAME)?;
        let connection = match name {
            Some(name) => Self::connect_named(output, name)?,
            None => Self::create_virtual(output)?,
        };
        Ok(Self { connection })
    }

    fn connect_named(output: MidiOutput, name: &str) -> Result<MidiOutputConnection, SinkError> {
        let ports = output.ports();
        let names: Vec<String> = ports
            .iter()
            .map(|p| output.port_name(p).unwrap_or_default())
            .collect();
        debug!(?names, "available MIDI outputs");

        let index = names
            .iter()
            .position(|n| n == name)
            .or_else(|| {
                info!("no output named {name:?}; treating it as a port id");
                names.iter().position(|n| n.ends_with(name))
            })
            .ok_or_else(|| SinkError::Port(format!("no MIDI output matching {name:?}")))?;

        info!("opening MIDI output (virtual=false): {}", names[index]);
        Ok(output.connect(&ports[index], &format!("{CLIENT_NAME}-out"))?)
    }

    #[cfg(unix)]
    fn create_virtual(output: MidiOutput) -> Result<MidiOutputConnection, SinkError> {
        use midir::os::unix::VirtualOutput;

        info!("opening MIDI output (virtual=true): {CLIENT_NAME}");
        Ok(output.create_virtual(CLIENT_NAME)?)
    }

    #[cfg(not(unix))]
    fn create_virtual(_output: MidiOutput) -> Result<MidiOutputConnection, SinkError> {
        Err(SinkError::Port(
            "virtual ports are unsupported here; pass --midi-output".to_string(),
        ))
    }
}

impl EventSink for MidiPortSink {
    fn send(&mut self, event: &Event) -> Result<(), SinkError> {
        debug!(?event, "send");
        self.connection.send(&event.to_midi_bytes())?;
        Ok(())
    }
}

impl Drop for MidiPortSink {
    fn drop(&mut self) {
        for channel in 0..16u8 {
            let status = 0xB0 | channel;
            for controller in [ALL_NOTES_OFF, RESET_ALL_CONTROLLERS] {
                if let Err(e) = self.connection.send(&[status, controller, 0]) {
                    warn!("failed to reset channel {channel}: {e}");
                    return;
                }
            }
        }
    }
}
