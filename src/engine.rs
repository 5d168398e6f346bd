use std::path::PathBuf;
use std::time::Duration;

use crossbeam::channel::Receiver;
use tracing::info;

use crate::error::Result;
use crate::lead_sheet::{LeadSheet, Replacement};
use crate::music::Voice;
use crate::sink::{self, EventSink, MidiPortSink};
use crate::source::{MetricSource, Prometheus, QueryRange};
use crate::timing::{LiveScheduler, RangeTrackBuilder, Track};

/// Range rendered when none is given: the last three minutes.
pub const DEFAULT_RANGE_SECONDS: i64 = 180;
/// Ticks per beat of generated files; at 60 BPM, ticks per second.
pub const DEFAULT_TICKS_PER_BEAT: u16 = 480;

/// Settings shared by both modes.
#[derive(Debug, Clone, PartialEq)]
pub struct Common {
    pub lead_sheet: PathBuf,
    pub prometheus_host: String,
    pub replacements: Vec<Replacement>,
}

impl Common {
    fn voices(&self) -> Result<Vec<Voice>> {
        let sheet = LeadSheet::load(&self.lead_sheet)?;
        Ok(sheet.resolve(&self.replacements)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveSettings {
    pub common: Common,
    pub midi_output: Option<String>,
    pub cadence: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateSettings {
    pub common: Common,
    pub range: QueryRange,
    pub factor: u32,
    pub ticks_per_beat: u16,
    pub output: PathBuf,
}

/// Plays the lead sheet in real time until `shutdown` fires.
pub fn live(settings: &LiveSettings, shutdown: &Receiver<()>) -> Result<()> {
    let voices = settings.common.voices()?;
    let mut sink = MidiPortSink::open(settings.midi_output.as_deref())?;
    let mut source = Prometheus::new(&settings.common.prometheus_host);

    run_live(voices, settings.cadence, &mut source, &mut sink, shutdown);
    Ok(())
}

pub fn run_live(
    voices: Vec<Voice>,
    cadence: Duration,
    source: &mut dyn MetricSource,
    sink: &mut dyn EventSink,
    shutdown: &Receiver<()>,
) -> u64 {
    let mut scheduler = LiveScheduler::new(voices, cadence);
    scheduler.run(source, sink, shutdown)
}

/// Renders the lead sheet over a historical range into a MIDI file.
pub fn generate(settings: &GenerateSettings) -> Result<()> {
    let voices = settings.common.voices()?;
    let mut source = Prometheus::new(&settings.common.prometheus_host);
    generate_with(settings, voices, &mut source)
}

/// Builds every track, then writes the file. A failed fetch aborts before
/// anything is written.
pub fn generate_with(
    settings: &GenerateSettings,
    mut voices: Vec<Voice>,
    source: &mut dyn MetricSource,
) -> Result<()> {
    let builder = RangeTrackBuilder::new(settings.range, settings.factor, settings.ticks_per_beat);
    let tracks: Vec<Track> = builder.render(&mut voices, source)?;

    sink::write_tracks(&tracks, settings.ticks_per_beat, &settings.output)?;
    info!(
        "MIDI file length: {}s",
        sink::length_seconds(&tracks, settings.ticks_per_beat)
    );
    Ok(())
}
