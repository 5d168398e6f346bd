use tracing::{info, warn};

use crate::events::TrackEvent;
use crate::music::Voice;
use crate::source::{MetricSource, QueryRange, Sample, SourceError};

/// Delta-timed events for one voice over a historical range.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub channel: u8,
    pub events: Vec<TrackEvent>,
}

impl Track {
    pub fn total_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.delta as u64).sum()
    }
}

/// Turns a range of historical samples into a track, compressing metric time
/// by `factor` and quantizing it to `ticks_per_unit` ticks per second.
#[derive(Debug, Clone, Copy)]
pub struct RangeTrackBuilder {
    pub range: QueryRange,
    pub factor: u32,
    pub ticks_per_unit: u16,
}

impl RangeTrackBuilder {
    pub fn new(range: QueryRange, factor: u32, ticks_per_unit: u16) -> Self {
        Self {
            range,
            factor,
            ticks_per_unit,
        }
    }

    /// `floor((delta / factor) * ticks_per_unit)`; negative deltas become 0.
    pub fn scale_delta(&self, delta: i64) -> u32 {
        if delta <= 0 {
            return 0;
        }
        // Integer division is the exact floor of (delta / factor) * ticks.
        let scaled = delta as u128 * self.ticks_per_unit as u128 / self.factor.max(1) as u128;
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }

    /// Builds `voice`'s track from `samples`. Samples that leave the note
    /// unchanged do not advance the time cursor, so their time accumulates
    /// into the next event that is emitted.
    pub fn build(&self, voice: &mut Voice, samples: &[Sample]) -> Track {
        let mut ordered = samples.to_vec();
        ordered.sort_by_key(|s| s.timestamp);

        let mut events = vec![voice.program_change().at(0)];
        let mut last_timestamp = self.range.start;

        for sample in &ordered {
            if !sample.value.is_finite() {
                let _guard = voice.span().enter();
                warn!(timestamp = sample.timestamp, "skipping non-finite value {}", sample.value);
                continue;
            }

            let changes = voice.update(sample.value);
            if changes.is_empty() {
                continue;
            }

            let scaled = self.scale_delta(sample.timestamp.saturating_sub(last_timestamp));
            // The first event carries the gap; the rest follow back-to-back.
            for (i, event) in changes.into_iter().enumerate() {
                events.push(event.at(if i == 0 { scaled } else { 0 }));
            }
            last_timestamp = sample.timestamp;
        }

        if let Some(off) = voice.close() {
            let gap = self.range.end.saturating_sub(last_timestamp);
            events.push(off.at(self.scale_delta(gap)));
        }

        Track {
            name: voice.name.clone(),
            channel: voice.channel,
            events,
        }
    }

    /// Fetches every voice's range and builds its track, in voice order. Any
    /// fetch failure aborts the whole render.
    pub fn render(
        &self,
        voices: &mut [Voice],
        source: &mut dyn MetricSource,
    ) -> Result<Vec<Track>, SourceError> {
        let mut tracks = Vec::with_capacity(voices.len());
        for voice in voices.iter_mut() {
            let samples = source.range(&voice.query, &self.range)?;
            let track = self.build(voice, &samples);
            {
                let _guard = voice.span().enter();
                info!(
                    samples = samples.len(),
                    events = track.events.len(),
                    "built track"
                );
            }
            tracks.push(track);
        }
        Ok(tracks)
    }
}
