use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError};
use tracing::{info, warn};

use crate::events::Event;
use crate::music::Voice;
use crate::sink::EventSink;
use crate::source::MetricSource;

pub const DEFAULT_CADENCE: Duration = Duration::from_secs(5);

/// Time left to wait after a cycle that took `elapsed`. A late cycle gets no
/// wait at all rather than a catch-up burst.
pub fn cycle_delay(cadence: Duration, elapsed: Duration) -> Duration {
    cadence.saturating_sub(elapsed)
}

/// Polls every voice on a fixed cadence and emits their note changes.
///
/// Each cycle first fetches and quantizes every voice (prep), then emits all
/// pending events in voice order (tick), so slow queries never interleave
/// with emission.
pub struct LiveScheduler {
    voices: Vec<Voice>,
    pending: Vec<Vec<Event>>,
    cadence: Duration,
}

impl LiveScheduler {
    pub fn new(voices: Vec<Voice>, cadence: Duration) -> Self {
        let pending = vec![Vec::new(); voices.len()];
        Self {
            voices,
            pending,
            cadence,
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Sets every voice's program.
    pub fn start(&mut self, sink: &mut dyn EventSink) {
        for voice in &self.voices {
            let _guard = voice.span().enter();
            info!(
                "setting program on channel {} to {}",
                voice.channel,
                voice.instrument().program
            );
            emit(sink, &voice.program_change());
        }
    }

    /// Fetches each voice's current value and computes its pending events.
    /// A voice whose fetch fails keeps its note and has nothing pending.
    /// Returns the number of voices that failed.
    pub fn prep(&mut self, source: &mut dyn MetricSource) -> usize {
        let mut failed = 0;
        for (voice, pending) in self.voices.iter_mut().zip(self.pending.iter_mut()) {
            pending.clear();
            let fetched = source.instant(&voice.query);

            let value = {
                let _guard = voice.span().enter();
                match fetched {
                    Ok(sample) if sample.value.is_finite() => {
                        info!("metric value: {}", sample.value);
                        Some(sample.value)
                    }
                    Ok(sample) => {
                        warn!("ignoring non-finite metric value {}", sample.value);
                        None
                    }
                    Err(e) => {
                        warn!("ignoring occasional error: {e}");
                        None
                    }
                }
            };

            match value {
                Some(value) => *pending = voice.update(value),
                None => failed += 1,
            }
        }
        failed
    }

    /// Emits every voice's pending events, in voice order.
    pub fn tick(&mut self, sink: &mut dyn EventSink) {
        for pending in &mut self.pending {
            for event in pending.drain(..) {
                emit(sink, &event);
            }
        }
    }

    /// Silences every sounding note.
    pub fn close(&mut self, sink: &mut dyn EventSink) {
        for pending in &mut self.pending {
            pending.clear();
        }
        for voice in &mut self.voices {
            if let Some(off) = voice.close() {
                emit(sink, &off);
            }
        }
    }

    /// One prep + tick pass. Returns how long it took.
    pub fn run_cycle(
        &mut self,
        source: &mut dyn MetricSource,
        sink: &mut dyn EventSink,
    ) -> Duration {
        let started = Instant::now();
        self.prep(source);
        self.tick(sink);
        started.elapsed()
    }

    /// Runs cycles until a message arrives on `shutdown`, then closes every
    /// voice. Returns the number of cycles run. If the shutdown channel is
    /// disconnected the loop keeps running with plain sleeps.
    pub fn run(
        &mut self,
        source: &mut dyn MetricSource,
        sink: &mut dyn EventSink,
        shutdown: &Receiver<()>,
    ) -> u64 {
        self.start(sink);

        let mut cycles = 0;
        loop {
            info!("starting loop...");
            let elapsed = self.run_cycle(source, sink);
            cycles += 1;

            let delay = cycle_delay(self.cadence, elapsed);
            info!("loop complete; sleeping for {:.3}s", delay.as_secs_f64());
            match shutdown.recv_timeout(delay) {
                Ok(()) => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => std::thread::sleep(delay),
            }
        }

        info!("shutting down after {cycles} cycles");
        self.close(sink);
        cycles
    }
}

fn emit(sink: &mut dyn EventSink, event: &Event) {
    if let Err(e) = sink.send(event) {
        warn!(?event, "failed to send event: {e}");
    }
}
