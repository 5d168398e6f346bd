mod live;
mod track;

pub use live::{DEFAULT_CADENCE, LiveScheduler, cycle_delay};
pub use track::{RangeTrackBuilder, Track};
