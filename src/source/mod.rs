mod prometheus;

use thiserror::Error;

pub use prometheus::{Prometheus, decode_instant, decode_range};

/// One metric observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the UNIX epoch.
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Inclusive time window queried in batch mode, all in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRange {
    pub start: i64,
    pub end: i64,
    pub step: u32,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("query returned no data")]
    Empty,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("server reported {status}: {message}")]
    Status { status: String, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Decode(e.to_string())
    }
}

/// Where metric values come from.
pub trait MetricSource {
    /// The current value of `query`.
    fn instant(&mut self, query: &str) -> Result<Sample, SourceError>;

    /// Every value of `query` over `range`, in the order the source returns them.
    fn range(&mut self, query: &str, range: &QueryRange) -> Result<Vec<Sample>, SourceError>;
}
