use thiserror::Error;

use crate::lead_sheet::ConfigError;
use crate::sink::SinkError;
use crate::source::SourceError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("metric source error: {0}")]
    Source(#[from] SourceError),

    #[error("event sink error: {0}")]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, Error>;
