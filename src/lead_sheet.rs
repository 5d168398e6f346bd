use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::music::{Instrument, MusicError, Scale, ScaleKind, ValueRange, Voice};

/// MIDI has 16 channels; each query gets its own.
pub const MAX_QUERIES: usize = 16;

const BUILTIN_INSTRUMENTS: &str = include_str!("instruments.ron");

/// Stock instruments every lead sheet can name without declaring them.
pub fn builtin_instruments() -> Result<BTreeMap<String, InstrumentDef>, ConfigError> {
    Ok(ron::from_str(BUILTIN_INSTRUMENTS)?)
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid lead sheet: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error(transparent)]
    Music(#[from] MusicError),

    #[error("query {query:?} refers to unknown instrument {instrument:?}")]
    UnknownInstrument { query: String, instrument: String },

    #[error("lead sheet declares no queries")]
    NoQueries,

    #[error("lead sheet declares {0} queries; at most 16 fit on MIDI channels")]
    TooManyQueries(usize),

    #[error("invalid replacement {0:?}; expected key=value")]
    InvalidReplacement(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleDef {
    #[serde(default)]
    pub kind: ScaleKind,
    #[serde(default = "default_tonic")]
    pub tonic: String,
}

fn default_tonic() -> String {
    "C".to_string()
}

impl Default for ScaleDef {
    fn default() -> Self {
        Self {
            kind: ScaleKind::default(),
            tonic: default_tonic(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentDef {
    pub program: u8,
    pub range: ValueRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDef {
    pub name: String,
    pub instrument: String,
    pub query: String,
}

/// The queries to play, the instruments to play them on, and the scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSheet {
    #[serde(default)]
    pub scale: ScaleDef,
    #[serde(default)]
    pub instruments: BTreeMap<String, InstrumentDef>,
    pub queries: Vec<QueryDef>,
}

/// A `$var` substitution for queries, parsed from `key=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub var: String,
    pub value: String,
}

impl FromStr for Replacement {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (var, value) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidReplacement(s.to_string()))?;
        Ok(Self {
            var: var.to_string(),
            value: value.to_string(),
        })
    }
}

/// Replaces each `$var` in `query`, in order.
pub fn substitute(query: &str, replacements: &[Replacement]) -> String {
    replacements.iter().fold(query.to_string(), |query, r| {
        query.replace(&format!("${}", r.var), &r.value)
    })
}

impl LeadSheet {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn scale(&self) -> Result<Scale, ConfigError> {
        Ok(Scale::new(self.scale.kind, &self.scale.tonic)?)
    }

    /// The built-in instruments with this sheet's definitions laid over them.
    pub fn instrument_defs(&self) -> Result<BTreeMap<String, InstrumentDef>, ConfigError> {
        let mut defs = builtin_instruments()?;
        defs.extend(self.instruments.clone());
        Ok(defs)
    }

    /// Builds one voice per query, on channels in declaration order. Every
    /// reference is checked here so nothing fails once playback starts.
    pub fn resolve(&self, replacements: &[Replacement]) -> Result<Vec<Voice>, ConfigError> {
        if self.queries.is_empty() {
            return Err(ConfigError::NoQueries);
        }
        if self.queries.len() > MAX_QUERIES {
            return Err(ConfigError::TooManyQueries(self.queries.len()));
        }

        let scale = self.scale()?;
        info!("selected scale: {}", scale.name());

        let defs = self.instrument_defs()?;
        let mut instruments = BTreeMap::new();
        for (name, def) in &defs {
            instruments.insert(name, Instrument::new(name, def.program, &def.range, &scale)?);
        }

        self.queries
            .iter()
            .enumerate()
            .map(|(channel, def)| {
                let instrument = instruments.get(&def.instrument).ok_or_else(|| {
                    ConfigError::UnknownInstrument {
                        query: def.name.clone(),
                        instrument: def.instrument.clone(),
                    }
                })?;
                let query = substitute(&def.query, replacements);
                let voice = Voice::new(&def.name, channel as u8, instrument.clone(), query);
                {
                    let _guard = voice.span().enter();
                    info!("calculated query: {}", voice.query.trim());
                }
                Ok(voice)
            })
            .collect()
    }
}
