//! Command-line parsing.
//!
//! ```text
//! sonify live [--midi-output NAME] [--replacement K=V]... [--cadence SECS]
//!             LEAD-SHEET PROMETHEUS-HOST
//! sonify generate [--replacement K=V]... [--range START:END]
//!                 [--speed-up-factor N] [--prometheus-step N] [--ticks-per-beat N]
//!                 LEAD-SHEET PROMETHEUS-HOST OUTPUT-FILE
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::engine::{
    Common, DEFAULT_RANGE_SECONDS, DEFAULT_TICKS_PER_BEAT, GenerateSettings, LiveSettings,
};
use crate::lead_sheet::Replacement;
use crate::source::QueryRange;
use crate::timing::DEFAULT_CADENCE;

pub const USAGE: &str = "\
Usage:
  sonify live [OPTIONS] LEAD-SHEET PROMETHEUS-HOST
      Play the queries in LEAD-SHEET against PROMETHEUS-HOST in real time,
      sending MIDI to MIDI-OUTPUT (or a virtual port). Press Enter to stop.

      --midi-output NAME    output port name or ALSA client:port id
      --replacement K=V     replace $K in queries with V (repeatable)
      --cadence SECS        seconds between polls (default 5)

  sonify generate [OPTIONS] LEAD-SHEET PROMETHEUS-HOST OUTPUT-FILE
      Write a multi-track MIDI file covering a range of history.

      --replacement K=V     replace $K in queries with V (repeatable)
      --range START:END     UNIX timestamps (default: the last 3 minutes)
      --speed-up-factor N   compress time by N (default 1)
      --prometheus-step N   query resolution in seconds (default 1)
      --ticks-per-beat N    file resolution, ticks per second (default 480)

Logging is controlled with RUST_LOG (default: info).";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    #[error("missing command")]
    MissingCommand,

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("unknown option {0:?}")]
    UnknownOption(String),

    #[error("option {0} needs a value")]
    MissingValue(String),

    #[error("invalid value {value:?} for {option}: {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },

    #[error("missing {0}")]
    MissingArgument(&'static str),

    #[error("unexpected argument {0:?}")]
    UnexpectedArgument(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Live(LiveSettings),
    Generate(GenerateSettings),
    Help,
}

#[derive(Default)]
struct Parsed {
    options: Vec<(String, String)>,
    positionals: Vec<String>,
}

impl Parsed {
    fn last(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn all(&self, name: &str) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

fn invalid(option: &str, value: &str, reason: impl ToString) -> CliError {
    CliError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn split_args(
    args: impl IntoIterator<Item = String>,
    allowed: &[&str],
) -> Result<Parsed, CliError> {
    let mut parsed = Parsed::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if !arg.starts_with("--") {
            parsed.positionals.push(arg);
            continue;
        }

        let (name, inline) = match arg.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (arg.clone(), None),
        };
        if !allowed.contains(&name.as_str()) {
            return Err(CliError::UnknownOption(name));
        }
        let value = match inline {
            Some(value) => value,
            None => args.next().ok_or_else(|| CliError::MissingValue(name.clone()))?,
        };
        parsed.options.push((name, value));
    }
    Ok(parsed)
}

fn number<T>(parsed: &Parsed, option: &str, default: T, min: T) -> Result<T, CliError>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let Some(raw) = parsed.last(option) else {
        return Ok(default);
    };
    let value: T = raw.parse().map_err(|e| invalid(option, raw, e))?;
    if value < min {
        return Err(invalid(option, raw, format!("must be at least {min}")));
    }
    Ok(value)
}

fn common(
    parsed: &Parsed,
    positionals: &mut std::vec::IntoIter<String>,
) -> Result<Common, CliError> {
    let lead_sheet = positionals
        .next()
        .ok_or(CliError::MissingArgument("LEAD-SHEET"))?;
    let prometheus_host = positionals
        .next()
        .ok_or(CliError::MissingArgument("PROMETHEUS-HOST"))?;
    let replacements = parsed
        .all("--replacement")
        .map(|raw| {
            raw.parse::<Replacement>()
                .map_err(|e| invalid("--replacement", raw, e))
        })
        .collect::<Result<_, _>>()?;

    Ok(Common {
        lead_sheet: PathBuf::from(lead_sheet),
        prometheus_host,
        replacements,
    })
}

fn no_more(mut positionals: std::vec::IntoIter<String>) -> Result<(), CliError> {
    match positionals.next() {
        Some(extra) => Err(CliError::UnexpectedArgument(extra)),
        None => Ok(()),
    }
}

fn parse_live(args: impl IntoIterator<Item = String>) -> Result<LiveSettings, CliError> {
    let parsed = split_args(args, &["--midi-output", "--replacement", "--cadence"])?;
    let mut positionals = parsed.positionals.clone().into_iter();
    let common = common(&parsed, &mut positionals)?;
    no_more(positionals)?;

    let cadence = match parsed.last("--cadence") {
        None => DEFAULT_CADENCE,
        Some(raw) => {
            let secs: f64 = raw.parse().map_err(|e| invalid("--cadence", raw, e))?;
            if secs <= 0.0 {
                return Err(invalid("--cadence", raw, "must be positive"));
            }
            Duration::try_from_secs_f64(secs).map_err(|e| invalid("--cadence", raw, e))?
        }
    };

    Ok(LiveSettings {
        common,
        midi_output: parsed.last("--midi-output").map(str::to_string),
        cadence,
    })
}

fn parse_range(raw: &str) -> Result<(i64, i64), CliError> {
    let reason = "must be <start timestamp>:<end timestamp>";
    let (start, end) = raw
        .split_once(':')
        .ok_or_else(|| invalid("--range", raw, reason))?;
    let start: i64 = start.parse().map_err(|e| invalid("--range", raw, e))?;
    let end: i64 = end.parse().map_err(|e| invalid("--range", raw, e))?;
    if start >= end {
        return Err(invalid("--range", raw, "start must be before end"));
    }
    Ok((start, end))
}

fn parse_generate(
    args: impl IntoIterator<Item = String>,
    now: i64,
) -> Result<GenerateSettings, CliError> {
    let parsed = split_args(
        args,
        &[
            "--replacement",
            "--range",
            "--speed-up-factor",
            "--prometheus-step",
            "--ticks-per-beat",
        ],
    )?;
    let mut positionals = parsed.positionals.clone().into_iter();
    let common = common(&parsed, &mut positionals)?;
    let output = positionals
        .next()
        .ok_or(CliError::MissingArgument("OUTPUT-FILE"))?;
    no_more(positionals)?;

    let (start, end) = match parsed.last("--range") {
        Some(raw) => parse_range(raw)?,
        None => (now - DEFAULT_RANGE_SECONDS, now),
    };
    let ticks_per_beat = number(&parsed, "--ticks-per-beat", DEFAULT_TICKS_PER_BEAT, 1)?;
    if ticks_per_beat > 0x7FFF {
        return Err(invalid(
            "--ticks-per-beat",
            &ticks_per_beat.to_string(),
            "must be at most 32767",
        ));
    }

    Ok(GenerateSettings {
        common,
        range: QueryRange {
            start,
            end,
            step: number(&parsed, "--prometheus-step", 1, 1)?,
        },
        factor: number(&parsed, "--speed-up-factor", 1, 1)?,
        ticks_per_beat,
        output: PathBuf::from(output),
    })
}

/// Parses the arguments after the program name. `now` (UNIX seconds)
/// anchors the default range.
pub fn parse_args(args: impl IntoIterator<Item = String>, now: i64) -> Result<Command, CliError> {
    let mut args = args.into_iter();
    let command = args.next().ok_or(CliError::MissingCommand)?;
    match command.as_str() {
        "live" => Ok(Command::Live(parse_live(args)?)),
        "generate" => Ok(Command::Generate(parse_generate(args, now)?)),
        "-h" | "--help" | "help" => Ok(Command::Help),
        _ => Err(CliError::UnknownCommand(command)),
    }
}
