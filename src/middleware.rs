//! Pre-execution middleware for the host's argument parser
//!
//! Combined-config values act as defaults for parsed arguments: anything the
//! user actually supplied (on the command line or through the environment)
//! wins over the config.

use clap::ArgMatches;
use clap::parser::ValueSource;
use serde_json::Value;

use crate::manifest::{CombinedConfig, Manifest, normalize};

/// Overlay explicitly supplied `args` on the combined config's values
///
/// Argument keys are normalized like manifest keys; `null` arguments are
/// treated as not supplied.
#[must_use]
pub fn apply_config_defaults(config: &CombinedConfig, args: Manifest) -> Manifest {
    let mut merged = config.values.clone();
    for (key, value) in normalize(args) {
        if !value.is_null() {
            merged.insert(key, value);
        }
    }
    merged
}

/// Arguments in `matches` supplied on the command line or via environment
///
/// Values that only come from a clap default are left out, so they never
/// shadow config-provided defaults. Each raw value is parsed as JSON when it
/// is valid JSON and kept as a string otherwise; repeated arguments become
/// arrays.
#[must_use]
pub fn explicit_args(matches: &ArgMatches) -> Manifest {
    let mut args = Manifest::new();

    for id in matches.ids() {
        let supplied = matches!(
            matches.value_source(id.as_str()),
            Some(ValueSource::CommandLine | ValueSource::EnvVariable)
        );
        if !supplied {
            continue;
        }

        let Ok(Some(raw)) = matches.try_get_raw(id.as_str()) else {
            continue;
        };
        let mut values: Vec<Value> = raw
            .map(|v| parse_scalar(&v.to_string_lossy()))
            .collect();

        let value = match values.len() {
            0 => Value::Bool(true),
            1 => values.remove(0),
            _ => Value::Array(values),
        };
        args.insert(id.as_str().to_string(), value);
    }

    args
}

/// Parse `key=value` assignments into a manifest
///
/// # Errors
///
/// Returns `Error::Config` for an assignment without `=` or with an empty key
pub fn parse_assignments<S: AsRef<str>>(assignments: &[S]) -> crate::Result<Manifest> {
    let mut out = Manifest::new();
    for assignment in assignments {
        let assignment = assignment.as_ref();
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(crate::Error::Config(format!(
                "expected key=value, got {assignment:?}"
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(crate::Error::Config(format!(
                "empty key in assignment {assignment:?}"
            )));
        }
        out.insert(key.to_string(), parse_scalar(value));
    }
    Ok(out)
}

fn parse_scalar(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
