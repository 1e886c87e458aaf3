//! Manifests: normalized key/value configuration owned by a module or the host
//!
//! Every source is read into a JSON object, then keys are normalized so that
//! cosmetic variants (`command-dir`, `command.dir`, `commandDir`) land on one
//! canonical camelCase spelling before any merge happens.

pub mod combined;
pub mod compose;

pub use combined::CombinedConfig;
pub use compose::Composer;

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{Error, Result};

/// Normalized key/value configuration
pub type Manifest = serde_json::Map<String, Value>;

/// File extensions accepted for manifest-like documents, checked in order
pub const DOCUMENT_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Normalize a single key to its canonical camelCase form
///
/// Hyphens camel-case the following character and dots become underscores.
/// The output never contains `-` or `.`, so the function is idempotent.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;

    for ch in key.chars() {
        match ch {
            '-' => upper_next = !out.is_empty(),
            '.' => {
                out.push('_');
                upper_next = false;
            }
            c if upper_next => {
                out.extend(c.to_uppercase());
                upper_next = false;
            }
            c => out.push(c),
        }
    }

    out
}

/// Normalize every top-level key of a manifest
///
/// When a cosmetic variant and the canonical key are both present, the
/// canonical key wins.
#[must_use]
pub fn normalize(manifest: Manifest) -> Manifest {
    let mut out = Manifest::new();
    let mut canonical = Vec::new();

    for (key, value) in manifest {
        let normalized = normalize_key(&key);
        if normalized == key {
            canonical.push((key, value));
        } else {
            out.insert(normalized, value);
        }
    }

    for (key, value) in canonical {
        out.insert(key, value);
    }

    out
}

/// Recursive deep merge of two JSON values
///
/// - Objects are merged recursively (source overrides target per key)
/// - Arrays and scalars are replaced entirely by source
/// - Null values in source are skipped (preserving target)
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (target, Value::Null) => target,
        (_, source) => source,
    }
}

/// Deep-merge `source` into `target` in place
pub fn merge_into(target: &mut Manifest, source: Manifest) {
    let merged = deep_merge(
        Value::Object(std::mem::take(target)),
        Value::Object(source),
    );
    if let Value::Object(map) = merged {
        *target = map;
    }
}

/// Shallow-assign `source` into `target`: top-level keys overwrite
pub fn assign_into(target: &mut Manifest, source: Manifest) {
    for (key, value) in source {
        target.insert(key, value);
    }
}

/// Find `<dir>/<stem>.<ext>` for the first supported extension that exists
#[must_use]
pub fn find_document(dir: &Path, stem: &str) -> Option<PathBuf> {
    DOCUMENT_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

/// Read a TOML, YAML or JSON document into a JSON value, by extension
///
/// # Errors
///
/// Returns error if the file cannot be read, has an unsupported extension or
/// fails to parse
pub fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension {
        "toml" => {
            let table: toml::Table = toml::from_str(&content)?;
            Ok(serde_json::to_value(table)?)
        }
        "yaml" | "yml" => {
            if content.trim().is_empty() {
                return Ok(Value::Object(Manifest::new()));
            }
            Ok(serde_yaml::from_str(&content)?)
        }
        "json" => Ok(serde_json::from_str(&content)?),
        other => Err(Error::Config(format!(
            "unsupported document extension {other:?}: {}",
            path.display()
        ))),
    }
}

/// Read a document that must hold a top-level table
///
/// An empty YAML document counts as an empty table.
///
/// # Errors
///
/// Returns error if the document cannot be read or is not a table
pub fn read_manifest_file(path: &Path) -> Result<Manifest> {
    match read_document(path)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Manifest::new()),
        other => Err(Error::Config(format!(
            "expected a table in {}, found {}",
            path.display(),
            value_kind(&other)
        ))),
    }
}

/// Short human name for a JSON value's type
#[must_use]
pub const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}
