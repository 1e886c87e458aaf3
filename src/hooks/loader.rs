//! Hook file discovery and loading
//!
//! A hook file maps events to exports:
//!
//! ```toml
//! [greet]
//! value = { from = "a" }
//!
//! [build]
//! command = "hooks/build.sh"
//! args = ["--fast"]
//!
//! [deploy.namespaces.cli]
//! command = "hooks/deploy.py"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::executor::CommandHandler;
use super::types::canonical_event;
use super::value::HookValue;
use crate::manifest::{Manifest, read_manifest_file};
use crate::{Error, Result};

/// Hook file looked up when nothing else names one
pub const DEFAULT_HOOK_FILE: &str = "hooks.toml";

/// Manifest key listing the events a module answers, for probing
pub const HOOK_EVENTS_KEY: &str = "hookEvents";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportSpec {
    Command(CommandSpec),
    Value(ValueSpec),
    Namespaced(NamespacedSpec),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandSpec {
    command: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ValueSpec {
    value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NamespacedSpec {
    #[serde(default)]
    unscoped: Option<Box<ExportSpec>>,
    #[serde(default)]
    namespaces: HashMap<String, ExportSpec>,
}

impl ExportSpec {
    fn into_value(self, base: &Path, working_dir: &Path) -> HookValue {
        match self {
            Self::Value(spec) => HookValue::Plain(spec.value),
            Self::Command(spec) => {
                let program = base.join(&spec.command);
                HookValue::callable(CommandHandler::new(program, spec.args, working_dir))
            }
            Self::Namespaced(spec) => HookValue::Namespaced {
                unscoped: spec
                    .unscoped
                    .map(|u| Box::new(u.into_value(base, working_dir))),
                scoped: spec
                    .namespaces
                    .into_iter()
                    .map(|(ns, export)| (ns, export.into_value(base, working_dir)))
                    .collect(),
            },
        }
    }
}

/// A parsed hook file
#[derive(Debug, Clone, Default)]
pub struct HookFile {
    path: PathBuf,
    exports: HashMap<String, HookValue>,
}

impl HookFile {
    /// Parse the hook file at `path`
    ///
    /// Command paths are relative to the file's directory; handlers run in
    /// `working_dir`. Event keys are canonicalized.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or an export is malformed
    pub fn load(path: &Path, working_dir: &Path) -> Result<Self> {
        let raw = read_manifest_file(path)?;
        let base = path.parent().unwrap_or(working_dir);

        let mut exports = HashMap::new();
        for (event, spec) in raw {
            let spec: ExportSpec = serde_json::from_value(spec).map_err(|e| {
                Error::Config(format!(
                    "malformed export {event:?} in {}: {e}",
                    path.display()
                ))
            })?;
            exports.insert(canonical_event(&event), spec.into_value(base, working_dir));
        }

        tracing::debug!(
            path = %path.display(),
            events = ?exports.keys().collect::<Vec<_>>(),
            "loaded hook file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            exports,
        })
    }

    /// Export for a canonical event
    #[must_use]
    pub fn export(&self, event: &str) -> Option<&HookValue> {
        self.exports.get(event)
    }

    /// Events this file exports
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    /// Where this file was loaded from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolve a module's hook file
///
/// The module's own `hooks` entry wins over the combined config's, which wins
/// over [`DEFAULT_HOOK_FILE`]. An entry naming a directory resolves to the
/// default file inside it.
#[must_use]
pub fn resolve_hook_file(root: &Path, own: Option<&str>, combined: Option<&str>) -> PathBuf {
    let path = own
        .or(combined)
        .map_or_else(|| root.join(DEFAULT_HOOK_FILE), |entry| root.join(entry));

    if path.is_dir() {
        path.join(DEFAULT_HOOK_FILE)
    } else {
        path
    }
}

/// Cheap check whether a module may answer `event`
///
/// A manifest listing `hookEvents` is trusted without touching the hook file;
/// otherwise the hook file has to exist.
#[must_use]
pub fn probe(manifest: &Manifest, hook_file: &Path, event: &str) -> bool {
    match manifest.get(HOOK_EVENTS_KEY).and_then(Value::as_array) {
        Some(events) => events
            .iter()
            .filter_map(Value::as_str)
            .any(|e| canonical_event(e) == event),
        None => hook_file.is_file(),
    }
}
