//! Per-module manifest composition
//!
//! Sources, lowest precedence first:
//! 1. convention defaults inferred from conventional subdirectories
//! 2. an explicit `<configName>.{toml,yaml,yml,json}` at the module root
//! 3. `[package.metadata.<name>]` in the host project's `Cargo.toml`
//! 4. an `<configName>.<env>.<ext>` overlay, deep-merged on top

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde_json::Value;

use super::{Manifest, assign_into, find_document, merge_into, normalize, read_manifest_file};

/// Conventional subdirectories and the manifest key each one implies
const CONVENTIONS: &[(&str, &str)] = &[
    ("commands", "commandDir"),
    ("extend", "extendDir"),
    ("hooks", "hooks"),
];

/// Composes manifests for modules and the host
#[derive(Debug, Clone)]
pub struct Composer {
    config_name: String,
    env: Option<String>,
    host_root: PathBuf,
    host_metadata: OnceLock<Manifest>,
}

impl Composer {
    /// Create a composer reading host metadata from `host_root/Cargo.toml`
    #[must_use]
    pub fn new(config_name: impl Into<String>, env: Option<String>, host_root: impl Into<PathBuf>) -> Self {
        Self {
            config_name: config_name.into(),
            env: env.filter(|e| !e.is_empty()),
            host_root: host_root.into(),
            host_metadata: OnceLock::new(),
        }
    }

    /// Base name of explicit config files
    #[must_use]
    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    /// Active environment name, if any
    #[must_use]
    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    /// Compose the manifest of the module `name` rooted at `root`
    ///
    /// Never fails: a malformed source is logged and treated as empty.
    #[must_use]
    pub fn compose(&self, root: &Path, name: &str) -> Manifest {
        let mut manifest = conventions(root);

        if let Some(path) = find_document(root, &self.config_name) {
            assign_into(&mut manifest, load_source(&path, name));
        }

        assign_into(&mut manifest, self.host_section(name));

        if let Some(path) = self.overlay_path(root) {
            tracing::debug!(module = %name, path = %path.display(), "applying environment overlay");
            merge_into(&mut manifest, load_source(&path, name));
        }

        manifest
    }

    fn overlay_path(&self, root: &Path) -> Option<PathBuf> {
        let env = self.env()?;
        find_document(root, &format!("{}.{env}", self.config_name))
    }

    /// `[package.metadata.<name>]` from the host's `Cargo.toml`, normalized
    fn host_section(&self, name: &str) -> Manifest {
        let metadata = self
            .host_metadata
            .get_or_init(|| load_package_metadata(&self.host_root));

        match metadata.get(name) {
            Some(Value::Object(section)) => normalize(section.clone()),
            Some(other) => {
                tracing::warn!(
                    module = %name,
                    found = super::value_kind(other),
                    "package metadata section is not a table, ignoring"
                );
                Manifest::new()
            }
            None => Manifest::new(),
        }
    }
}

/// Manifest implied by which conventional subdirectories exist under `root`
#[must_use]
pub fn conventions(root: &Path) -> Manifest {
    let mut manifest = Manifest::new();
    for (dir, key) in CONVENTIONS {
        if root.join(dir).is_dir() {
            manifest.insert((*key).to_string(), Value::String((*dir).to_string()));
        }
    }
    manifest
}

fn load_source(path: &Path, module: &str) -> Manifest {
    match read_manifest_file(path) {
        Ok(manifest) => normalize(manifest),
        Err(e) => {
            tracing::warn!(
                module = %module,
                path = %path.display(),
                error = %e,
                "malformed manifest source, treating as empty"
            );
            Manifest::new()
        }
    }
}

/// Read `[package.metadata]` from `<root>/Cargo.toml`
fn load_package_metadata(root: &Path) -> Manifest {
    let path = root.join("Cargo.toml");
    if !path.is_file() {
        return Manifest::new();
    }

    let package = match read_manifest_file(&path) {
        Ok(mut doc) => doc.remove("package"),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read host package metadata");
            return Manifest::new();
        }
    };

    match package {
        Some(Value::Object(mut package)) => match package.remove("metadata") {
            Some(Value::Object(metadata)) => metadata,
            _ => Manifest::new(),
        },
        _ => Manifest::new(),
    }
}
