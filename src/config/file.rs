//! TOML settings file loading
//!
//! Supports `~/.config/<app>/config.toml` as a persistent settings source.
//! All fields are optional: the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Settings file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    /// Module naming prefix (e.g. "plugkit")
    pub prefix: Option<String>,

    /// Project dependency directory name (default "modules")
    pub deps_dir: Option<String>,

    /// Directory holding bundled first-party modules
    pub bundled_dir: Option<String>,

    /// Additional module roots, scanned after project dependencies
    pub extra_dirs: Option<Vec<String>>,

    /// Skip the per-user global module cache
    pub skip_global: Option<bool>,

    /// Skip modules installed next to the host
    pub skip_sibling: Option<bool>,

    /// Default environment name for overlay files
    pub env: Option<String>,
}

/// Load the settings file for `app` from the standard path
///
/// Returns `SettingsFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_settings_file(app: &str) -> SettingsFile {
    settings_file_path(app).map_or_else(SettingsFile::default, |path| load_settings_from(&path))
}

/// Load a settings file from an explicit path
#[must_use]
pub fn load_settings_from(path: &Path) -> SettingsFile {
    if !path.exists() {
        return SettingsFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                tracing::debug!(path = %path.display(), "loaded settings file");
                settings
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse settings file, using defaults"
                );
                SettingsFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read settings file"
            );
            SettingsFile::default()
        }
    }
}

/// Return the settings file path: `~/.config/<app>/config.toml`
#[must_use]
pub fn settings_file_path(app: &str) -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join(app).join("config.toml"))
}
