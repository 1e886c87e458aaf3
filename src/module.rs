//! Located modules

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::manifest::{Composer, Manifest};

/// A discovered module with a lazily composed manifest
#[derive(Debug)]
pub struct Module {
    name: String,
    path: PathBuf,
    manifest: OnceLock<Manifest>,
}

impl Module {
    /// Create a module whose manifest has not been composed yet
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            manifest: OnceLock::new(),
        }
    }

    /// Unique module name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute module root
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The module's manifest, composed on first access
    pub fn manifest(&self, composer: &Composer) -> &Manifest {
        self.manifest
            .get_or_init(|| composer.compose(&self.path, &self.name))
    }
}
