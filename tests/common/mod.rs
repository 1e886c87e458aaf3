//! Shared test utilities
//!
//! A `Fixture` lays out module roots, a host project and manifests inside one
//! temporary directory:
//!
//! ```text
//! <tmp>/bundled  <tmp>/sibling  <tmp>/global  <tmp>/extra
//! <tmp>/project/Cargo.toml
//! <tmp>/project/modules/...
//! ```

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use plugkit::{Runtime, RuntimeOptions};
use tempfile::TempDir;

/// Name of the fixture's host project
pub const HOST: &str = "app";

/// A temporary plugin layout
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// Create an empty layout with a host project named [`HOST`]
    #[must_use]
    pub fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        };
        fixture.write(
            "project/Cargo.toml",
            &format!("[package]\nname = \"{HOST}\"\nversion = \"0.1.0\"\n"),
        );
        fixture
    }

    /// Absolute path of `rel` inside the fixture
    #[must_use]
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Host project directory
    #[must_use]
    pub fn project(&self) -> PathBuf {
        self.path("project")
    }

    /// Write a file, creating parent directories
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().expect("file has a parent"))
            .expect("failed to create parent dir");
        std::fs::write(&path, content).expect("failed to write file");
        path
    }

    /// Create module `name` under `root` (e.g. "bundled", "project/modules")
    pub fn module(&self, root: &str, name: &str) -> PathBuf {
        let path = self.path(root).join(name);
        std::fs::create_dir_all(&path).expect("failed to create module dir");
        path
    }

    /// Create a module in the project's dependency directory
    pub fn dep(&self, name: &str) -> PathBuf {
        self.module("project/modules", name)
    }

    /// Write a file inside a module directory
    pub fn module_file(module: &Path, rel: &str, content: &str) -> PathBuf {
        let path = module.join(rel);
        std::fs::create_dir_all(path.parent().expect("file has a parent"))
            .expect("failed to create parent dir");
        std::fs::write(&path, content).expect("failed to write file");
        path
    }

    /// Options pointing every root group into the fixture
    #[must_use]
    pub fn options(&self) -> RuntimeOptions {
        let mut options = RuntimeOptions::local("plugkit", self.project());
        options.bundled_dir = Some(self.path("bundled"));
        options.sibling_dir = Some(self.path("sibling"));
        options.global_dir = Some(self.path("global"));
        options.extra_dirs = vec![self.path("extra")];
        options
    }

    /// Runtime over [`options`](Self::options)
    #[must_use]
    pub fn runtime(&self) -> Runtime {
        Runtime::new(self.options()).expect("failed to create runtime")
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
