//! Module discovery across ordered filesystem roots
//!
//! Roots are processed in a fixed order and a name found under a later root
//! replaces the same name found earlier:
//!
//! bundled < sibling installs < global cache < project deps < extra dirs < self

mod pattern;

pub use pattern::{DEFAULT_PATTERNS, NamePattern};

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::RuntimeOptions;

/// Located modules, name to absolute path, in first-discovery order
pub type ModuleMap = IndexMap<String, PathBuf>;

/// Which root group a directory belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    /// First-party modules shipped with the host
    Bundled,
    /// Modules installed next to the host
    Sibling,
    /// Per-user global module cache
    Global,
    /// The project's dependency directory
    ProjectDeps,
    /// Explicitly configured directory
    Extra,
    /// The project itself, if its own name matches
    Project,
}

/// A directory scanned for modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Root group
    pub kind: RootKind,
    /// Directory path (for `Project`, the project directory itself)
    pub path: PathBuf,
}

impl Root {
    /// Create a root
    #[must_use]
    pub fn new(kind: RootKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Roots for `options`, in processing order
#[must_use]
pub fn roots_for(options: &RuntimeOptions) -> Vec<Root> {
    let mut roots = Vec::new();

    if let Some(dir) = &options.bundled_dir {
        roots.push(Root::new(RootKind::Bundled, dir));
    }
    if let Some(dir) = options.sibling_dir.as_ref().filter(|_| !options.skip_sibling) {
        roots.push(Root::new(RootKind::Sibling, dir));
    }
    if let Some(dir) = options.global_dir.as_ref().filter(|_| !options.skip_global) {
        roots.push(Root::new(RootKind::Global, dir));
    }
    roots.push(Root::new(RootKind::ProjectDeps, options.deps_path()));
    roots.extend(
        options
            .extra_dirs
            .iter()
            .map(|dir| Root::new(RootKind::Extra, dir)),
    );
    roots.push(Root::new(RootKind::Project, &options.project_dir));

    roots
}

/// Scan `roots` in order for directories whose names match `pattern`
///
/// A name found under a later root replaces the earlier path and keeps the
/// earlier position. Missing roots are skipped.
#[must_use]
pub fn locate(roots: &[Root], pattern: &NamePattern) -> ModuleMap {
    let mut found = ModuleMap::new();

    for root in roots {
        match root.kind {
            RootKind::Project => {
                let name = project_name(&root.path);
                if pattern.matches(&name) && root.path.is_dir() {
                    insert(&mut found, name, &root.path, root.kind);
                }
            }
            _ => scan_root(root, pattern, &mut found),
        }
    }

    tracing::debug!(count = found.len(), "located modules");
    found
}

fn scan_root(root: &Root, pattern: &NamePattern, found: &mut ModuleMap) {
    if !root.path.is_dir() {
        tracing::debug!(path = %root.path.display(), kind = ?root.kind, "module root does not exist, skipping");
        return;
    }

    for (name, path) in sorted_dirs(&root.path) {
        if name.starts_with('@') {
            for (child, child_path) in sorted_dirs(&path) {
                let scoped = format!("{name}/{child}");
                if pattern.matches(&scoped) {
                    insert(found, scoped, &child_path, root.kind);
                }
            }
        } else if pattern.matches(&name) {
            insert(found, name, &path, root.kind);
        }
    }
}

fn insert(found: &mut ModuleMap, name: String, path: &Path, kind: RootKind) {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    tracing::debug!(module = %name, path = %path.display(), kind = ?kind, "discovered module");

    if let Some(previous) = found.insert(name.clone(), path) {
        tracing::debug!(
            module = %name,
            previous = %previous.display(),
            kind = ?kind,
            "module overridden by later root"
        );
    }
}

/// Subdirectories of `dir` (following symlinks), sorted by name
fn sorted_dirs(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "failed to read module root");
            return Vec::new();
        }
    };

    let mut dirs: Vec<_> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_dir() {
                return None;
            }
            let name = entry.file_name().to_str()?.to_string();
            Some((name, path))
        })
        .collect();
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    dirs
}

/// Name of the project at `dir`
///
/// Read from `Cargo.toml` `[package] name`, falling back to the directory name.
#[must_use]
pub fn project_name(dir: &Path) -> String {
    let from_manifest = std::fs::read_to_string(dir.join("Cargo.toml"))
        .ok()
        .and_then(|content| content.parse::<toml::Table>().ok())
        .and_then(|table| {
            table
                .get("package")?
                .get("name")?
                .as_str()
                .map(str::to_string)
        });

    from_manifest.unwrap_or_else(|| {
        std::path::absolute(dir)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default()
    })
}
