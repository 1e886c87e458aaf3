//! Command extension loading
//!
//! Modules and the host contribute subcommands to a shared namespace by laying
//! out descriptor files under `<extendDir>/<namespace>/commands/<path>`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::manifest::{DOCUMENT_EXTENSIONS, Manifest, normalize, read_manifest_file};

/// Default extend directory of the host
pub const DEFAULT_EXTEND_DIR: &str = "extend";

/// Manifest key naming a module's extend directory
pub const EXTEND_DIR_KEY: &str = "extendDir";

/// A command described by one descriptor file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Command name (defaults to the descriptor's file stem)
    #[serde(default)]
    pub name: String,

    /// One-line description
    #[serde(default)]
    pub description: Option<String>,

    /// Disabled commands are never registered
    #[serde(default)]
    pub disabled: bool,

    /// Program or script the command runs
    #[serde(default)]
    pub run: Option<String>,

    /// Arguments passed to `run`
    #[serde(default)]
    pub args: Vec<String>,

    /// Descriptor file
    #[serde(skip_deserializing)]
    pub source: PathBuf,
}

/// Receives command directories as they are discovered
pub trait CommandRegistrar {
    /// Register the enabled commands found in `dir`
    fn register(&mut self, dir: &Path, commands: Vec<CommandEntry>);
}

impl<F> CommandRegistrar for F
where
    F: FnMut(&Path, Vec<CommandEntry>),
{
    fn register(&mut self, dir: &Path, commands: Vec<CommandEntry>) {
        self(dir, commands);
    }
}

/// Something that may contribute commands: a module or the host
#[derive(Debug, Clone, Copy)]
pub struct ExtensionSource<'a> {
    /// Owner name, for logging
    pub owner: &'a str,
    /// Root directory
    pub root: &'a Path,
    /// Composed manifest
    pub manifest: &'a Manifest,
}

impl ExtensionSource<'_> {
    fn extend_dir(&self) -> Option<&str> {
        self.manifest
            .get(EXTEND_DIR_KEY)
            .and_then(serde_json::Value::as_str)
    }
}

/// Register every command directory contributing to `command_path`
///
/// In order: `<base_path>/<command_path>` (always, even if absent); then for
/// each module declaring an extend directory,
/// `<extendDir>/<namespace>/commands/<command_path>` if it exists; then the
/// host's equivalent if it exists. Returns the registered directories.
pub fn extend(
    command_path: &str,
    namespace: &str,
    registrar: &mut dyn CommandRegistrar,
    base_path: &Path,
    modules: &[ExtensionSource<'_>],
    host: &ExtensionSource<'_>,
) -> Vec<PathBuf> {
    let mut registered = Vec::new();

    let base = base_path.join(command_path);
    registrar.register(&base, discover_commands(&base));
    registered.push(base);

    let module_dirs = modules.iter().filter_map(|source| {
        source
            .extend_dir()
            .map(|extend| (source.owner, source.root.join(extend)))
    });
    let host_dir = (
        host.owner,
        host.root
            .join(host.extend_dir().unwrap_or(DEFAULT_EXTEND_DIR)),
    );

    for (owner, extend_root) in module_dirs.chain(std::iter::once(host_dir)) {
        let dir = extend_root
            .join(namespace)
            .join("commands")
            .join(command_path);
        if !dir.is_dir() || registered.contains(&dir) {
            continue;
        }

        tracing::debug!(owner = %owner, path = %dir.display(), "registering extension commands");
        registrar.register(&dir, discover_commands(&dir));
        registered.push(dir);
    }

    registered
}

/// Enabled commands described in `dir`, sorted by file name
///
/// A missing directory has no commands; malformed descriptors are skipped.
#[must_use]
pub fn discover_commands(dir: &Path) -> Vec<CommandEntry> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e))
        })
        .collect();
    files.sort();

    files
        .iter()
        .filter_map(|path| match load_descriptor(path) {
            Ok(entry) if entry.disabled => {
                tracing::debug!(command = %entry.name, "command disabled, skipping");
                None
            }
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load command descriptor");
                None
            }
        })
        .collect()
}

fn load_descriptor(path: &Path) -> crate::Result<CommandEntry> {
    let raw = normalize(read_manifest_file(path)?);
    let mut entry: CommandEntry = serde_json::from_value(serde_json::Value::Object(raw))?;

    if entry.name.is_empty() {
        entry.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    entry.source = path.to_path_buf();

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(base: &Path, rel: &str, content: &str) {
        let path = base.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_skips_disabled_and_malformed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.toml", "description = \"second\"\n");
        write(dir.path(), "a.json", r#"{"name": "alpha", "run": "alpha.sh"}"#);
        write(dir.path(), "c.yaml", "disabled: true\n");
        write(dir.path(), "d.toml", "name = [\n");
        write(dir.path(), "notes.txt", "ignored");

        let names: Vec<_> = discover_commands(dir.path())
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["alpha", "b"]);
        assert!(discover_commands(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn test_extend_registers_in_order() {
        let base = TempDir::new().unwrap();
        let module = TempDir::new().unwrap();
        let plain = TempDir::new().unwrap();
        let host = TempDir::new().unwrap();

        write(module.path(), "ext/db/commands/migrate/up.toml", "");
        write(plain.path(), "extend/db/commands/migrate/down.toml", "");
        write(host.path(), "extend/db/commands/migrate/reset.toml", "");

        let module_manifest = match json!({ "extendDir": "ext" }) {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        };
        let empty = Manifest::new();
        let modules = [
            ExtensionSource {
                owner: "plugkit-plugin-a",
                root: module.path(),
                manifest: &module_manifest,
            },
            // No extendDir declared: never consulted
            ExtensionSource {
                owner: "plugkit-plugin-b",
                root: plain.path(),
                manifest: &empty,
            },
        ];
        let host_source = ExtensionSource {
            owner: "app",
            root: host.path(),
            manifest: &empty,
        };

        let mut seen = Vec::new();
        let mut registrar = |dir: &Path, commands: Vec<CommandEntry>| {
            seen.push((dir.to_path_buf(), commands.into_iter().map(|c| c.name).collect::<Vec<_>>()));
        };
        let dirs = extend("migrate", "db", &mut registrar, base.path(), &modules, &host_source);

        assert_eq!(
            dirs,
            vec![
                base.path().join("migrate"),
                module.path().join("ext/db/commands/migrate"),
                host.path().join("extend/db/commands/migrate"),
            ]
        );
        assert_eq!(seen[0].1, Vec::<String>::new());
        assert_eq!(seen[1].1, vec!["up"]);
        assert_eq!(seen[2].1, vec!["reset"]);
    }
}
