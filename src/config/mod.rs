//! Runtime configuration

pub mod file;

use std::path::{Path, PathBuf};

use file::SettingsFile;

/// Default project dependency directory name
pub const DEFAULT_DEPS_DIR: &str = "modules";

/// Options a [`Runtime`](crate::Runtime) is built from
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Host application name; also the package metadata key of the host
    pub app_name: String,

    /// Module naming prefix (modules are named `<prefix>-plugin-*`)
    pub prefix: String,

    /// Custom name patterns; `{prefix}` is substituted. `None` uses the defaults
    pub patterns: Option<Vec<String>>,

    /// Base name of explicit config files (defaults to the app name)
    pub config_name: Option<String>,

    /// Host project root
    pub project_dir: PathBuf,

    /// Dependency directory name under the project root
    pub deps_dir: String,

    /// Bundled first-party modules
    pub bundled_dir: Option<PathBuf>,

    /// Modules installed next to the host
    pub sibling_dir: Option<PathBuf>,

    /// Per-user global module cache
    pub global_dir: Option<PathBuf>,

    /// Additional module roots
    pub extra_dirs: Vec<PathBuf>,

    /// Remove the sibling-install root from the scan
    pub skip_sibling: bool,

    /// Remove the global cache root from the scan
    pub skip_global: bool,

    /// Re-scan on every call instead of caching
    pub no_cache: bool,

    /// Environment name selecting overlay files
    pub env: Option<String>,
}

impl RuntimeOptions {
    /// Options with machine-wide defaults for the sibling and global roots
    #[must_use]
    pub fn new(app_name: &str, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            sibling_dir: default_sibling_dir(),
            global_dir: default_global_dir(app_name),
            ..Self::local(app_name, project_dir)
        }
    }

    /// Options scanning only project-local roots
    ///
    /// No sibling or global root is configured, so nothing outside the
    /// project (and explicitly added directories) is visited.
    #[must_use]
    pub fn local(app_name: &str, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_name: app_name.to_string(),
            prefix: app_name.to_string(),
            patterns: None,
            config_name: None,
            project_dir: project_dir.into(),
            deps_dir: DEFAULT_DEPS_DIR.to_string(),
            bundled_dir: None,
            sibling_dir: None,
            global_dir: None,
            extra_dirs: Vec::new(),
            skip_sibling: false,
            skip_global: false,
            no_cache: false,
            env: None,
        }
    }

    /// Apply a settings file on top of these options
    #[must_use]
    pub fn with_settings(mut self, settings: SettingsFile) -> Self {
        if let Some(prefix) = settings.prefix {
            self.prefix = prefix;
        }
        if let Some(deps_dir) = settings.deps_dir {
            self.deps_dir = deps_dir;
        }
        if let Some(bundled) = settings.bundled_dir {
            self.bundled_dir = Some(PathBuf::from(bundled));
        }
        if let Some(extra) = settings.extra_dirs {
            self.extra_dirs.extend(extra.into_iter().map(PathBuf::from));
        }
        if let Some(skip) = settings.skip_global {
            self.skip_global = skip;
        }
        if let Some(skip) = settings.skip_sibling {
            self.skip_sibling = skip;
        }
        if settings.env.is_some() {
            self.env = settings.env;
        }
        self
    }

    /// Base name of explicit config files
    #[must_use]
    pub fn config_name(&self) -> &str {
        self.config_name.as_deref().unwrap_or(&self.app_name)
    }

    /// Project dependency root
    #[must_use]
    pub fn deps_path(&self) -> PathBuf {
        self.project_dir.join(&self.deps_dir)
    }
}

/// Default global module cache: `~/.cache/<app>/modules`
#[must_use]
pub fn default_global_dir(app_name: &str) -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.cache_dir().join(app_name).join("modules"))
}

/// Default sibling root: the directory holding the host's install root
///
/// The install root is the parent of the directory containing the running
/// executable (`<root>/bin/<exe>`).
#[must_use]
pub fn default_sibling_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    sibling_dir_for(&exe)
}

fn sibling_dir_for(exe: &Path) -> Option<PathBuf> {
    exe.parent()?.parent()?.parent().map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_options_have_no_machine_roots() {
        let options = RuntimeOptions::local("plugkit", "/work/app");
        assert!(options.sibling_dir.is_none());
        assert!(options.global_dir.is_none());
        assert_eq!(options.prefix, "plugkit");
        assert_eq!(options.config_name(), "plugkit");
        assert_eq!(options.deps_path(), PathBuf::from("/work/app/modules"));
    }

    #[test]
    fn test_settings_overlay() {
        let settings = SettingsFile {
            prefix: Some("acme".to_string()),
            deps_dir: Some("vendor".to_string()),
            extra_dirs: Some(vec!["/opt/mods".to_string()]),
            skip_sibling: Some(true),
            ..SettingsFile::default()
        };

        let options = RuntimeOptions::local("plugkit", "/work/app").with_settings(settings);
        assert_eq!(options.prefix, "acme");
        assert_eq!(options.deps_path(), PathBuf::from("/work/app/vendor"));
        assert_eq!(options.extra_dirs, vec![PathBuf::from("/opt/mods")]);
        assert!(options.skip_sibling);
        assert!(!options.skip_global);
    }

    #[test]
    fn test_sibling_dir_from_exe_layout() {
        let exe = Path::new("/opt/tools/plugkit/bin/plugkit");
        assert_eq!(sibling_dir_for(exe), Some(PathBuf::from("/opt/tools")));
    }
}
