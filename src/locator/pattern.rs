//! Module naming convention

use std::sync::LazyLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::{Error, Result};

/// A usable naming prefix: lower-case alphanumeric words joined by `.`, `_` or `-`
static PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$").expect("valid regex")
});

/// Default patterns; `{prefix}` is substituted
pub const DEFAULT_PATTERNS: &[&str] = &["{prefix}-plugin-*", "@*/{prefix}-plugin-*"];

/// Matches module names against the configured naming convention
#[derive(Debug, Clone)]
pub struct NamePattern {
    prefix: String,
    patterns: Vec<String>,
    globs: GlobSet,
}

impl NamePattern {
    /// Build the default patterns for `prefix`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPrefix` if the prefix is not a valid name segment
    pub fn new(prefix: &str) -> Result<Self> {
        Self::with_patterns(prefix, DEFAULT_PATTERNS)
    }

    /// Build custom patterns for `prefix`
    ///
    /// A `*` never crosses the `/` between a scope and its name.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPrefix` for a bad prefix, `Error::Config` for a
    /// pattern that is not a valid glob
    pub fn with_patterns<S: AsRef<str>>(prefix: &str, patterns: &[S]) -> Result<Self> {
        if !PREFIX_REGEX.is_match(prefix) {
            return Err(Error::InvalidPrefix(prefix.to_string()));
        }

        let patterns: Vec<String> = patterns
            .iter()
            .map(|p| p.as_ref().replace("{prefix}", prefix))
            .collect();

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| Error::Config(format!("invalid module pattern {pattern:?}: {e}")))?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid module patterns: {e}")))?;

        Ok(Self {
            prefix: prefix.to_string(),
            patterns,
            globs,
        })
    }

    /// The validated prefix
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Expanded patterns
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `name` (plain or `@scope/name`) follows the convention
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.globs.is_match(name)
    }
}
