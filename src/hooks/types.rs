//! Hook system types

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Prefix every canonical event name carries
pub const EVENT_PREFIX: &str = "hook_";

/// Separator between namespace and event
pub const NAMESPACE_SEPARATOR: char = ':';

/// Canonical form of an event name (`greet` and `hook_greet` both give `hook_greet`)
#[must_use]
pub fn canonical_event(event: &str) -> String {
    if event.starts_with(EVENT_PREFIX) {
        event.to_string()
    } else {
        format!("{EVENT_PREFIX}{event}")
    }
}

/// A parsed `[namespace:]event` hook name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookName {
    event: String,
    namespace: Option<String>,
}

impl HookName {
    /// Parse a hook name
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHookName` for more than one separator, an empty
    /// namespace or an empty event
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidHookName {
            name: name.to_string(),
            reason,
        };

        let mut parts = name.split(NAMESPACE_SEPARATOR);
        let (namespace, event) = match (parts.next(), parts.next(), parts.next()) {
            (Some(event), None, None) => (None, event),
            (Some(namespace), Some(event), None) => (Some(namespace), event),
            _ => return Err(invalid("more than one namespace separator")),
        };

        if namespace.is_some_and(str::is_empty) {
            return Err(invalid("empty namespace"));
        }
        if event.strip_prefix(EVENT_PREFIX).unwrap_or(event).is_empty() {
            return Err(invalid("empty event"));
        }

        Ok(Self {
            event: canonical_event(event),
            namespace: namespace.map(str::to_string),
        })
    }

    /// Canonical event (`hook_<event>`)
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Namespace, if the name was qualified
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}{NAMESPACE_SEPARATOR}{}", self.event),
            None => f.write_str(&self.event),
        }
    }
}

/// How handler results are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Shallow overwrite, later over earlier
    #[default]
    Assign,
    /// Deep merge, later over earlier
    Merge,
    /// Keyed by owner name
    Group,
    /// Ordered list of raw results
    Push,
    /// Last result wins outright
    Replace,
}

impl MergeMode {
    /// Name as used on the command line and in notices
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Merge => "merge",
            Self::Group => "group",
            Self::Push => "push",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for a single dispatch
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Merge algebra
    pub mode: MergeMode,
    /// Only these owners respond (when set)
    pub include: Option<Vec<String>>,
    /// These owners never respond; beats `include`
    pub exclude: Vec<String>,
    /// First handler failure aborts the dispatch
    pub strict: bool,
    /// Opaque data forwarded to every handler
    pub context: Value,
}

impl DispatchOptions {
    /// Options with the given merge mode
    #[must_use]
    pub fn new(mode: MergeMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Restrict responders to `owners`
    #[must_use]
    pub fn include<I, S>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(owners.into_iter().map(Into::into).collect());
        self
    }

    /// Exclude `owners` from responding
    #[must_use]
    pub fn exclude<I, S>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(owners.into_iter().map(Into::into));
        self
    }

    /// Abort on the first handler failure
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Forward `context` to handlers
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Whether `owner` passes the include/exclude filter
    #[must_use]
    pub fn admits(&self, owner: &str) -> bool {
        if self.exclude.iter().any(|o| o == owner) {
            return false;
        }
        self.include
            .as_ref()
            .is_none_or(|include| include.iter().any(|o| o == owner))
    }
}

/// Payload every handler receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookContext {
    /// Canonical event
    pub event: String,
    /// Namespace of the invocation
    pub namespace: Option<String>,
    /// Owner of the handler being called
    pub owner: String,
    /// Caller-supplied context
    pub context: Value,
}

/// One failed handler in a settle-all dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerFailure {
    /// Owner of the failing handler
    pub owner: String,
    /// Failure message
    pub error: String,
}

/// Result of a detailed dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedOutcome {
    /// Merge of every successful result
    pub result: Value,
    /// Every failure, in collection order
    pub failures: Vec<HandlerFailure>,
}

/// Lifecycle notification published for every dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchNotice {
    /// Handlers are about to be collected
    Before {
        /// Hook name as invoked
        hook: String,
        /// Merge mode in use
        mode: MergeMode,
    },
    /// A handler failed
    HandlerFailed {
        /// Hook name as invoked
        hook: String,
        /// Owner of the failing handler
        owner: String,
        /// Failure message
        error: String,
    },
    /// A merged result was produced
    After {
        /// Hook name as invoked
        hook: String,
        /// Merged result
        result: Value,
    },
    /// A strict dispatch was aborted
    Aborted {
        /// Hook name as invoked
        hook: String,
        /// The aborting error
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_namespaced() {
        let plain = HookName::parse("greet").unwrap();
        assert_eq!(plain.event(), "hook_greet");
        assert_eq!(plain.namespace(), None);

        let scoped = HookName::parse("cli:hook_greet").unwrap();
        assert_eq!(scoped.event(), "hook_greet");
        assert_eq!(scoped.namespace(), Some("cli"));
        assert_eq!(scoped.to_string(), "cli:hook_greet");
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        for name in ["a:b:c", ":greet", "cli:", "", "hook_"] {
            assert!(
                matches!(HookName::parse(name), Err(Error::InvalidHookName { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_exclude_beats_include() {
        let options = DispatchOptions::default()
            .include(["a", "b"])
            .exclude(["b"]);
        assert!(options.admits("a"));
        assert!(!options.admits("b"));
        assert!(!options.admits("c"));

        let open = DispatchOptions::default().exclude(["x"]);
        assert!(open.admits("anything"));
        assert!(!open.admits("x"));
    }

    #[test]
    fn test_merge_mode_serde_names() {
        assert_eq!(serde_json::to_value(MergeMode::Group).unwrap(), "group");
        assert_eq!(MergeMode::default(), MergeMode::Assign);
    }
}
