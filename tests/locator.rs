//! Module locator integration tests

use plugkit::{Error, Runtime};

mod common;
use common::Fixture;

const NAME: &str = "plugkit-plugin-shared";

#[test]
fn test_later_roots_override_earlier_ones() {
    let fx = Fixture::new();
    let roots = ["bundled", "sibling", "global", "project/modules", "extra"];
    for root in roots {
        fx.module(root, NAME);
    }

    // Peel roots off from the back: each time the next-later root wins
    for (i, root) in roots.iter().enumerate().rev() {
        let runtime = fx.runtime();
        let located = runtime.locate();
        assert_eq!(located.get(NAME), Some(&fx.path(root).join(NAME)), "root {root}");

        if i > 0 {
            std::fs::remove_dir_all(fx.path(root).join(NAME)).unwrap();
        }
    }
}

#[test]
fn test_self_project_wins_over_extra_dirs() {
    let fx = Fixture::new();
    fx.module("extra", "plugkit-plugin-host");
    fx.write(
        "project/Cargo.toml",
        "[package]\nname = \"plugkit-plugin-host\"\nversion = \"0.1.0\"\n",
    );

    let located = fx.runtime().locate();
    assert_eq!(located.get("plugkit-plugin-host"), Some(&fx.project()));
}

#[test]
fn test_global_cache_wins_over_sibling_install() {
    let fx = Fixture::new();
    fx.module("sibling", NAME);
    let global = fx.module("global", NAME);

    let located = fx.runtime().locate();
    assert_eq!(located.get(NAME), Some(&global));
}

#[test]
fn test_skip_flags_remove_only_their_root() {
    let fx = Fixture::new();
    let sibling = fx.module("sibling", NAME);
    fx.module("global", NAME);
    fx.module("bundled", "plugkit-plugin-bundled");
    fx.dep("plugkit-plugin-dep");

    let mut options = fx.options();
    options.skip_global = true;
    let located = Runtime::new(options).unwrap().locate();
    assert_eq!(located.get(NAME), Some(&sibling));
    assert!(located.contains_key("plugkit-plugin-bundled"));
    assert!(located.contains_key("plugkit-plugin-dep"));

    let mut options = fx.options();
    options.skip_global = true;
    options.skip_sibling = true;
    let located = Runtime::new(options).unwrap().locate();
    assert!(!located.contains_key(NAME));
    assert_eq!(located.len(), 2);
}

#[test]
fn test_locate_is_deterministic_across_cache_clear() {
    let fx = Fixture::new();
    for name in ["plugkit-plugin-c", "plugkit-plugin-a", "plugkit-plugin-b"] {
        fx.dep(name);
    }
    fx.module("bundled", "plugkit-plugin-z");
    fx.module("project/modules/@acme", "plugkit-plugin-scoped");

    let runtime = fx.runtime();
    let first = runtime.locate();
    runtime.clear_cache();
    let second = runtime.locate();

    assert_eq!(first, second);
    assert_eq!(
        first.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![
            "plugkit-plugin-z",
            "@acme/plugkit-plugin-scoped",
            "plugkit-plugin-a",
            "plugkit-plugin-b",
            "plugkit-plugin-c",
        ]
    );
}

#[test]
fn test_cache_holds_until_cleared_unless_disabled() {
    let fx = Fixture::new();
    fx.dep("plugkit-plugin-a");

    let cached = fx.runtime();
    let mut options = fx.options();
    options.no_cache = true;
    let uncached = Runtime::new(options).unwrap();

    assert_eq!(cached.locate().len(), 1);
    assert_eq!(uncached.locate().len(), 1);

    fx.dep("plugkit-plugin-b");
    assert_eq!(cached.locate().len(), 1);
    assert_eq!(uncached.locate().len(), 2);

    cached.clear_cache();
    assert_eq!(cached.locate().len(), 2);
}

#[test]
fn test_invalid_prefix_is_fatal_before_scanning() {
    let fx = Fixture::new();
    let mut options = fx.options();
    options.prefix = "Not Valid".to_string();

    let err = Runtime::new(options).unwrap_err();
    assert!(matches!(err, Error::InvalidPrefix(ref p) if p == "Not Valid"));
}

#[test]
fn test_custom_prefix_changes_matches() {
    let fx = Fixture::new();
    fx.dep("plugkit-plugin-a");
    fx.dep("acme-plugin-b");

    let mut options = fx.options();
    options.prefix = "acme".to_string();
    let located = Runtime::new(options).unwrap().locate();
    assert_eq!(located.keys().collect::<Vec<_>>(), vec!["acme-plugin-b"]);
}
