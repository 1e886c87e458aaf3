//! Combined configuration across every module and the host

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::{Manifest, merge_into};

/// Merge of every module manifest plus the host's own manifest
///
/// `values` is the flattened view (host wins every conflict); `module_configs`
/// keeps each module's manifest as composed, keyed by module name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CombinedConfig {
    /// Flattened top-level configuration
    #[serde(flatten)]
    pub values: Manifest,

    /// Per-module manifests in locator precedence order
    #[serde(rename = "moduleConfigs")]
    pub module_configs: IndexMap<String, Manifest>,

    /// The host's own manifest, before merging
    #[serde(skip)]
    pub host: Manifest,
}

impl CombinedConfig {
    /// Deep-merge module manifests in the given order, then the host's last
    #[must_use]
    pub fn build<'a, I>(modules: I, host: Manifest) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Manifest)>,
    {
        let mut values = Manifest::new();
        let mut module_configs = IndexMap::new();

        for (name, manifest) in modules {
            merge_into(&mut values, manifest.clone());
            module_configs.insert(name.to_string(), manifest.clone());
        }

        merge_into(&mut values, host.clone());

        Self {
            values,
            module_configs,
            host,
        }
    }

    /// Top-level value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Top-level string value for `key`
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Manifest of one module as it was composed
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&Manifest> {
        self.module_configs.get(name)
    }

    /// JSON view: flattened values plus a `moduleConfigs` table
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = self.values.clone();
        let modules = self
            .module_configs
            .iter()
            .map(|(name, manifest)| (name.clone(), Value::Object(manifest.clone())))
            .collect();
        out.insert("moduleConfigs".to_string(), Value::Object(modules));
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: Value) -> Manifest {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_host_wins_and_module_configs_are_kept() {
        let a = manifest(json!({ "commandDir": "lib/commands", "only": "a" }));
        let host = manifest(json!({ "commandDir": "app/commands" }));

        let combined = CombinedConfig::build([("plugkit-plugin-a", &a)], host);
        assert_eq!(combined.get_str("commandDir"), Some("app/commands"));
        assert_eq!(combined.get_str("only"), Some("a"));
        assert_eq!(
            combined.module("plugkit-plugin-a").and_then(|m| m.get("commandDir")),
            Some(&json!("lib/commands"))
        );
    }

    #[test]
    fn test_later_modules_deep_merge_over_earlier() {
        let a = manifest(json!({ "features": { "x": true, "y": true } }));
        let b = manifest(json!({ "features": { "y": false } }));

        let combined = CombinedConfig::build([("a", &a), ("b", &b)], Manifest::new());
        assert_eq!(combined.get("features"), Some(&json!({ "x": true, "y": false })));
        assert_eq!(
            combined.module_configs.keys().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_to_value_includes_module_configs() {
        let a = manifest(json!({ "k": 1 }));
        let combined = CombinedConfig::build([("a", &a)], manifest(json!({ "k": 2 })));

        let value = combined.to_value();
        assert_eq!(value["k"], json!(2));
        assert_eq!(value["moduleConfigs"]["a"]["k"], json!(1));
        assert_eq!(serde_json::to_value(&combined).unwrap(), value);
    }
}
