//! Command extension integration tests

use std::path::{Path, PathBuf};

use plugkit::{CommandEntry, Runtime};

mod common;
use common::Fixture;

type Registered = Vec<(PathBuf, Vec<String>)>;

fn run_extend(runtime: &Runtime, path: &str, namespace: &str, base: &Path) -> Registered {
    let mut seen = Registered::new();
    let mut registrar = |dir: &Path, entries: Vec<CommandEntry>| {
        seen.push((dir.to_path_buf(), entries.into_iter().map(|e| e.name).collect()));
    };
    runtime.extend(path, namespace, &mut registrar, base);
    seen
}

#[test]
fn test_base_then_modules_then_host() {
    let fx = Fixture::new();

    let custom = fx.dep("plugkit-plugin-custom");
    Fixture::module_file(&custom, "plugkit.toml", "extend-dir = \"contrib\"\n");
    Fixture::module_file(&custom, "contrib/cli/commands/db/seed.toml", "description = \"seed\"\n");

    // No manifest: the conventional extend/ directory is picked up
    let conventional = fx.dep("plugkit-plugin-conventional");
    Fixture::module_file(&conventional, "extend/cli/commands/db/dump.toml", "");

    // Declares an extend dir with nothing for this path
    let unrelated = fx.dep("plugkit-plugin-unrelated");
    Fixture::module_file(&unrelated, "extend/web/commands/db/serve.toml", "");

    fx.write("project/extend/cli/commands/db/reset.toml", "");

    let base = fx.path("builtin");
    let seen = run_extend(&fx.runtime(), "db", "cli", &base);

    assert_eq!(
        seen,
        vec![
            (base.join("db"), vec![]),
            (conventional.join("extend/cli/commands/db"), vec!["dump".to_string()]),
            (custom.join("contrib/cli/commands/db"), vec!["seed".to_string()]),
            (fx.project().join("extend/cli/commands/db"), vec!["reset".to_string()]),
        ]
    );
}

#[test]
fn test_host_extend_dir_is_configurable() {
    let fx = Fixture::new();
    fx.write("project/plugkit.toml", "extendDir = \"tools\"\n");
    fx.write("project/tools/cli/commands/build/fast.toml", "name = \"quick\"\n");
    fx.write("project/extend/cli/commands/build/ignored.toml", "");

    let base = fx.path("builtin");
    let seen = run_extend(&fx.runtime(), "build", "cli", &base);

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].0, fx.project().join("tools/cli/commands/build"));
    assert_eq!(seen[1].1, vec!["quick".to_string()]);
}

#[test]
fn test_disabled_commands_are_not_registered() {
    let fx = Fixture::new();
    fx.write("builtin/deploy/now.toml", "description = \"deploy now\"\n");
    fx.write("builtin/deploy/later.yaml", "disabled: true\n");
    fx.write("builtin/deploy/broken.json", "{");

    let base = fx.path("builtin");
    let seen = run_extend(&fx.runtime(), "deploy", "cli", &base);

    assert_eq!(seen, vec![(base.join("deploy"), vec!["now".to_string()])]);
}
