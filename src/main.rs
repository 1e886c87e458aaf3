use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use plugkit::config::file::load_settings_file;
use plugkit::middleware::{apply_config_defaults, parse_assignments};
use plugkit::{APP_NAME, CommandEntry, DispatchOptions, MergeMode, Runtime, RuntimeOptions};

/// plugkit - Locate plugins, compose their config and dispatch hooks
#[derive(Parser)]
#[command(name = "plugkit", version, about)]
struct Cli {
    /// Host project directory (defaults to the current directory)
    #[arg(long, env = "PLUGKIT_PROJECT_DIR", global = true)]
    project_dir: Option<PathBuf>,

    /// Module naming prefix
    #[arg(long, env = "PLUGKIT_PREFIX", global = true)]
    prefix: Option<String>,

    /// Additional module root (repeatable)
    #[arg(long = "extra-dir", env = "PLUGKIT_EXTRA_DIRS", value_delimiter = ',', global = true)]
    extra_dirs: Vec<PathBuf>,

    /// Skip the per-user global module cache
    #[arg(long, env = "PLUGKIT_SKIP_GLOBAL", global = true)]
    skip_global: bool,

    /// Skip modules installed next to plugkit
    #[arg(long, env = "PLUGKIT_SKIP_SIBLING", global = true)]
    skip_sibling: bool,

    /// Re-scan on every lookup
    #[arg(long, env = "PLUGKIT_NO_CACHE", global = true)]
    no_cache: bool,

    /// Environment name selecting config overlays
    #[arg(long, env = "PLUGKIT_ENV", global = true)]
    env: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List located modules
    List,
    /// Print the combined configuration as JSON
    Config {
        /// Print only this module's manifest
        #[arg(long)]
        module: Option<String>,
        /// Override a value (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// Dispatch a hook and print the merged result
    Invoke {
        /// Hook name (`[namespace:]event`)
        hook: String,
        /// How results are merged
        #[arg(long, value_enum, default_value_t)]
        mode: MergeMode,
        /// Only these owners respond (repeatable)
        #[arg(long)]
        include: Vec<String>,
        /// These owners never respond (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Abort on the first handler failure
        #[arg(long)]
        strict: bool,
        /// Report every handler failure alongside the result
        #[arg(long)]
        detailed: bool,
        /// JSON context forwarded to handlers
        #[arg(long)]
        context: Option<String>,
    },
    /// Show command directories contributed to a command path
    Commands {
        /// Command path (e.g. "db/migrate")
        path: String,
        /// Extension namespace
        #[arg(long)]
        namespace: String,
        /// Base directory of built-in commands (defaults to `<project>/commands`)
        #[arg(long)]
        base: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,plugkit=info",
        1 => "info,plugkit=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    let mut options =
        RuntimeOptions::new(APP_NAME, project_dir).with_settings(load_settings_file(APP_NAME));
    if let Some(prefix) = cli.prefix {
        options.prefix = prefix;
    }
    options.extra_dirs.extend(cli.extra_dirs);
    options.skip_global |= cli.skip_global;
    options.skip_sibling |= cli.skip_sibling;
    options.no_cache = cli.no_cache;
    if cli.env.is_some() {
        options.env = cli.env;
    }

    let runtime = Runtime::new(options)?;
    runtime.initialize();

    let outcome = match cli.command {
        Command::List => {
            list(&runtime);
            Ok(())
        }
        Command::Config { module, set } => config(&runtime, module.as_deref(), &set),
        Command::Invoke {
            hook,
            mode,
            include,
            exclude,
            strict,
            detailed,
            context,
        } => {
            let mut dispatch = DispatchOptions::new(mode).exclude(exclude);
            if !include.is_empty() {
                dispatch = dispatch.include(include);
            }
            if strict {
                dispatch = dispatch.strict();
            }
            if let Some(raw) = context {
                let context: Value =
                    serde_json::from_str(&raw).context("--context is not valid JSON")?;
                dispatch = dispatch.with_context(context);
            }
            invoke(&runtime, &hook, &dispatch, detailed).await
        }
        Command::Commands {
            path,
            namespace,
            base,
        } => {
            let base = base.unwrap_or_else(|| runtime.options().project_dir.join("commands"));
            commands(&runtime, &path, &namespace, &base);
            Ok(())
        }
    };

    runtime.teardown();
    outcome
}

fn list(runtime: &Runtime) {
    for (name, path) in runtime.locate() {
        println!("{name}\t{}", path.display());
    }
}

fn config(runtime: &Runtime, module: Option<&str>, set: &[String]) -> anyhow::Result<()> {
    let combined = runtime.combined_config();

    let value = match module {
        Some(name) => {
            let manifest = combined
                .module(name)
                .with_context(|| format!("no module named {name:?}"))?;
            Value::Object(manifest.clone())
        }
        None if set.is_empty() => combined.to_value(),
        None => Value::Object(apply_config_defaults(&combined, parse_assignments(set)?)),
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn invoke(
    runtime: &Runtime,
    hook: &str,
    options: &DispatchOptions,
    detailed: bool,
) -> anyhow::Result<()> {
    let value = if detailed {
        serde_json::to_value(runtime.invoke_detailed(hook, options).await?)?
    } else {
        runtime.invoke_value(hook, options).await?
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn commands(runtime: &Runtime, path: &str, namespace: &str, base: &Path) {
    let mut found: Vec<(PathBuf, Vec<CommandEntry>)> = Vec::new();
    let mut registrar = |dir: &Path, entries: Vec<CommandEntry>| {
        found.push((dir.to_path_buf(), entries));
    };
    runtime.extend(path, namespace, &mut registrar, base);

    for (dir, entries) in found {
        println!("{}", dir.display());
        for entry in entries {
            match entry.description {
                Some(description) => println!("  {}\t{description}", entry.name),
                None => println!("  {}", entry.name),
            }
        }
    }
}
