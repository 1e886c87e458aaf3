//! Hook execution via subprocess

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::types::HookContext;
use super::value::HookCallable;
use crate::HookError;

/// A hook export backed by an executable file
///
/// The handler receives the [`HookContext`] as JSON on stdin and writes its
/// JSON result to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHandler {
    /// Handler file
    pub program: PathBuf,
    /// Extra arguments after the handler path
    pub args: Vec<String>,
    /// Working directory (the owning module's root)
    pub working_dir: PathBuf,
}

impl CommandHandler {
    /// Create a command handler
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl HookCallable for CommandHandler {
    async fn call(&self, ctx: HookContext) -> Result<Value, HookError> {
        execute_handler(&self.program, &self.args, &self.working_dir, &ctx).await
    }
}

/// Execute a hook handler
///
/// Passes the context as JSON on stdin, expects JSON on stdout. Empty output
/// means `null`; a non-zero exit status is a failure.
///
/// # Errors
///
/// Returns error if the handler cannot be spawned, exits unsuccessfully or
/// prints something that is not JSON
pub async fn execute_handler(
    handler_path: &Path,
    extra_args: &[String],
    working_dir: &Path,
    ctx: &HookContext,
) -> Result<Value, HookError> {
    let payload = serde_json::to_string(ctx)
        .map_err(|e| HookError::new(format!("failed to serialize context: {e}")))?;

    let (program, mut args) = determine_executor(handler_path)?;
    args.extend(extra_args.iter().cloned());

    let mut child = Command::new(&program)
        .args(&args)
        .current_dir(working_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| HookError::new(format!("failed to spawn hook: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        // A handler that never reads stdin may close it early
        if let Err(e) = stdin.write_all(payload.as_bytes()).await {
            tracing::debug!(hook = %handler_path.display(), error = %e, "hook closed stdin early");
        }
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| HookError::new(format!("hook execution failed: {e}")))?;

    if !output.stderr.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(hook = %handler_path.display(), stderr = %stderr, "hook stderr");
    }

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        return Err(HookError::new(format!("hook exited with code {code}")));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&stdout)
        .map_err(|e| HookError::new(format!("failed to parse hook output: {e}")))
}

/// Determine how to execute the handler based on extension
fn determine_executor(handler_path: &Path) -> Result<(String, Vec<String>), HookError> {
    let extension = handler_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let path_str = handler_path
        .to_str()
        .ok_or_else(|| HookError::new("invalid handler path"))?
        .to_string();

    match extension {
        "py" => Ok(("python3".to_string(), vec![path_str])),
        "js" => Ok(("node".to_string(), vec![path_str])),
        "ts" => Ok(("bun".to_string(), vec!["run".to_string(), path_str])),
        "rb" => Ok(("ruby".to_string(), vec![path_str])),
        "sh" => Ok(("bash".to_string(), vec![path_str])),
        // Executable binary or script with shebang
        "" => Ok((path_str, vec![])),
        _ => Err(HookError::new(format!("unknown handler extension: .{extension}"))),
    }
}
