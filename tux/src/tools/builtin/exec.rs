//! exec_script / run_command tools - run inside the sandbox with a timeout

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::sandbox::Invocation;
use crate::tools::{Param, ParamType, Tool, ToolContext, ToolError, ToolKind, decode_args};

/// Output beyond this many characters is cut off
const MAX_OUTPUT_CHARS: usize = 30_000;

const SCRIPT_PARAMS: &[Param] = &[Param {
    name: "path",
    ty: ParamType::String,
    description: "Script path relative to the sandbox working directory",
    required: true,
}];

const COMMAND_PARAMS: &[Param] = &[Param {
    name: "command",
    ty: ParamType::String,
    description: "Shell command line, run with sh -c in the working directory",
    required: true,
}];

#[derive(Debug, Deserialize)]
struct ScriptArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct CommandArgs {
    command: String,
}

/// Execute a script file inside the sandbox
pub struct ExecScriptTool;

#[async_trait]
impl Tool for ExecScriptTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ExecScript
    }

    fn description(&self) -> &'static str {
        "Execute a script inside the sandbox. The path is relative to the working directory; make it executable with chmod_x first."
    }

    fn parameters(&self) -> &'static [Param] {
        SCRIPT_PARAMS
    }

    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: ScriptArgs = decode_args(args)?;
        debug!(path = %args.path, "ExecScriptTool::execute: called");

        let full_path = ctx.resolve_path(&args.path)?;
        if !full_path.is_file() {
            debug!(?full_path, "ExecScriptTool::execute: script missing");
            return Err(ToolError::NotFound { path: args.path });
        }

        let relative = full_path
            .strip_prefix(ctx.root()?)
            .map_err(|_| ToolError::SandboxViolation {
                path: full_path.clone(),
                workdir: ctx.workdir.clone(),
            })?
            .to_path_buf();

        run_in_sandbox(ctx, Invocation::Script(relative)).await
    }
}

/// Execute an arbitrary shell command inside the sandbox
pub struct RunCommandTool;

#[async_trait]
impl Tool for RunCommandTool {
    fn kind(&self) -> ToolKind {
        ToolKind::RunCommand
    }

    fn description(&self) -> &'static str {
        "Run a shell command inside the sandbox working directory. Output is captured; long-running commands are killed after the timeout."
    }

    fn parameters(&self) -> &'static [Param] {
        COMMAND_PARAMS
    }

    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: CommandArgs = decode_args(args)?;
        debug!(command = %args.command, "RunCommandTool::execute: called");

        if args.command.trim().is_empty() {
            return Err(ToolError::InvalidArguments("command is empty".to_string()));
        }

        run_in_sandbox(ctx, Invocation::Shell(args.command)).await
    }
}

/// Spawn the invocation, bounded by the context's exec timeout
///
/// Stderr, when present, is reported in its own section ahead of stdout.
/// A non-zero exit becomes `CommandFailed` carrying the same text.
async fn run_in_sandbox(ctx: &ToolContext, invocation: Invocation) -> Result<String, ToolError> {
    debug!(?invocation, timeout = ?ctx.exec_timeout, "run_in_sandbox: called");
    let mut cmd = ctx.sandbox.command(&invocation);
    cmd.stdin(Stdio::null()).kill_on_drop(true);

    let output = match tokio::time::timeout(ctx.exec_timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            debug!(status = ?output.status, "run_in_sandbox: completed");
            output
        }
        Ok(Err(e)) => {
            debug!(%e, "run_in_sandbox: failed to spawn");
            return Err(e.into());
        }
        Err(_) => {
            debug!("run_in_sandbox: timed out");
            return Err(ToolError::Timeout {
                timeout_secs: ctx.exec_timeout.as_secs(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let (stdout, stderr) = (stdout.trim_end(), stderr.trim_end());
    debug!(stdout_len = %stdout.len(), stderr_len = %stderr.len(), "run_in_sandbox: output lengths");

    let text = if stderr.is_empty() {
        stdout.to_string()
    } else {
        format!("STDERR:\n{}\n\nSTDOUT:\n{}", stderr, stdout)
    };
    let text = truncate_output(text);

    if output.status.success() {
        Ok(text)
    } else {
        Err(ToolError::CommandFailed {
            code: output.status.code().unwrap_or(-1),
            output: text,
        })
    }
}

fn truncate_output(text: String) -> String {
    match text.char_indices().nth(MAX_OUTPUT_CHARS) {
        Some((cut, _)) => {
            debug!("truncate_output: truncating long output");
            format!("{}...\n[truncated, {} chars total]", &text[..cut], text.chars().count())
        }
        None => text,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sandbox::LocalSandbox;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn ctx(dir: &std::path::Path) -> ToolContext {
        ToolContext::new(dir.to_path_buf(), Arc::new(LocalSandbox::new(dir.to_path_buf())))
    }

    fn arg(key: &str, value: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_string(), Value::String(value.to_string()));
        map
    }

    #[tokio::test]
    async fn test_run_command_stdout() {
        let temp = tempdir().unwrap();

        let out = RunCommandTool
            .execute(arg("command", "echo hello"), &ctx(temp.path()))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_run_command_stderr_is_separate() {
        let temp = tempdir().unwrap();

        let out = RunCommandTool
            .execute(arg("command", "echo out; echo warn >&2"), &ctx(temp.path()))
            .await
            .unwrap();
        assert_eq!(out, "STDERR:\nwarn\n\nSTDOUT:\nout");
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit() {
        let temp = tempdir().unwrap();

        let result = RunCommandTool
            .execute(arg("command", "echo bad >&2; exit 3"), &ctx(temp.path()))
            .await;
        match result {
            Err(ToolError::CommandFailed { code, output }) => {
                assert_eq!(code, 3);
                assert!(output.contains("bad"));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_command_timeout() {
        let temp = tempdir().unwrap();
        let ctx = ctx(temp.path()).with_exec_timeout(Duration::from_secs(1));

        let result = RunCommandTool.execute(arg("command", "sleep 5"), &ctx).await;
        assert!(matches!(result, Err(ToolError::Timeout { timeout_secs: 1 })));
    }

    #[tokio::test]
    async fn test_run_command_runs_in_workdir() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("here.txt"), "").unwrap();

        let out = RunCommandTool
            .execute(arg("command", "ls"), &ctx(temp.path()))
            .await
            .unwrap();
        assert!(out.contains("here.txt"));
    }

    #[tokio::test]
    async fn test_exec_script() {
        let temp = tempdir().unwrap();
        let script = temp.path().join("bin/hello.sh");
        fs::create_dir_all(script.parent().unwrap()).unwrap();
        fs::write(&script, "#!/bin/sh\necho from script\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let out = ExecScriptTool
            .execute(arg("path", "bin/hello.sh"), &ctx(temp.path()))
            .await
            .unwrap();
        assert_eq!(out, "from script");
    }

    #[tokio::test]
    async fn test_exec_script_relative_workdir() {
        let temp = tempfile::Builder::new().prefix("rel_wd").tempdir_in(".").unwrap();
        let relative = std::path::PathBuf::from(".").join(temp.path().file_name().unwrap());
        let script = relative.join("hello.sh");
        fs::write(&script, "#!/bin/sh\necho relative ok\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let out = ExecScriptTool.execute(arg("path", "hello.sh"), &ctx(&relative)).await.unwrap();
        assert_eq!(out, "relative ok");
    }

    #[tokio::test]
    async fn test_exec_script_missing() {
        let temp = tempdir().unwrap();

        let result = ExecScriptTool.execute(arg("path", "nope.sh"), &ctx(temp.path())).await;
        assert!(matches!(result, Err(ToolError::NotFound { .. })));
    }

    #[test]
    fn test_truncate_output_on_char_boundary() {
        let long = "é".repeat(MAX_OUTPUT_CHARS + 10);
        let out = truncate_output(long);

        assert!(out.starts_with(&"é".repeat(MAX_OUTPUT_CHARS)));
        assert!(out.ends_with(&format!("[truncated, {} chars total]", MAX_OUTPUT_CHARS + 10)));
    }

    #[test]
    fn test_truncate_output_short_untouched() {
        assert_eq!(truncate_output("short".to_string()), "short");
    }
}
