//! chmod_x tool - add the executable bits to a file

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::tools::{Param, ParamType, Tool, ToolContext, ToolError, ToolKind, decode_args};

const PARAMS: &[Param] = &[Param {
    name: "path",
    ty: ParamType::String,
    description: "File path relative to the sandbox working directory",
    required: true,
}];

#[derive(Debug, Deserialize)]
struct Args {
    path: String,
}

/// Equivalent of `chmod +x`; other permission bits are left alone
pub struct ChmodXTool;

#[async_trait]
impl Tool for ChmodXTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ChmodX
    }

    fn description(&self) -> &'static str {
        "Apply chmod +x to a file inside the sandbox working directory."
    }

    fn parameters(&self) -> &'static [Param] {
        PARAMS
    }

    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: Args = decode_args(args)?;
        debug!(path = %args.path, "ChmodXTool::execute: called");

        let full_path = ctx.resolve_path(&args.path)?;
        if !full_path.exists() {
            debug!(?full_path, "ChmodXTool::execute: missing");
            return Err(ToolError::NotFound { path: args.path });
        }

        set_executable(&full_path).await?;
        Ok(format!("chmod +x applied to {}", args.path))
    }
}

#[cfg(unix)]
async fn set_executable(path: &std::path::Path) -> Result<(), ToolError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    let mode = perms.mode() | 0o111;
    debug!(mode = %format!("{:o}", mode), "set_executable: applying");
    perms.set_mode(mode);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_executable(_path: &std::path::Path) -> Result<(), ToolError> {
    Err(ToolError::Unsupported("chmod_x"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sandbox::LocalSandbox;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn ctx(dir: &std::path::Path) -> ToolContext {
        ToolContext::new(dir.to_path_buf(), Arc::new(LocalSandbox::new(dir.to_path_buf())))
    }

    fn args(path: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("path".to_string(), Value::String(path.to_string()));
        map
    }

    #[tokio::test]
    async fn test_chmod_x_adds_exec_bits_only() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("run.sh");
        fs::write(&file, "#!/bin/sh\necho hi\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();

        ChmodXTool.execute(args("run.sh"), &ctx(temp.path())).await.unwrap();

        let mode = fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o751);
    }

    #[tokio::test]
    async fn test_chmod_x_not_found() {
        let temp = tempdir().unwrap();

        let result = ChmodXTool.execute(args("ghost.sh"), &ctx(temp.path())).await;
        assert!(matches!(result, Err(ToolError::NotFound { .. })));
    }
}
