//! read_file tool - read a text file from the working directory

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

/// Read file contents as UTF-8 text
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadFile
    }

    fn description(&self) -> &'static str {
        "Read the contents of a file inside the sandbox. Provide path."
    }

    fn parameters(&self) -> &'static [Param] {
        PARAMS
    }

    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: Args = decode_args(args)?;
        debug!(path = %args.path, "ReadFileTool::execute: called");

        let full_path = ctx.resolve_path(&args.path)?;
        if !full_path.is_file() {
            debug!(?full_path, "ReadFileTool::execute: not a file");
            return Err(ToolError::NotFound { path: args.path });
        }

        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => {
                debug!(len = %content.len(), "ReadFileTool::execute: read ok");
                Ok(content)
            }
            Err(e) => {
                debug!(%e, "ReadFileTool::execute: read failed");
                Err(ToolError::ReadError {
                    path: args.path,
                    source: e,
                })
            }
        }
    }
}
