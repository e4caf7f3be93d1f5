//! write_file tool - create a new file, never overwriting

use std::io::ErrorKind;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::tools::{Param, ParamType, Tool, ToolContext, ToolError, ToolKind, decode_args};

const PARAMS: &[Param] = &[
    Param {
        name: "path",
        ty: ParamType::String,
        description: "File path relative to the sandbox working directory",
        required: true,
    },
    Param {
        name: "contents",
        ty: ParamType::String,
        description: "Text to write verbatim",
        required: true,
    },
];

#[derive(Debug, Deserialize)]
struct Args {
    path: String,
    contents: String,
}

/// Create a file with the given contents
///
/// The open uses create-new semantics, so an existing file (or a symlink in
/// its place) is refused by the OS and never touched.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WriteFile
    }

    fn description(&self) -> &'static str {
        "Write a new file to the sandbox. Provide path and contents. Existing files are never overwritten."
    }

    fn parameters(&self) -> &'static [Param] {
        PARAMS
    }

    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: Args = decode_args(args)?;
        debug!(path = %args.path, len = %args.contents.len(), "WriteFileTool::execute: called");

        let full_path = ctx.resolve_path(&args.path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(?full_path, "WriteFileTool::execute: refusing to overwrite");
                return Err(ToolError::AlreadyExists { path: args.path });
            }
            Err(e) => {
                debug!(%e, "WriteFileTool::execute: open failed");
                return Err(e.into());
            }
        };

        file.write_all(args.contents.as_bytes()).await?;
        file.flush().await?;

        debug!("WriteFileTool::execute: file created");
        Ok(format!("File created: {} ({} bytes)", args.path, args.contents.len()))
    }
}
