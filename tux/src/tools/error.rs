//! Tool error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during tool execution
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Path {path} escapes the sandbox directory {workdir}")]
    SandboxViolation { path: PathBuf, workdir: PathBuf },

    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Refused: file already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Exit code: {code}\n{output}")]
    CommandFailed { code: i32, output: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
