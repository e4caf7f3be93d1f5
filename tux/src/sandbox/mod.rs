//! Isolated runtime collaborator
//!
//! The session only needs four lifecycle operations plus a way to build the
//! process that runs a command inside the boundary. Docker is the default
//! backend; the local backend runs on the host and exists for development.

mod docker;
mod local;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub use docker::DockerSandbox;
pub use local::LocalSandbox;

use crate::config::{SandboxConfig, SandboxRuntime};

/// Errors from image build or container start
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Failed to build sandbox image {image}: {reason}")]
    BuildFailed { image: String, reason: String },

    #[error("Failed to start sandbox {name}: {reason}")]
    StartFailed { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lifecycle of the isolated runtime as observed from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Absent,
    Built,
    Running,
    Stopped,
}

impl std::fmt::Display for SandboxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Built => write!(f, "built"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Something to run inside the sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Executable at a path relative to the sandbox working directory
    Script(PathBuf),
    /// Shell command line run with `sh -c`
    Shell(String),
}

/// The isolated execution environment
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Whether the image the sandbox runs from is available
    async fn image_exists(&self) -> bool;

    /// Build the image
    async fn build_image(&self) -> Result<(), SandboxError>;

    /// Start the runtime with the working directory mounted
    async fn start_container(&self) -> Result<(), SandboxError>;

    /// Stop and remove the runtime; best effort, never fails
    async fn stop_container(&self);

    /// Current lifecycle state
    async fn state(&self) -> SandboxState;

    /// Build the process that runs `invocation` inside the boundary
    ///
    /// The caller owns spawning, output capture and the timeout.
    fn command(&self, invocation: &Invocation) -> Command;
}

/// Create the sandbox backend named in configuration
pub fn create_sandbox(config: &SandboxConfig) -> Arc<dyn Sandbox> {
    debug!(runtime = %config.runtime, "create_sandbox: called");
    match config.runtime {
        SandboxRuntime::Docker => Arc::new(DockerSandbox::new(config.clone())),
        SandboxRuntime::Local => Arc::new(LocalSandbox::new(config.workdir.clone())),
    }
}

/// Run `body` with the sandbox up, tearing it down on every exit path
///
/// The image is built if missing and the container started before `body`
/// runs. `stop_container` runs exactly once afterwards, whether `body`
/// finished, failed, or lost the race against `interrupt`.
pub async fn with_sandbox<B, I>(sandbox: &dyn Sandbox, interrupt: I, body: B) -> eyre::Result<()>
where
    B: Future<Output = eyre::Result<()>>,
    I: Future<Output = ()>,
{
    debug!("with_sandbox: called");
    if !sandbox.image_exists().await {
        info!("Sandbox image missing, building it");
        sandbox.build_image().await?;
    }

    if let Err(e) = sandbox.start_container().await {
        warn!(error = %e, "with_sandbox: start failed, cleaning up");
        sandbox.stop_container().await;
        return Err(e.into());
    }

    let outcome = tokio::select! {
        result = body => result,
        _ = interrupt => {
            info!("Interrupted, tearing down sandbox");
            Ok(())
        }
    };

    sandbox.stop_container().await;
    debug!(ok = %outcome.is_ok(), "with_sandbox: sandbox stopped");
    outcome
}
