//! Host-process sandbox
//!
//! Runs commands directly on the host with the working directory as cwd.
//! Offers no isolation beyond the path checks the file tools perform.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{Invocation, Sandbox, SandboxError, SandboxState};

#[derive(Debug, Clone)]
pub struct LocalSandbox {
    workdir: PathBuf,
}

impl LocalSandbox {
    /// Relative workdirs are anchored to the current directory here, since
    /// children chdir into the workdir before the program path is resolved
    pub fn new(workdir: PathBuf) -> Self {
        debug!(?workdir, "LocalSandbox::new: called");
        let workdir = std::path::absolute(&workdir).unwrap_or(workdir);
        Self { workdir }
    }
}

#[async_trait]
impl Sandbox for LocalSandbox {
    async fn image_exists(&self) -> bool {
        true
    }

    async fn build_image(&self) -> Result<(), SandboxError> {
        Ok(())
    }

    async fn start_container(&self) -> Result<(), SandboxError> {
        debug!(workdir = ?self.workdir, "LocalSandbox::start_container: called");
        tokio::fs::create_dir_all(&self.workdir).await?;
        info!("Local sandbox ready at {:?}", self.workdir);
        Ok(())
    }

    async fn stop_container(&self) {
        debug!("LocalSandbox::stop_container: nothing to stop");
    }

    async fn state(&self) -> SandboxState {
        if self.workdir.is_dir() {
            SandboxState::Running
        } else {
            SandboxState::Absent
        }
    }

    fn command(&self, invocation: &Invocation) -> Command {
        debug!(?invocation, "LocalSandbox::command: called");
        let mut cmd = match invocation {
            Invocation::Script(path) => Command::new(self.workdir.join(path)),
            Invocation::Shell(line) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                cmd
            }
        };
        cmd.current_dir(&self.workdir);
        cmd
    }
}
