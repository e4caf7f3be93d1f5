//! Docker-backed sandbox

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{Invocation, Sandbox, SandboxError, SandboxState};
use crate::config::SandboxConfig;

/// Sandbox running in a named Docker container
///
/// The host working directory is bind-mounted at `mount_point`; commands run
/// through `docker exec` with that directory as their cwd.
#[derive(Debug)]
pub struct DockerSandbox {
    config: SandboxConfig,
}

impl DockerSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        debug!(image = %config.image, container = %config.container, "DockerSandbox::new: called");
        Self { config }
    }

    /// Arguments for `docker run`, given the absolute host directory
    fn run_args(&self, host_dir: &std::path::Path) -> Vec<String> {
        vec![
            "run".to_string(),
            "--name".to_string(),
            self.config.container.clone(),
            "-dti".to_string(),
            "-v".to_string(),
            format!("{}:{}", host_dir.display(), self.config.mount_point),
            self.config.image.clone(),
        ]
    }

    /// Absolute in-container path for a script relative to the mount point
    fn script_path(&self, relative: &std::path::Path) -> String {
        let mut path = PathBuf::from(&self.config.mount_point);
        path.push(relative);
        path.to_string_lossy().into_owned()
    }

    /// Remove a container left behind by an earlier, interrupted session
    async fn remove_stale(&self) {
        let output = Command::new("docker")
            .args(["rm", "-f", self.config.container.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        debug!(?output, "DockerSandbox::remove_stale: done");
    }

    async fn container_running(&self) -> Option<bool> {
        let output = Command::new("docker")
            .args(["inspect", "-f", "{{.State.Running}}", self.config.container.as_str()])
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            debug!("DockerSandbox::container_running: no such container");
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim() == "true")
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    async fn image_exists(&self) -> bool {
        debug!(image = %self.config.image, "DockerSandbox::image_exists: called");
        match Command::new("docker")
            .args(["images", "-q", self.config.image.as_str()])
            .output()
            .await
        {
            Ok(output) => {
                let exists = output.status.success() && !String::from_utf8_lossy(&output.stdout).trim().is_empty();
                debug!(%exists, "DockerSandbox::image_exists: checked");
                exists
            }
            Err(e) => {
                warn!(error = %e, "DockerSandbox::image_exists: docker not runnable");
                false
            }
        }
    }

    async fn build_image(&self) -> Result<(), SandboxError> {
        debug!(image = %self.config.image, context = ?self.config.build_context, "DockerSandbox::build_image: called");
        info!("Building Docker image {}", self.config.image);

        // Build output goes straight to the terminal so the user sees progress
        let status = Command::new("docker")
            .arg("build")
            .arg("--no-cache")
            .arg("-t")
            .arg(&self.config.image)
            .arg(&self.config.build_context)
            .status()
            .await
            .map_err(|e| SandboxError::BuildFailed {
                image: self.config.image.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            debug!(?status, "DockerSandbox::build_image: docker build failed");
            return Err(SandboxError::BuildFailed {
                image: self.config.image.clone(),
                reason: format!("docker build exited with {}", status),
            });
        }

        info!("Built Docker image {}", self.config.image);
        Ok(())
    }

    async fn start_container(&self) -> Result<(), SandboxError> {
        debug!(container = %self.config.container, "DockerSandbox::start_container: called");
        tokio::fs::create_dir_all(&self.config.workdir).await?;
        let host_dir = tokio::fs::canonicalize(&self.config.workdir).await?;

        self.remove_stale().await;

        let output = Command::new("docker")
            .args(self.run_args(&host_dir))
            .output()
            .await
            .map_err(|e| SandboxError::StartFailed {
                name: self.config.container.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            debug!("DockerSandbox::start_container: docker run failed");
            return Err(SandboxError::StartFailed {
                name: self.config.container.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!("Started container {} with {:?} at {}", self.config.container, host_dir, self.config.mount_point);
        Ok(())
    }

    async fn stop_container(&self) {
        debug!(container = %self.config.container, "DockerSandbox::stop_container: called");
        for action in ["stop", "rm"] {
            let result = Command::new("docker")
                .args([action, self.config.container.as_str()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            match result {
                Ok(status) if status.success() => debug!(%action, "DockerSandbox::stop_container: ok"),
                Ok(status) => warn!(%action, ?status, "docker {} failed for {}", action, self.config.container),
                Err(e) => warn!(%action, error = %e, "docker {} could not run", action),
            }
        }
        info!("Stopped and removed container {}", self.config.container);
    }

    async fn state(&self) -> SandboxState {
        debug!("DockerSandbox::state: called");
        match self.container_running().await {
            Some(true) => SandboxState::Running,
            Some(false) => SandboxState::Stopped,
            None if self.image_exists().await => SandboxState::Built,
            None => SandboxState::Absent,
        }
    }

    fn command(&self, invocation: &Invocation) -> Command {
        debug!(?invocation, "DockerSandbox::command: called");
        let mut cmd = Command::new("docker");
        cmd.args(["exec", "-w", self.config.mount_point.as_str(), self.config.container.as_str()]);
        match invocation {
            Invocation::Script(path) => {
                cmd.arg(self.script_path(path));
            }
            Invocation::Shell(line) => {
                cmd.args(["sh", "-c", line.as_str()]);
            }
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_run_args_mount_workdir() {
        let sandbox = DockerSandbox::new(SandboxConfig::default());
        let run = sandbox.run_args(Path::new("/home/me/sandbox_workdir"));

        assert_eq!(
            run,
            vec![
                "run",
                "--name",
                "tux_copilot",
                "-dti",
                "-v",
                "/home/me/sandbox_workdir:/workdir",
                "tux-copilot:latest"
            ]
        );
    }

    #[test]
    fn test_exec_script_command() {
        let sandbox = DockerSandbox::new(SandboxConfig::default());
        let cmd = sandbox.command(&Invocation::Script(PathBuf::from("bin/hello.sh")));

        assert_eq!(cmd.as_std().get_program(), "docker");
        assert_eq!(args(&cmd), vec!["exec", "-w", "/workdir", "tux_copilot", "/workdir/bin/hello.sh"]);
    }

    #[test]
    fn test_shell_command() {
        let sandbox = DockerSandbox::new(SandboxConfig::default());
        let cmd = sandbox.command(&Invocation::Shell("ls -la | wc -l".to_string()));

        assert_eq!(args(&cmd), vec!["exec", "-w", "/workdir", "tux_copilot", "sh", "-c", "ls -la | wc -l"]);
    }
}
