//! ToolContext - execution context for tools

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::ToolError;
use crate::sandbox::Sandbox;

/// Default wall-clock limit for one command or script
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(60);

/// Execution context shared by every tool call in a session
///
/// All file operations are confined to `workdir`. Commands run through the
/// `sandbox`, which sees the same directory at `mount_point` when it is a
/// container.
#[derive(Clone)]
pub struct ToolContext {
    /// Bounded working directory on the host
    pub workdir: PathBuf,

    /// Where the sandbox mounts `workdir`, if it differs from the host path
    pub mount_point: Option<PathBuf>,

    /// Isolated runtime that executes commands
    pub sandbox: Arc<dyn Sandbox>,

    /// Per-call limit for exec_script and run_command
    pub exec_timeout: Duration,
}

impl ToolContext {
    pub fn new(workdir: PathBuf, sandbox: Arc<dyn Sandbox>) -> Self {
        debug!(?workdir, "ToolContext::new: called");
        Self {
            workdir,
            mount_point: None,
            sandbox,
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
        }
    }

    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        debug!(?timeout, "ToolContext::with_exec_timeout: called");
        self.exec_timeout = timeout;
        self
    }

    pub fn with_mount_point(mut self, mount_point: PathBuf) -> Self {
        debug!(?mount_point, "ToolContext::with_mount_point: called");
        self.mount_point = Some(mount_point);
        self
    }

    /// Canonical form of the working directory
    pub fn root(&self) -> Result<PathBuf, ToolError> {
        Ok(self.workdir.canonicalize()?)
    }

    fn violation(&self, path: &Path) -> ToolError {
        ToolError::SandboxViolation {
            path: path.to_path_buf(),
            workdir: self.workdir.clone(),
        }
    }

    /// Resolve a model-supplied path to a host path inside the working directory
    ///
    /// Relative paths are taken from the working directory. Absolute paths are
    /// accepted only under the working directory or the sandbox mount point.
    /// `..` may not climb above the root, and the deepest existing ancestor
    /// must canonicalize inside the root so symlinks cannot lead out.
    pub fn resolve_path(&self, path: &str) -> Result<PathBuf, ToolError> {
        debug!(%path, "ToolContext::resolve_path: called");
        let root = self.root()?;
        let requested = Path::new(path);

        let relative = if requested.is_absolute() {
            let stripped = self
                .mount_point
                .as_deref()
                .and_then(|mp| requested.strip_prefix(mp).ok())
                .or_else(|| requested.strip_prefix(&root).ok())
                .or_else(|| requested.strip_prefix(&self.workdir).ok());
            match stripped {
                Some(rest) => rest.to_path_buf(),
                None => {
                    debug!("ToolContext::resolve_path: absolute path outside workdir");
                    return Err(self.violation(requested));
                }
            }
        } else {
            requested.to_path_buf()
        };

        let mut resolved = root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if resolved == root {
                        debug!("ToolContext::resolve_path: parent dir climbs above root");
                        return Err(self.violation(requested));
                    }
                    resolved.pop();
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(self.violation(requested));
                }
            }
        }

        let mut probe = Some(resolved.as_path());
        while let Some(candidate) = probe {
            if candidate.exists() {
                let canonical = candidate.canonicalize()?;
                if !canonical.starts_with(&root) {
                    debug!(?canonical, "ToolContext::resolve_path: symlink leads outside root");
                    return Err(self.violation(requested));
                }
                break;
            }
            probe = candidate.parent();
        }

        debug!(?resolved, "ToolContext::resolve_path: resolved");
        Ok(resolved)
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("workdir", &self.workdir)
            .field("mount_point", &self.mount_point)
            .field("exec_timeout", &self.exec_timeout)
            .finish()
    }
}
