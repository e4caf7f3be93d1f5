//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::{Config, SandboxRuntime};

/// Tux Copilot - chat with a local model that acts inside a sandbox
#[derive(Debug, Parser)]
#[command(
    name = "tux",
    about = "Chat with a local model that reads, writes and runs files inside a sandboxed container",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Model identifier sent to the endpoint
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Chat Completions endpoint URL
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// Host directory shared with the sandbox
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Run commands on the host instead of in a Docker container
    #[arg(long, global = true)]
    pub local: bool,

    /// Subcommand to execute (defaults to chat)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Apply flag overrides on top of file and environment configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        debug!("Cli::apply_overrides: called");
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(url) = &self.url {
            config.llm.url = url.clone();
        }
        if let Some(workdir) = &self.workdir {
            config.sandbox.workdir = workdir.clone();
        }
        if self.local {
            config.sandbox.runtime = SandboxRuntime::Local;
        }
    }
}

/// CLI subcommands
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start an interactive chat session (default)
    Chat,

    /// Print the tool catalog advertised to the model, as JSON
    Tools,

    /// Drive the sandbox lifecycle directly
    Sandbox {
        #[command(subcommand)]
        command: SandboxCommand,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum SandboxCommand {
    /// Build the sandbox image
    Build,

    /// Start the sandbox container
    Start,

    /// Stop and remove the sandbox container
    Stop,

    /// Show whether the image and container exist
    Status,
}

/// Result of checking a program the sandbox needs
pub struct ProgramCheck {
    pub name: &'static str,
    pub available: bool,
    pub version: Option<String>,
}

impl ProgramCheck {
    /// Check if a program is runnable and get its version
    pub fn check(name: &'static str, version_args: &[&str]) -> Self {
        debug!(name, ?version_args, "ProgramCheck::check: called");
        match std::process::Command::new(name).args(version_args).output() {
            Ok(output) if output.status.success() => {
                let version = parse_version(&String::from_utf8_lossy(&output.stdout));
                debug!(name, %version, "ProgramCheck::check: available");
                Self {
                    name,
                    available: true,
                    version: Some(version),
                }
            }
            _ => {
                debug!(name, "ProgramCheck::check: not available");
                Self {
                    name,
                    available: false,
                    version: None,
                }
            }
        }
    }
}

/// First version-like word in command output ("Docker version 27.3.1, build" -> "27.3.1")
fn parse_version(output: &str) -> String {
    for word in output.split_whitespace() {
        let word = word.trim_start_matches('v');
        if word.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            let version: String = word.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            let version = version.trim_end_matches('.');
            if !version.is_empty() {
                return version.to_string();
            }
        }
    }
    "unknown".to_string()
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tuxcopilot")
        .join("logs")
        .join("tuxcopilot.log")
}

/// After-help text: sandbox prerequisites and where logs go
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let mut help = String::from("Required Programs:\n");
    for program in [ProgramCheck::check("docker", &["--version"])] {
        let icon = if program.available { "\u{2705}" } else { "\u{274C}" };
        let version = program.version.as_deref().unwrap_or("not found (use --local)");
        help.push_str(&format!("  {} {:<10} {}\n", icon, program.name, version));
    }

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["tux"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.local);
    }

    #[test]
    fn test_sandbox_subcommand() {
        let cli = Cli::try_parse_from(["tux", "sandbox", "status"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Sandbox {
                command: SandboxCommand::Status
            })
        );
    }

    #[test]
    fn test_overrides_apply_last() {
        let cli = Cli::try_parse_from([
            "tux",
            "--model",
            "qwen3-coder",
            "--url",
            "http://gpu-box:8080/v1/chat/completions",
            "--workdir",
            "/tmp/play",
            "--local",
            "chat",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.llm.model, "qwen3-coder");
        assert_eq!(config.llm.url, "http://gpu-box:8080/v1/chat/completions");
        assert_eq!(config.sandbox.workdir, PathBuf::from("/tmp/play"));
        assert_eq!(config.sandbox.runtime, SandboxRuntime::Local);
        assert_eq!(cli.command, Some(Command::Chat));
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("Docker version 27.3.1, build ce12230"), "27.3.1");
        assert_eq!(parse_version("podman v5.0.0"), "5.0.0");
        assert_eq!(parse_version("no digits here"), "unknown");
    }
}
