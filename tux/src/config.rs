//! Tux Copilot configuration types and loading
//!
//! Configuration is built once in `main` (file, then `TUX_COPILOT_*`
//! environment overrides, then CLI flags) and passed down by reference.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "TUX_COPILOT_";

/// Operating instructions seeded as the system message
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Tux Copilot, a coding assistant. \
    You act only inside a sandboxed container; never try to modify the host system. \
    Ask for confirmation before anything destructive. \
    Do not print the contents of files you read unless the user asks for them. \
    Prefer one shell command per action instead of long chained command lines. \
    Keep answers clear and concise.";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inference endpoint configuration
    pub llm: LlmConfig,

    /// Isolated runtime configuration
    pub sandbox: SandboxConfig,

    /// Tool execution limits
    pub tools: ToolsConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Verbose logging shortcut (same as log-level DEBUG)
    pub debug: bool,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        debug!("Config::validate: called");
        let timeouts = [
            ("connect-timeout-secs", self.llm.connect_timeout_secs),
            ("read-timeout-secs", self.llm.read_timeout_secs),
            ("write-timeout-secs", self.llm.write_timeout_secs),
            ("pool-timeout-secs", self.llm.pool_timeout_secs),
        ];
        for (name, value) in timeouts {
            if !value.is_finite() || value <= 0.0 {
                return Err(eyre::eyre!("llm.{} must be a positive number, got {}", name, value));
            }
        }
        if self.llm.url.is_empty() {
            return Err(eyre::eyre!("llm.url must not be empty"));
        }
        if self.tools.exec_timeout_secs == 0 {
            return Err(eyre::eyre!("tools.exec-timeout-secs must be at least 1"));
        }
        if !self.sandbox.mount_point.starts_with('/') {
            return Err(eyre::eyre!(
                "sandbox.mount-point must be an absolute path, got {}",
                self.sandbox.mount_point
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .tuxcopilot.yml
        let local_config = PathBuf::from(".tuxcopilot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/tuxcopilot/tuxcopilot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tuxcopilot").join("tuxcopilot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `TUX_COPILOT_*` overrides
    ///
    /// Takes the variables explicitly (normally `std::env::vars()`) so the
    /// caller decides when process state is read.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        debug!("Config::apply_env: called");
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            debug!(%name, "Config::apply_env: applying override");
            match name {
                "LMSTUDIO_URL" => self.llm.url = value,
                "MODEL" => self.llm.model = value,
                "IMAGE" => self.sandbox.image = value,
                "CONTAINER" => self.sandbox.container = value,
                "SANDBOX_WORKDIR" => self.sandbox.workdir = PathBuf::from(value),
                "TIMEOUT_CONNECT" => self.llm.connect_timeout_secs = parse_secs(&key, &value)?,
                "TIMEOUT_READ" => self.llm.read_timeout_secs = parse_secs(&key, &value)?,
                "TIMEOUT_WRITE" => self.llm.write_timeout_secs = parse_secs(&key, &value)?,
                "TIMEOUT_POOL" => self.llm.pool_timeout_secs = parse_secs(&key, &value)?,
                "DEBUG" => {
                    let flag: i64 = value
                        .trim()
                        .parse()
                        .with_context(|| format!("{} must be 0 or 1, got '{}'", key, value))?;
                    self.debug = flag != 0;
                }
                _ => tracing::warn!("Ignoring unknown environment override {}", key),
            }
        }
        Ok(())
    }
}

fn parse_secs(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("{} must be a number of seconds, got '{}'", key, value))
}

/// Inference endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Full Chat Completions URL
    pub url: String,

    /// Model identifier
    pub model: String,

    /// Environment variable holding a bearer token (local servers need none)
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: f64,

    /// Generous by default: this covers the model thinking
    #[serde(rename = "read-timeout-secs")]
    pub read_timeout_secs: f64,

    #[serde(rename = "write-timeout-secs")]
    pub write_timeout_secs: f64,

    #[serde(rename = "pool-timeout-secs")]
    pub pool_timeout_secs: f64,

    /// System message seeded at session start
    #[serde(rename = "system-prompt")]
    pub system_prompt: String,

    /// Maximum tool rounds per user turn
    #[serde(rename = "max-tool-rounds")]
    pub max_tool_rounds: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:1234/v1/chat/completions".to_string(),
            model: "openai/gpt-oss-20b".to_string(),
            api_key_env: None,
            connect_timeout_secs: 60.0,
            read_timeout_secs: 300.0,
            write_timeout_secs: 60.0,
            pool_timeout_secs: 60.0,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_rounds: 8,
        }
    }
}

/// Which isolated runtime backs the sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxRuntime {
    /// Docker container with the working directory bind-mounted
    #[default]
    Docker,
    /// Host processes confined to the working directory (no isolation)
    Local,
}

impl std::fmt::Display for SandboxRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Docker => write!(f, "docker"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Isolated runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub runtime: SandboxRuntime,

    /// Image tag to build and run
    pub image: String,

    /// Container name
    pub container: String,

    /// Host directory mounted into the container
    pub workdir: PathBuf,

    /// Where the working directory appears inside the container
    #[serde(rename = "mount-point")]
    pub mount_point: String,

    /// Directory holding the Dockerfile
    #[serde(rename = "build-context")]
    pub build_context: PathBuf,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: SandboxRuntime::Docker,
            image: "tux-copilot:latest".to_string(),
            container: "tux_copilot".to_string(),
            workdir: PathBuf::from("./sandbox_workdir"),
            mount_point: "/workdir".to_string(),
            build_context: PathBuf::from("."),
        }
    }
}

/// Tool execution limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Wall-clock limit for exec_script / run_command
    #[serde(rename = "exec-timeout-secs")]
    pub exec_timeout_secs: u64,
}

impl ToolsConfig {
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { exec_timeout_secs: 60 }
    }
}
