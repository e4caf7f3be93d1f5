//! Interactive chat REPL
//!
//! Line input comes from rustyline; everything else is the session state
//! machine in [`session`].

mod session;

pub use session::{Session, SessionState};

use std::sync::Arc;

use eyre::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::config::{Config, SandboxRuntime};
use crate::llm::{ModelGateway, create_gateway};
use crate::render::TerminalRenderer;
use crate::sandbox::Sandbox;
use crate::tools::{ToolContext, ToolDispatcher, ToolRegistry};

/// One read from the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    Line(String),
    /// Ctrl-C
    Interrupted,
    /// Ctrl-D or closed stdin
    Eof,
}

/// Source of user input lines
pub trait Prompt {
    fn read_line(&mut self, prompt: &str) -> Result<PromptInput>;
}

/// Readline-backed prompt with in-memory history
pub struct RustylinePrompt {
    editor: DefaultEditor,
}

impl RustylinePrompt {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
        Ok(Self { editor })
    }
}

impl Prompt for RustylinePrompt {
    fn read_line(&mut self, prompt: &str) -> Result<PromptInput> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(PromptInput::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(PromptInput::Interrupted),
            Err(ReadlineError::Eof) => Ok(PromptInput::Eof),
            Err(err) => Err(eyre::eyre!("Readline error: {}", err)),
        }
    }
}

/// Build a session from configuration and run it against a started sandbox
///
/// This is the body of `tux chat`.
pub async fn run_interactive(config: &Config, sandbox: Arc<dyn Sandbox>, api_key: Option<String>) -> Result<()> {
    debug!(model = %config.llm.model, has_key = %api_key.is_some(), "run_interactive: called");
    let registry = ToolRegistry::standard();
    let gateway: Arc<dyn ModelGateway> = Arc::new(
        create_gateway(&config.llm, api_key, registry.catalog()).context("Failed to create model gateway")?,
    );

    let mut ctx = ToolContext::new(config.sandbox.workdir.clone(), sandbox).with_exec_timeout(config.tools.exec_timeout());
    if config.sandbox.runtime == SandboxRuntime::Docker {
        ctx = ctx.with_mount_point(config.sandbox.mount_point.clone().into());
    }

    let mut session = Session::new(
        gateway,
        ToolDispatcher::new(registry),
        ctx,
        &config.llm,
        Box::new(RustylinePrompt::new()?),
        Arc::new(TerminalRenderer),
    );
    session.run().await
}
