//! Session loop
//!
//! An explicit state machine over one conversation. Each call to
//! [`Session::step`] performs exactly one transition; [`Session::run`] steps
//! until the session terminates.

use std::sync::Arc;

use eyre::Result;
use tracing::{debug, info, warn};

use super::{Prompt, PromptInput};
use crate::config::LlmConfig;
use crate::conversation::{Conversation, ConversationError};
use crate::llm::{GatewayError, Message, ModelGateway, Reply, Role, ToolCallRequest};
use crate::render::{Render, RenderKind};
use crate::tools::{ToolContext, ToolDispatcher};

/// Words that end the session when typed on their own
const EXIT_WORDS: [&str; 3] = ["exit", "quit", "bye"];

/// Where the session loop is
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Not started yet
    Idle,

    /// Waiting for the user to type something
    AwaitingUserInput,

    /// A user message was appended; the model has not answered
    AwaitingModelReply,

    /// The model asked for these calls; `round` counts tool rounds this turn
    DispatchingTools { calls: Vec<ToolCallRequest>, round: u32 },

    /// Every call of the last round has a result; ask the model again
    AwaitingFollowup { round: u32 },

    /// Exit requested or input closed
    Terminating,
}

/// Interactive tool-dispatch session
pub struct Session {
    gateway: Arc<dyn ModelGateway>,
    dispatcher: ToolDispatcher,
    ctx: ToolContext,
    conversation: Conversation,
    prompt: Box<dyn Prompt>,
    renderer: Arc<dyn Render>,
    max_tool_rounds: u32,
    state: SessionState,
}

impl Session {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        dispatcher: ToolDispatcher,
        ctx: ToolContext,
        config: &LlmConfig,
        prompt: Box<dyn Prompt>,
        renderer: Arc<dyn Render>,
    ) -> Self {
        debug!(workdir = ?ctx.workdir, max_tool_rounds = %config.max_tool_rounds, "Session::new: called");
        Self {
            gateway,
            dispatcher,
            ctx,
            conversation: Conversation::with_system_prompt(&config.system_prompt),
            prompt,
            renderer,
            max_tool_rounds: config.max_tool_rounds.max(1),
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Run until the user exits or input closes
    ///
    /// Only a protocol violation (or a broken input stream) ends the session
    /// with an error; gateway and tool failures are shown and the loop goes on.
    pub async fn run(&mut self) -> Result<()> {
        debug!("Session::run: called");
        while self.state != SessionState::Terminating {
            self.step().await?;
        }
        self.renderer.render(RenderKind::Info, "Exiting cleanly...");
        info!("Session ended with {} messages", self.conversation.len());
        Ok(())
    }

    /// Perform one state transition
    pub async fn step(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, SessionState::Terminating);
        debug!(?state, "Session::step: called");

        self.state = match state {
            SessionState::Idle => {
                self.renderer.render(RenderKind::Banner, "Interactive chat started");
                self.renderer.render(
                    RenderKind::Info,
                    "Type your message and press ENTER. Ctrl-C, 'exit' or /quit to leave, /help for commands.",
                );
                SessionState::AwaitingUserInput
            }
            SessionState::AwaitingUserInput => self.read_input()?,
            SessionState::AwaitingModelReply => match self.complete().await {
                Ok(Reply::Text(text)) => self.accept_text(text)?,
                Ok(Reply::ToolRequest(calls)) => SessionState::DispatchingTools { calls, round: 1 },
                Err(e) => self.gateway_failed(e),
            },
            SessionState::DispatchingTools { calls, round } => {
                self.dispatch(&calls).await?;
                SessionState::AwaitingFollowup { round }
            }
            SessionState::AwaitingFollowup { round } => {
                if self.conversation.has_unanswered() {
                    return Err(ConversationError::ProtocolViolation(
                        "follow-up requested while tool calls are unanswered".to_string(),
                    )
                    .into());
                }
                match self.complete().await {
                    Ok(Reply::Text(text)) => self.accept_text(text)?,
                    Ok(Reply::ToolRequest(calls)) if round < self.max_tool_rounds => {
                        debug!(%round, "Session::step: model requested another tool round");
                        SessionState::DispatchingTools { calls, round: round + 1 }
                    }
                    Ok(Reply::ToolRequest(calls)) => {
                        warn!(%round, count = %calls.len(), "Tool round limit reached");
                        self.renderer.render(
                            RenderKind::Warning,
                            &format!(
                                "Model asked for {} more tool call(s) after {} rounds; ignoring them",
                                calls.len(),
                                round
                            ),
                        );
                        SessionState::AwaitingUserInput
                    }
                    Err(e) => self.gateway_failed(e),
                }
            }
            SessionState::Terminating => SessionState::Terminating,
        };

        Ok(())
    }

    fn read_input(&mut self) -> Result<SessionState> {
        let input = match self.prompt.read_line("You> ")? {
            PromptInput::Line(line) => line,
            PromptInput::Interrupted | PromptInput::Eof => {
                debug!("Session::read_input: input closed");
                return Ok(SessionState::Terminating);
            }
        };

        let input = input.trim();
        if input.is_empty() {
            return Ok(SessionState::AwaitingUserInput);
        }

        if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
            return Ok(SessionState::Terminating);
        }

        if input.starts_with('/') {
            return Ok(self.handle_slash_command(input));
        }

        self.conversation.append(Message::user(input))?;
        Ok(SessionState::AwaitingModelReply)
    }

    fn accept_text(&mut self, text: String) -> Result<SessionState> {
        debug!(len = %text.len(), "Session::accept_text: called");
        self.renderer.render(RenderKind::Assistant, &text);
        self.conversation.append(Message::assistant(text))?;
        Ok(SessionState::AwaitingUserInput)
    }

    fn gateway_failed(&self, error: GatewayError) -> SessionState {
        warn!(%error, "Model gateway call failed");
        self.renderer.render(RenderKind::Error, &error.to_string());
        SessionState::AwaitingUserInput
    }

    /// One gateway call, retried once if the endpoint was unavailable
    async fn complete(&self) -> Result<Reply, GatewayError> {
        debug!(messages = %self.conversation.len(), "Session::complete: called");
        match self.gateway.complete(self.conversation.snapshot()).await {
            Err(e) if e.is_retryable() => {
                self.renderer
                    .render(RenderKind::Warning, &format!("{}; retrying once", e));
                self.gateway.complete(self.conversation.snapshot()).await
            }
            other => other,
        }
    }

    async fn dispatch(&mut self, calls: &[ToolCallRequest]) -> Result<()> {
        debug!(count = %calls.len(), "Session::dispatch: called");
        let results = self
            .dispatcher
            .dispatch(calls, &mut self.conversation, &self.ctx)
            .await?;

        for (call, result) in calls.iter().zip(&results) {
            self.renderer
                .render(RenderKind::ToolCall, &format!("{} {}", call.name, serde_json::Value::Object(call.arguments.clone())));
            let kind = if result.outcome.is_failure() {
                RenderKind::ToolFailure
            } else {
                RenderKind::ToolSuccess
            };
            self.renderer.render(kind, &result.outcome.to_content());
        }
        Ok(())
    }

    fn handle_slash_command(&self, input: &str) -> SessionState {
        let cmd = input.split_whitespace().next().unwrap_or("");
        debug!(%cmd, "Session::handle_slash_command: called");

        match cmd {
            "/quit" | "/exit" | "/q" => return SessionState::Terminating,
            "/help" | "/h" => {
                self.renderer.render(
                    RenderKind::Info,
                    "Commands:\n  /help     Show this help\n  /tools    List the tools the model can call\n  /history  Show the conversation so far\n  /quit     Leave (also /exit, exit, quit, bye)",
                );
            }
            "/tools" => {
                let listing = self
                    .dispatcher
                    .registry()
                    .catalog()
                    .iter()
                    .map(|spec| format!("  {:12} {}", spec.name, spec.description))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.renderer.render(RenderKind::Info, &listing);
            }
            "/history" => self.render_history(),
            _ => {
                self.renderer
                    .render(RenderKind::Warning, &format!("Unknown command: {} (try /help)", cmd));
            }
        }
        SessionState::AwaitingUserInput
    }

    fn render_history(&self) {
        let messages = self.conversation.snapshot();
        if messages.is_empty() {
            self.renderer.render(RenderKind::Info, "No conversation history.");
            return;
        }

        let lines: Vec<String> = messages
            .iter()
            .enumerate()
            .map(|(i, msg)| {
                let summary = match (&msg.role, &msg.tool_calls) {
                    (Role::Assistant, Some(calls)) => {
                        let names: Vec<_> = calls.iter().map(|c| c.name.as_str()).collect();
                        format!("[calls {}]", names.join(", "))
                    }
                    _ => {
                        let preview: String = msg.content.chars().take(60).collect();
                        if msg.content.chars().count() > 60 {
                            format!("{}...", preview)
                        } else {
                            preview
                        }
                    }
                };
                format!("  {}. {}: {}", i + 1, msg.role, summary.replace('\n', " "))
            })
            .collect();
        self.renderer.render(RenderKind::Info, &lines.join("\n"));
    }
}
