//! Tux Copilot - a chat loop that lets a local model act inside a sandbox
//!
//! The model talks to an OpenAI-compatible Chat Completions endpoint and may
//! request tool calls. Each call is validated against a closed registry of
//! tools, executed against a bounded working directory and an isolated
//! runtime (Docker by default), and its result is fed back into the
//! conversation so the model can continue with real observations.

pub mod cli;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod render;
pub mod repl;
pub mod sandbox;
pub mod tools;

pub use config::Config;
pub use conversation::{Conversation, ConversationError};
pub use llm::{GatewayError, Message, ModelGateway, Reply, ToolCallRequest};
pub use repl::{Session, SessionState};
pub use sandbox::{Sandbox, SandboxError, with_sandbox};
pub use tools::{ToolDispatcher, ToolError, ToolKind, ToolRegistry};
