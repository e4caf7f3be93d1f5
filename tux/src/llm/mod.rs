//! Model gateway module
//!
//! Conversation types, the gateway trait, and the Chat Completions client.

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod types;

pub use client::ModelGateway;
pub use error::GatewayError;
pub use openai::{OpenAIGateway, parse_reply};
pub use types::{Message, Reply, Role, ToolCallRequest, ToolSpec};

use crate::config::LlmConfig;

/// Create the gateway for the configured endpoint
///
/// The bearer token is looked up by the caller so this stays free of
/// ambient process state.
pub fn create_gateway(
    config: &LlmConfig,
    api_key: Option<String>,
    tools: Vec<ToolSpec>,
) -> Result<OpenAIGateway, GatewayError> {
    debug!(url = %config.url, has_key = %api_key.is_some(), "create_gateway: called");
    OpenAIGateway::new(config, api_key, tools)
}
