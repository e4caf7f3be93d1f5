//! Append-only conversation store
//!
//! Holds the ordered message log for one session and enforces request/response
//! pairing: a tool message is only admitted if it answers a tool call that an
//! earlier assistant message issued and nothing has answered yet.

use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::llm::{Message, Role};

/// Malformed conversation state; indicates a dispatcher bug, never a user error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}

/// Ordered message log owned by the session loop
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,

    /// Issued tool call ids still waiting for a response, in issue order
    pending: Vec<String>,

    /// Every tool call id ever issued in this conversation
    issued: HashSet<String>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        debug!("Conversation::new: called");
        Self::default()
    }

    /// Create a conversation seeded with a system message
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        debug!("Conversation::with_system_prompt: called");
        let prompt = prompt.into();
        let mut conversation = Self::new();
        if !prompt.is_empty() {
            conversation.messages.push(Message::system(prompt));
        }
        conversation
    }

    /// Append a message, enforcing the pairing invariant
    pub fn append(&mut self, message: Message) -> Result<(), ConversationError> {
        debug!(role = %message.role, "Conversation::append: called");
        match message.role {
            Role::Tool => {
                let Some(id) = message.tool_call_id.as_deref() else {
                    debug!("Conversation::append: tool message without call id");
                    return Err(ConversationError::ProtocolViolation(
                        "tool message carries no tool_call_id".to_string(),
                    ));
                };
                let Some(pos) = self.pending.iter().position(|p| p == id) else {
                    debug!(%id, "Conversation::append: orphaned tool response");
                    let reason = if self.issued.contains(id) {
                        format!("tool call '{}' was already answered", id)
                    } else {
                        format!("tool call '{}' was never requested", id)
                    };
                    return Err(ConversationError::ProtocolViolation(reason));
                };
                self.pending.remove(pos);
            }
            Role::Assistant => {
                if message.tool_call_id.is_some() {
                    return Err(ConversationError::ProtocolViolation(
                        "assistant message carries a tool_call_id".to_string(),
                    ));
                }
                if let Some(calls) = &message.tool_calls {
                    let mut fresh = HashSet::new();
                    for call in calls {
                        if self.issued.contains(&call.id) || !fresh.insert(call.id.as_str()) {
                            debug!(id = %call.id, "Conversation::append: duplicate tool call id");
                            return Err(ConversationError::ProtocolViolation(format!(
                                "tool call id '{}' is not unique",
                                call.id
                            )));
                        }
                    }
                    for call in calls {
                        self.issued.insert(call.id.clone());
                        self.pending.push(call.id.clone());
                    }
                }
            }
            Role::User | Role::System => {
                if message.tool_calls.is_some() || message.tool_call_id.is_some() {
                    return Err(ConversationError::ProtocolViolation(format!(
                        "{} message carries tool call fields",
                        message.role
                    )));
                }
            }
        }

        self.messages.push(message);
        Ok(())
    }

    /// Full ordered history for transmission to the gateway
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Whether an assistant message already issued this tool call id
    pub fn is_issued(&self, id: &str) -> bool {
        self.issued.contains(id)
    }

    /// Whether any issued tool call still lacks a response
    pub fn has_unanswered(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
