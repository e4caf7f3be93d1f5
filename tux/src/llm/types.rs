//! Conversation and gateway types
//!
//! These model the OpenAI-compatible Chat Completions shape used by local
//! inference servers (LM Studio, llama.cpp, vLLM).

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,

    /// Text content, empty when the message only carries tool calls
    pub content: String,

    /// Requested actions (assistant messages only)
    pub tool_calls: Option<Vec<ToolCallRequest>>,

    /// The request this message answers (tool messages only)
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a system message with operating instructions
    pub fn system(text: impl Into<String>) -> Self {
        debug!("Message::system: called");
        Self {
            role: Role::System,
            content: text.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        debug!("Message::assistant: called");
        Self {
            role: Role::Assistant,
            content: text.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message requesting tool calls
    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        debug!(call_count = %calls.len(), "Message::tool_calls: called");
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    /// Create a tool message answering the call `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let tool_call_id = tool_call_id.into();
        debug!(%tool_call_id, "Message::tool: called");
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id),
        }
    }

    /// Wire form for the Chat Completions `messages` array
    pub fn to_openai(&self) -> Value {
        let mut msg = serde_json::json!({
            "role": self.role,
            "content": self.content,
        });
        if let Some(calls) = &self.tool_calls {
            msg["tool_calls"] = Value::Array(calls.iter().map(ToolCallRequest::to_openai).collect());
        }
        if let Some(id) = &self.tool_call_id {
            msg["tool_call_id"] = Value::String(id.clone());
        }
        msg
    }
}

/// A single action requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    /// Create a request, assigning an id when the source omitted one
    pub fn new(id: Option<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        let id = match id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                debug!("ToolCallRequest::new: no id supplied, generating one");
                format!("call_{}", uuid::Uuid::now_v7().simple())
            }
        };
        Self {
            id,
            name: name.into(),
            arguments,
        }
    }

    /// Decode the JSON-encoded `arguments` string sent by the endpoint
    ///
    /// Anything that is not a JSON object decodes to an empty mapping; the
    /// dispatcher then reports the missing parameters back to the model.
    pub fn decode_arguments(raw: &str) -> Map<String, Value> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                debug!(?other, "ToolCallRequest::decode_arguments: not an object, using empty mapping");
                Map::new()
            }
            Err(e) => {
                debug!(%e, "ToolCallRequest::decode_arguments: invalid JSON, using empty mapping");
                Map::new()
            }
        }
    }

    fn to_openai(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": Value::Object(self.arguments.clone()).to_string(),
            }
        })
    }
}

/// Parsed reply from the model
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Natural-language answer
    Text(String),

    /// One or more requested tool calls, in the order the model issued them
    ToolRequest(Vec<ToolCallRequest>),
}

/// Tool catalog entry advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    /// Convert to the OpenAI function-tool schema format
    pub fn to_openai_schema(&self) -> Value {
        debug!(%self.name, "ToolSpec::to_openai_schema: called");
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}
