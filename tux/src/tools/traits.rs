//! Tool trait definition

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::context::ToolContext;
use super::error::ToolError;
use super::registry::ToolKind;
use crate::llm::ToolSpec;

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
}

impl ParamType {
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
        }
    }

    /// Check that `value` has this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
        }
    }
}

/// One named parameter of a tool
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub ty: ParamType,
    pub description: &'static str,
    pub required: bool,
}

/// A tool that can be called by the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which closed-set tool this handler implements
    fn kind(&self) -> ToolKind;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Declared parameters; the dispatcher validates against these
    fn parameters(&self) -> &'static [Param];

    /// Execute with arguments already validated against [`Tool::parameters`]
    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<String, ToolError>;

    /// Tool name (matches the function name the model calls)
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Catalog entry advertised to the model
    fn spec(&self) -> ToolSpec {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in self.parameters() {
            properties.insert(
                param.name.to_string(),
                serde_json::json!({
                    "type": param.ty.json_type(),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(Value::String(param.name.to_string()));
            }
        }

        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

/// Decode validated arguments into a tool's typed argument record
pub fn decode_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args)).map_err(|e| {
        debug!(%e, "decode_args: arguments do not fit the record");
        ToolError::InvalidArguments(e.to_string())
    })
}

/// How one tool call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),

    /// The handler ran and failed
    ToolError(String),

    /// The handler never ran: unknown tool or argument mismatch
    DispatchError(String),
}

impl ToolOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, ToolOutcome::Success(_))
    }

    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Success(t) | ToolOutcome::ToolError(t) | ToolOutcome::DispatchError(t) => t,
        }
    }

    /// Text fed back to the model as the tool message content
    pub fn to_content(&self) -> String {
        match self {
            ToolOutcome::Success(text) => text.clone(),
            ToolOutcome::ToolError(text) => format!("[ERROR] {}", text),
            ToolOutcome::DispatchError(text) => format!("[DISPATCH ERROR] {}", text),
        }
    }
}

/// Result of executing one tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub outcome: ToolOutcome,
}
