//! ToolDispatcher - validates, runs and records tool calls

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Tool, ToolContext, ToolError, ToolOutcome, ToolRegistry, ToolResult};
use crate::conversation::{Conversation, ConversationError};
use crate::llm::{Message, ToolCallRequest};

/// Runs tool calls against the registry, one at a time
pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        debug!("ToolDispatcher::new: called");
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Check call arguments against the tool's declared parameters
    ///
    /// Reports every unexpected, missing or mistyped argument at once.
    pub fn validate(tool: &dyn Tool, args: &Map<String, Value>) -> Result<(), String> {
        debug!(tool_name = %tool.name(), "ToolDispatcher::validate: called");
        let params = tool.parameters();
        let mut problems = Vec::new();

        for key in args.keys() {
            if !params.iter().any(|p| p.name == key) {
                problems.push(format!("unexpected argument '{}'", key));
            }
        }

        for param in params {
            match args.get(param.name) {
                None if param.required => problems.push(format!("missing required argument '{}'", param.name)),
                None => {}
                Some(value) if !param.ty.accepts(value) => problems.push(format!(
                    "argument '{}' must be a {}",
                    param.name,
                    param.ty.json_type()
                )),
                Some(_) => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            debug!(?problems, "ToolDispatcher::validate: rejected");
            Err(format!("{}: {}", tool.name(), problems.join("; ")))
        }
    }

    /// Run one call and classify how it ended
    ///
    /// Never fails: unknown tools and bad arguments become `DispatchError`,
    /// handler errors and panics become `ToolError`.
    pub async fn execute(&self, call: &ToolCallRequest, ctx: &ToolContext) -> ToolResult {
        debug!(tool_name = %call.name, tool_id = %call.id, "ToolDispatcher::execute: called");
        let outcome = match self.registry.resolve(&call.name) {
            None => {
                debug!("ToolDispatcher::execute: unknown tool");
                ToolOutcome::DispatchError(format!("unknown tool: {}", call.name))
            }
            Some(tool) => match Self::validate(tool, &call.arguments) {
                Err(reason) => ToolOutcome::DispatchError(reason),
                Ok(()) => Self::invoke(tool, call.arguments.clone(), ctx).await,
            },
        };

        debug!(failed = %outcome.is_failure(), "ToolDispatcher::execute: done");
        ToolResult {
            tool_call_id: call.id.clone(),
            outcome,
        }
    }

    async fn invoke(tool: &dyn Tool, args: Map<String, Value>, ctx: &ToolContext) -> ToolOutcome {
        match AssertUnwindSafe(tool.execute(args, ctx)).catch_unwind().await {
            Ok(Ok(text)) => ToolOutcome::Success(text),
            Ok(Err(ToolError::InvalidArguments(reason))) => ToolOutcome::DispatchError(reason),
            Ok(Err(e)) => ToolOutcome::ToolError(e.to_string()),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(tool_name = %tool.name(), %reason, "Tool handler panicked");
                ToolOutcome::ToolError(format!("{} panicked: {}", tool.name(), reason))
            }
        }
    }

    /// Dispatch every call of one model reply, in order
    ///
    /// Each call is appended as an assistant message before it runs and its
    /// result as the matching tool message right after, so the conversation
    /// never holds a result ahead of its request. Ids the model reuses (some
    /// servers number calls per reply) are replaced with fresh ones, and the
    /// returned results carry the ids actually recorded.
    pub async fn dispatch(
        &self,
        calls: &[ToolCallRequest],
        conversation: &mut Conversation,
        ctx: &ToolContext,
    ) -> Result<Vec<ToolResult>, ConversationError> {
        debug!(count = %calls.len(), "ToolDispatcher::dispatch: called");
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let call = if conversation.is_issued(&call.id) {
                let fresh = ToolCallRequest::new(None, call.name.clone(), call.arguments.clone());
                warn!(reused = %call.id, assigned = %fresh.id, "Model reused a tool call id");
                fresh
            } else {
                call.clone()
            };
            conversation.append(Message::tool_calls(vec![call.clone()]))?;
            let result = self.execute(&call, ctx).await;
            conversation.append(Message::tool(&result.tool_call_id, result.outcome.to_content()))?;
            results.push(result);
        }

        debug!("ToolDispatcher::dispatch: all calls answered");
        Ok(results)
    }
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new(ToolRegistry::standard())
    }
}
