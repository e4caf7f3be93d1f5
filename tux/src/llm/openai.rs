//! OpenAI-compatible Chat Completions gateway
//!
//! Talks to any endpoint speaking the `/v1/chat/completions` dialect, which
//! is what LM Studio and most local inference servers expose.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{GatewayError, Message, ModelGateway, Reply, ToolCallRequest, ToolSpec};
use crate::config::LlmConfig;

/// Chat Completions client
pub struct OpenAIGateway {
    url: String,
    model: String,
    api_key: Option<String>,
    tools: Vec<ToolSpec>,
    http: Client,
}

impl OpenAIGateway {
    /// Create a gateway from configuration and the advertised tool catalog
    ///
    /// `api_key` is the resolved bearer token, if any.
    pub fn new(config: &LlmConfig, api_key: Option<String>, tools: Vec<ToolSpec>) -> Result<Self, GatewayError> {
        debug!(url = %config.url, model = %config.model, tool_count = %tools.len(), "OpenAIGateway::new: called");
        let connect = Duration::from_secs_f64(config.connect_timeout_secs);
        let read = Duration::from_secs_f64(config.read_timeout_secs);
        let write = Duration::from_secs_f64(config.write_timeout_secs);
        let pool = Duration::from_secs_f64(config.pool_timeout_secs);

        // reqwest has no per-write timeout; bound the whole exchange instead.
        // It has no pool-acquisition timeout either, so `pool` only limits how
        // long idle connections are kept.
        let http = Client::builder()
            .connect_timeout(connect)
            .read_timeout(read)
            .pool_idle_timeout(pool)
            .timeout(connect + write + read)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            model: config.model.clone(),
            api_key,
            tools,
            http,
        })
    }

    /// Build the request body for the endpoint
    fn build_request_body(&self, history: &[Message]) -> serde_json::Value {
        debug!(%self.model, message_count = %history.len(), "build_request_body: called");
        let messages: Vec<serde_json::Value> = history.iter().map(Message::to_openai).collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if !self.tools.is_empty() {
            debug!("build_request_body: tools not empty, adding tools");
            body["tools"] = serde_json::json!(self.tools.iter().map(|t| t.to_openai_schema()).collect::<Vec<_>>());
        } else {
            debug!("build_request_body: no tools");
        }

        body
    }
}

/// Parse a raw response body into a [`Reply`]
///
/// Only the first choice is read. A non-empty `tool_calls` array wins over
/// any accompanying text.
pub fn parse_reply(body: &str) -> Result<Reply, GatewayError> {
    debug!(body_len = %body.len(), "parse_reply: called");
    let response: OpenAIResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::Protocol(format!("Malformed response body: {}", e)))?;

    let choice = response.choices.into_iter().next().ok_or_else(|| {
        debug!("parse_reply: response has no choices");
        GatewayError::Protocol("Response contains no choices".to_string())
    })?;

    let calls: Vec<ToolCallRequest> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let arguments = ToolCallRequest::decode_arguments(tc.function.arguments.as_deref().unwrap_or("{}"));
            ToolCallRequest::new(tc.id, tc.function.name, arguments)
        })
        .collect();

    if calls.is_empty() {
        debug!("parse_reply: text reply");
        Ok(Reply::Text(choice.message.content.unwrap_or_default()))
    } else {
        debug!(call_count = %calls.len(), "parse_reply: tool request");
        Ok(Reply::ToolRequest(calls))
    }
}

#[async_trait]
impl ModelGateway for OpenAIGateway {
    async fn complete(&self, history: &[Message]) -> Result<Reply, GatewayError> {
        debug!(%self.model, "complete: called");
        let body = self.build_request_body(history);

        let mut request = self
            .http
            .post(&self.url)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "complete: request failed");
            GatewayError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(GatewayError::from)?;

        if !status.is_success() {
            debug!(%status, "complete: API error");
            return Err(GatewayError::from_status(status.as_u16(), &text));
        }

        debug!("complete: success");
        parse_reply(&text)
    }
}

// Chat Completions response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: Option<String>,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    arguments: Option<String>,
}
