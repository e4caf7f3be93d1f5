//! Integration tests for Tux Copilot
//!
//! These drive a full session (gateway, dispatcher, tools, sandbox) with a
//! scripted model and scripted user input.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_cmd::Command;
use async_trait::async_trait;
use predicates::prelude::*;
use serde_json::{Map, Value};
use tempfile::TempDir;

use tuxcopilot::config::LlmConfig;
use tuxcopilot::llm::{GatewayError, Message, ModelGateway, Reply, Role, ToolCallRequest};
use tuxcopilot::render::{BufferRenderer, RenderKind};
use tuxcopilot::repl::{Prompt, PromptInput, Session};
use tuxcopilot::sandbox::{Invocation, LocalSandbox, Sandbox, SandboxError, SandboxState, with_sandbox};
use tuxcopilot::tools::{ToolContext, ToolDispatcher, ToolRegistry};

// =============================================================================
// Test doubles
// =============================================================================

/// Model that answers from a script and remembers what it was sent
struct ScriptedGateway {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedGateway {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn last_history(&self) -> Vec<Message> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(&self, history: &[Message]) -> Result<Reply, GatewayError> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GatewayError::Protocol("script exhausted".to_string()))
    }
}

/// Local sandbox that counts lifecycle calls
struct RecordingSandbox {
    inner: LocalSandbox,
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingSandbox {
    fn new(workdir: &Path) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalSandbox::new(workdir.to_path_buf()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }
}

#[async_trait]
impl Sandbox for RecordingSandbox {
    async fn image_exists(&self) -> bool {
        self.calls.lock().unwrap().push("image_exists");
        true
    }

    async fn build_image(&self) -> Result<(), SandboxError> {
        self.calls.lock().unwrap().push("build_image");
        Ok(())
    }

    async fn start_container(&self) -> Result<(), SandboxError> {
        self.calls.lock().unwrap().push("start_container");
        self.inner.start_container().await
    }

    async fn stop_container(&self) {
        self.calls.lock().unwrap().push("stop_container");
    }

    async fn state(&self) -> SandboxState {
        self.inner.state().await
    }

    fn command(&self, invocation: &Invocation) -> tokio::process::Command {
        self.inner.command(invocation)
    }
}

struct ScriptedPrompt(VecDeque<String>);

impl Prompt for ScriptedPrompt {
    fn read_line(&mut self, _prompt: &str) -> eyre::Result<PromptInput> {
        Ok(self.0.pop_front().map(PromptInput::Line).unwrap_or(PromptInput::Eof))
    }
}

/// Prompt whose terminal goes away once its lines are used up
struct BrokenPrompt(VecDeque<String>);

impl Prompt for BrokenPrompt {
    fn read_line(&mut self, _prompt: &str) -> eyre::Result<PromptInput> {
        match self.0.pop_front() {
            Some(line) => Ok(PromptInput::Line(line)),
            None => Err(eyre::eyre!("terminal closed")),
        }
    }
}

fn tool_call(id: &str, name: &str, args: Value) -> ToolCallRequest {
    let arguments: Map<String, Value> = args.as_object().cloned().unwrap_or_default();
    ToolCallRequest::new(Some(id.to_string()), name, arguments)
}

struct Harness {
    session: Session,
    gateway: Arc<ScriptedGateway>,
    sandbox: Arc<RecordingSandbox>,
    renderer: Arc<BufferRenderer>,
}

fn harness(workdir: &Path, replies: Vec<Reply>, lines: &[&str], exec_timeout: Duration) -> Harness {
    let gateway = ScriptedGateway::new(replies);
    let sandbox = RecordingSandbox::new(workdir);
    let renderer = Arc::new(BufferRenderer::new());
    let ctx = ToolContext::new(workdir.to_path_buf(), sandbox.clone()).with_exec_timeout(exec_timeout);

    let session = Session::new(
        gateway.clone(),
        ToolDispatcher::new(ToolRegistry::standard()),
        ctx,
        &LlmConfig::default(),
        Box::new(ScriptedPrompt(lines.iter().map(|l| l.to_string()).collect())),
        renderer.clone(),
    );

    Harness {
        session,
        gateway,
        sandbox,
        renderer,
    }
}

fn tool_messages(history: &[Message]) -> Vec<&Message> {
    history.iter().filter(|m| m.role == Role::Tool).collect()
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[tokio::test]
async fn test_date_question_uses_get_date_then_answers() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut h = harness(
        temp.path(),
        vec![
            Reply::ToolRequest(vec![tool_call("call_date", "get_date", serde_json::json!({}))]),
            Reply::Text("Today's date is in the tool result.".to_string()),
        ],
        &["what's today's date"],
        Duration::from_secs(60),
    );

    h.session.run().await.expect("session should end cleanly");

    let history = h.session.conversation().snapshot();
    let results = tool_messages(history);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].tool_call_id.as_deref(), Some("call_date"));
    assert!(
        chrono::NaiveDate::parse_from_str(&results[0].content, "%Y-%m-%d").is_ok(),
        "not a date: {}",
        results[0].content
    );

    let last = history.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, "Today's date is in the tool result.");
    assert_eq!(h.gateway.calls(), 2);
}

#[tokio::test]
async fn test_write_file_twice_keeps_first_contents() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let args = serde_json::json!({"path": "a.txt", "contents": "hi"});
    let mut h = harness(
        temp.path(),
        vec![
            Reply::ToolRequest(vec![tool_call("w1", "write_file", args.clone())]),
            Reply::Text("Created.".to_string()),
            Reply::ToolRequest(vec![tool_call("w2", "write_file", args)]),
            Reply::Text("It was already there.".to_string()),
        ],
        &["make a.txt", "make it again"],
        Duration::from_secs(60),
    );

    h.session.run().await.expect("session should end cleanly");

    let history = h.session.conversation().snapshot();
    let results = tool_messages(history);
    assert_eq!(results.len(), 2);
    assert!(results[0].content.starts_with("File created"));
    assert!(results[1].content.contains("already exists"));
    assert_eq!(std::fs::read_to_string(temp.path().join("a.txt")).unwrap(), "hi");
    assert_eq!(h.renderer.of_kind(RenderKind::ToolFailure).len(), 1);
}

#[tokio::test]
async fn test_exit_tears_down_sandbox_once() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let Harness {
        mut session,
        gateway,
        sandbox,
        ..
    } = harness(temp.path(), vec![], &["exit"], Duration::from_secs(60));

    with_sandbox(sandbox.as_ref(), std::future::pending(), session.run())
        .await
        .expect("session should end cleanly");

    assert_eq!(gateway.calls(), 0);
    assert_eq!(sandbox.count("start_container"), 1);
    assert_eq!(sandbox.count("stop_container"), 1);
}

#[tokio::test]
async fn test_exit_after_tool_turn_tears_down_sandbox_once() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let Harness {
        mut session,
        gateway,
        sandbox,
        ..
    } = harness(
        temp.path(),
        vec![
            Reply::ToolRequest(vec![tool_call(
                "w1",
                "write_file",
                serde_json::json!({"path": "notes.txt", "contents": "x"}),
            )]),
            Reply::Text("Written.".to_string()),
        ],
        &["write notes.txt", "exit"],
        Duration::from_secs(60),
    );

    with_sandbox(sandbox.as_ref(), std::future::pending(), session.run())
        .await
        .expect("session should end cleanly");

    assert_eq!(gateway.calls(), 2);
    assert!(temp.path().join("notes.txt").exists());
    assert_eq!(sandbox.count("start_container"), 1);
    assert_eq!(sandbox.count("stop_container"), 1);
}

#[tokio::test]
async fn test_failed_session_tears_down_sandbox_once() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let gateway = ScriptedGateway::new(vec![
        Reply::ToolRequest(vec![tool_call("d1", "get_date", serde_json::json!({}))]),
        Reply::Text("Here you go.".to_string()),
    ]);
    let sandbox = RecordingSandbox::new(temp.path());
    let mut session = Session::new(
        gateway.clone(),
        ToolDispatcher::new(ToolRegistry::standard()),
        ToolContext::new(temp.path().to_path_buf(), sandbox.clone()),
        &LlmConfig::default(),
        Box::new(BrokenPrompt(VecDeque::from(["date?".to_string()]))),
        Arc::new(BufferRenderer::new()),
    );

    let result = with_sandbox(sandbox.as_ref(), std::future::pending(), session.run()).await;

    assert!(result.unwrap_err().to_string().contains("terminal closed"));
    assert_eq!(gateway.calls(), 2);
    assert_eq!(sandbox.count("stop_container"), 1);
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn test_read_missing_file_is_reported_not_raised() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut h = harness(
        temp.path(),
        vec![
            Reply::ToolRequest(vec![tool_call("r1", "read_file", serde_json::json!({"path": "never.txt"}))]),
            Reply::Text("That file does not exist.".to_string()),
        ],
        &["read never.txt"],
        Duration::from_secs(60),
    );

    h.session.run().await.expect("session should end cleanly");

    let history = h.gateway.last_history();
    let results = tool_messages(&history);
    assert_eq!(results.len(), 1);
    assert!(results[0].content.starts_with("[ERROR] File not found"));
}

#[tokio::test]
async fn test_missing_argument_reaches_model_as_dispatch_error() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut h = harness(
        temp.path(),
        vec![
            Reply::ToolRequest(vec![tool_call("w1", "write_file", serde_json::json!({"path": "b.txt"}))]),
            Reply::Text("I forgot the contents.".to_string()),
        ],
        &["write b.txt"],
        Duration::from_secs(60),
    );

    h.session.run().await.expect("session should end cleanly");

    let history = h.gateway.last_history();
    let results = tool_messages(&history);
    assert!(results[0].content.starts_with("[DISPATCH ERROR]"));
    assert!(results[0].content.contains("contents"));
    assert!(!temp.path().join("b.txt").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_timeout_then_follow_up() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut h = harness(
        temp.path(),
        vec![
            Reply::ToolRequest(vec![tool_call(
                "slow",
                "run_command",
                serde_json::json!({"command": "sleep 10"}),
            )]),
            Reply::Text("The command took too long.".to_string()),
        ],
        &["run the slow thing"],
        Duration::from_secs(1),
    );

    h.session.run().await.expect("session should end cleanly");

    assert_eq!(h.gateway.calls(), 2);
    let history = h.gateway.last_history();
    let results = tool_messages(&history);
    assert!(results[0].content.contains("timed out after 1s"));
    assert_eq!(
        h.session.conversation().snapshot().last().unwrap().content,
        "The command took too long."
    );
}

#[tokio::test]
async fn test_unknown_tool_and_valid_tool_in_one_reply() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut h = harness(
        temp.path(),
        vec![
            Reply::ToolRequest(vec![
                tool_call("u1", "format_disk", serde_json::json!({})),
                tool_call("t1", "get_time", serde_json::json!({})),
            ]),
            Reply::Text("Only the clock worked.".to_string()),
        ],
        &["do things"],
        Duration::from_secs(60),
    );

    h.session.run().await.expect("session should end cleanly");

    let history = h.gateway.last_history();
    let ids: Vec<_> = tool_messages(&history)
        .iter()
        .filter_map(|m| m.tool_call_id.clone())
        .collect();
    assert_eq!(ids, vec!["u1", "t1"]);
    assert_eq!(h.sandbox.count("stop_container"), 0);
}

// =============================================================================
// CLI
// =============================================================================

#[test]
fn test_cli_tools_prints_catalog() {
    let home = TempDir::new().expect("Failed to create temp dir");
    Command::cargo_bin("tux")
        .expect("binary builds")
        .arg("tools")
        .env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .current_dir(home.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"write_file\""))
        .stdout(predicate::str::contains("\"run_command\""))
        .stdout(predicate::str::contains("\"contents\""));
}
