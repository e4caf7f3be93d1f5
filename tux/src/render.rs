//! Terminal presentation
//!
//! Failures are always flagged so a human can scan the transcript for trouble
//! without reading every tool result.

use std::sync::Mutex;

use colored::Colorize;
use termimad::MadSkin;
use termimad::crossterm::style::Color;

/// What a piece of output is, which decides how it looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Banner,
    Assistant,
    ToolCall,
    ToolSuccess,
    ToolFailure,
    Error,
    Warning,
    Info,
}

/// Output sink for the session
pub trait Render: Send + Sync {
    fn render(&self, kind: RenderKind, text: &str);
}

/// Colored output on stdout
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl Render for TerminalRenderer {
    fn render(&self, kind: RenderKind, text: &str) {
        match kind {
            RenderKind::Banner => println!("\n{}", text.bright_green().bold()),
            RenderKind::Assistant => {
                println!("{}", "Tux>".bright_blue().bold());
                println!("{}", markdown(text, terminal_width()));
            }
            RenderKind::ToolCall => println!("\n{} {}", "Tool:".bright_yellow(), text.bright_white()),
            RenderKind::ToolSuccess => println!("{}", text.cyan()),
            RenderKind::ToolFailure => println!("{} {}", "[FAILED]".red().bold(), text.red()),
            RenderKind::Error => eprintln!("{} {}", "Error:".red().bold(), text),
            RenderKind::Warning => println!("{} {}", "Warning:".yellow().bold(), text.yellow()),
            RenderKind::Info => println!("{}", text.dimmed()),
        }
    }
}

fn skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.set_headers_fg(Color::Yellow);
    skin.bold.set_fg(Color::White);
    skin.italic.set_fg(Color::Magenta);
    skin.inline_code.set_fg(Color::Green);
    skin.code_block.set_fg(Color::Green);
    skin.code_block.left_margin = 2;
    skin
}

fn terminal_width() -> usize {
    let (cols, _) = termimad::terminal_size();
    (cols as usize).clamp(20, 120)
}

/// Lay out a model reply as terminal Markdown
pub fn markdown(text: &str, width: usize) -> String {
    termimad::FmtText::from(&skin(), text, Some(width)).to_string()
}

/// Renderer that keeps everything it is given, for tests and transcripts
#[derive(Debug, Default)]
pub struct BufferRenderer {
    lines: Mutex<Vec<(RenderKind, String)>>,
}

impl BufferRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(RenderKind, String)> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    pub fn of_kind(&self, kind: RenderKind) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, text)| text)
            .collect()
    }
}

impl Render for BufferRenderer {
    fn render(&self, kind: RenderKind, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((kind, text.to_string()));
        }
    }
}
