//! get_date / get_time tools - current local date and time

use async_trait::async_trait;
use chrono::Local;
use serde_json::{Map, Value};
use tracing::debug;

use crate::tools::{Param, Tool, ToolContext, ToolError, ToolKind};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Return today's date as YYYY-MM-DD
pub struct GetDateTool;

#[async_trait]
impl Tool for GetDateTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetDate
    }

    fn description(&self) -> &'static str {
        "Return the current local date in ISO format (YYYY-MM-DD)."
    }

    fn parameters(&self) -> &'static [Param] {
        &[]
    }

    async fn execute(&self, _args: Map<String, Value>, _ctx: &ToolContext) -> Result<String, ToolError> {
        debug!("GetDateTool::execute: called");
        Ok(Local::now().format(DATE_FORMAT).to_string())
    }
}

/// Return the current wall-clock time as HH:MM:SS
pub struct GetTimeTool;

#[async_trait]
impl Tool for GetTimeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetTime
    }

    fn description(&self) -> &'static str {
        "Return the current local time (HH:MM:SS)."
    }

    fn parameters(&self) -> &'static [Param] {
        &[]
    }

    async fn execute(&self, _args: Map<String, Value>, _ctx: &ToolContext) -> Result<String, ToolError> {
        debug!("GetTimeTool::execute: called");
        Ok(Local::now().format(TIME_FORMAT).to_string())
    }
}
