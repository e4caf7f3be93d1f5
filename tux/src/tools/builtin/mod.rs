//! Built-in tool implementations

mod chmod_x;
mod date_time;
mod exec;
mod read_file;
mod write_file;

pub use chmod_x::ChmodXTool;
pub use date_time::{GetDateTool, GetTimeTool};
pub use exec::{ExecScriptTool, RunCommandTool};
pub use read_file::ReadFileTool;
pub use write_file::WriteFileTool;
