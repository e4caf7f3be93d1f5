//! Tool system
//!
//! Tools give the model a constrained surface inside the sandbox: dates,
//! file reads and writes under the bounded working directory, and command
//! execution through the isolated runtime. The set is closed ([`ToolKind`])
//! and the registry built from it is also the catalog sent to the model.

mod context;
mod dispatcher;
mod error;
mod registry;
mod traits;

pub mod builtin;

pub use context::{DEFAULT_EXEC_TIMEOUT, ToolContext};
pub use dispatcher::ToolDispatcher;
pub use error::ToolError;
pub use registry::{ToolKind, ToolRegistry};
pub use traits::{Param, ParamType, Tool, ToolOutcome, ToolResult, decode_args};
