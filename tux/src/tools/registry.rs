//! ToolRegistry - the closed set of tools and their handlers

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::Tool;
use super::builtin::{ChmodXTool, ExecScriptTool, GetDateTool, GetTimeTool, ReadFileTool, RunCommandTool, WriteFileTool};
use crate::llm::ToolSpec;

/// Every tool the model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GetDate,
    GetTime,
    ReadFile,
    WriteFile,
    ChmodX,
    ExecScript,
    RunCommand,
}

impl ToolKind {
    /// All variants, in catalog order
    pub const ALL: [ToolKind; 7] = [
        Self::GetDate,
        Self::GetTime,
        Self::ReadFile,
        Self::WriteFile,
        Self::ChmodX,
        Self::ExecScript,
        Self::RunCommand,
    ];

    /// Function name the model uses
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetDate => "get_date",
            Self::GetTime => "get_time",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::ChmodX => "chmod_x",
            Self::ExecScript => "exec_script",
            Self::RunCommand => "run_command",
        }
    }

    /// The handler implementing this tool
    pub fn handler(&self) -> Box<dyn Tool> {
        match self {
            Self::GetDate => Box::new(GetDateTool),
            Self::GetTime => Box::new(GetTimeTool),
            Self::ReadFile => Box::new(ReadFileTool),
            Self::WriteFile => Box::new(WriteFileTool),
            Self::ChmodX => Box::new(ChmodXTool),
            Self::ExecScript => Box::new(ExecScriptTool),
            Self::RunCommand => Box::new(RunCommandTool),
        }
    }
}

impl FromStr for ToolKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.name() == s).ok_or(())
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable name -> handler mapping; also the source of the tool catalog
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the built-in handler for every tool kind
    pub fn standard() -> Self {
        debug!("ToolRegistry::standard: called");
        let tools = ToolKind::ALL.into_iter().map(|kind| (kind, kind.handler())).collect();
        Self { tools }
    }

    /// Swap in a different handler for the tool it implements
    pub fn with_handler(mut self, tool: Box<dyn Tool>) -> Self {
        debug!(tool_name = %tool.name(), "ToolRegistry::with_handler: called");
        self.tools.insert(tool.kind(), tool);
        self
    }

    /// Look up the handler for a tool name
    pub fn resolve(&self, name: &str) -> Option<&dyn Tool> {
        debug!(%name, "ToolRegistry::resolve: called");
        let kind = name.parse::<ToolKind>().ok()?;
        self.tools.get(&kind).map(|tool| tool.as_ref())
    }

    /// Tool catalog advertised to the model
    pub fn catalog(&self) -> Vec<ToolSpec> {
        debug!("ToolRegistry::catalog: called");
        ToolKind::ALL
            .iter()
            .filter_map(|kind| self.tools.get(kind))
            .map(|tool| tool.spec())
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        ToolKind::ALL
            .iter()
            .filter(|kind| self.tools.contains_key(kind))
            .map(|kind| kind.name())
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.name().parse::<ToolKind>(), Ok(kind));
        }
        assert!("rm_rf".parse::<ToolKind>().is_err());
    }

    #[test]
    fn test_handler_kind_matches() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.handler().kind(), kind);
        }
    }

    #[test]
    fn test_catalog_mirrors_registry() {
        let registry = ToolRegistry::standard();
        let catalog = registry.catalog();

        let catalog_names: HashSet<_> = catalog.iter().map(|s| s.name.as_str()).collect();
        let registry_names: HashSet<_> = registry.names().into_iter().collect();
        assert_eq!(catalog_names, registry_names);
        assert_eq!(catalog.len(), ToolKind::ALL.len());

        for spec in &catalog {
            let tool = registry.resolve(&spec.name).unwrap();
            let required: Vec<_> = tool
                .parameters()
                .iter()
                .filter(|p| p.required)
                .map(|p| serde_json::json!(p.name))
                .collect();
            assert_eq!(spec.parameters["required"], serde_json::json!(required));
            for param in tool.parameters() {
                assert_eq!(spec.parameters["properties"][param.name]["type"], "string");
            }
        }
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = ToolRegistry::standard();
        assert!(registry.resolve("delete_everything").is_none());
        assert!(registry.resolve("write_file").is_some());
    }

    #[test]
    fn test_write_file_schema() {
        let registry = ToolRegistry::standard();
        let spec = registry.resolve("write_file").unwrap().spec();
        assert_eq!(spec.parameters["required"], serde_json::json!(["path", "contents"]));
    }
}
