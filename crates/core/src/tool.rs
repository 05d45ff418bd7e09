//! Tool trait: the abstraction over callables the model may invoke.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool considers the call successful
    pub success: bool,

    /// The textual output fed back to the model
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
        }
    }

    /// A soft failure: the model sees the text, the turn continues.
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            data: None,
        }
    }
}

/// The core Tool trait.
///
/// A tool is a name, a description and a JSON Schema for its arguments,
/// plus a body that receives the decoded argument object.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "add", "lookup_weather").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with a decoded JSON argument object.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The tools active for one turn, keyed by unique name.
///
/// Definitions are reported in insertion order so the request sent to the
/// model is deterministic.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set, rejecting duplicate names.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> std::result::Result<Self, ToolError> {
        let mut set = Self::empty();
        for tool in tools {
            set.insert(tool)?;
        }
        Ok(set)
    }

    /// Add a tool. Fails if a tool with the same name is already present.
    pub fn insert(&mut self, tool: Arc<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Look a tool up by name.
    pub fn get(&self, name: &str) -> std::result::Result<&Arc<dyn Tool>, ToolError> {
        self.by_name
            .get(name)
            .map(|&idx| &self.tools[idx])
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}
