//! Agent loop configuration types.

use serde::{Deserialize, Serialize};

/// Default ceiling on tool invocations per `respond` call.
pub const DEFAULT_MAX_TOOL_CALLS: u32 = 5;

/// Configuration for the agent loop. Fixed for the lifetime of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Maximum tool invocations per turn (safety limit)
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,

    /// Log tool calls and rewritten prompts at info level
    #[serde(default)]
    pub verbose: bool,

    /// What to do when a tool's own body fails
    #[serde(default)]
    pub tool_error_policy: ToolErrorPolicy,
}

fn default_max_tool_calls() -> u32 {
    DEFAULT_MAX_TOOL_CALLS
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            verbose: false,
            tool_error_policy: ToolErrorPolicy::default(),
        }
    }
}

/// How the loop treats a tool that returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorPolicy {
    /// Abort the turn and return the error to the caller (default)
    #[default]
    Propagate,
    /// Append "Error: ..." as the tool result and let the model react
    ReportToModel,
}
