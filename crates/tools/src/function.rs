//! Function tools: wrap a plain closure as a [`Tool`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use toolloop_core::error::ToolError;
use toolloop_core::tool::{Tool, ToolResult};
use tracing::debug;

type Handler = dyn Fn(serde_json::Value) -> Result<ToolResult, ToolError> + Send + Sync;

/// A tool backed by a synchronous closure.
///
/// ```ignore
/// let echo = FunctionTool::new("echo", "Echo the input", schema, |args| {
///     Ok(ToolResult::ok(args["text"].as_str().unwrap_or_default()))
/// });
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    schema: serde_json::Value,
    handler: Arc<Handler>,
}

impl FunctionTool {
    /// Wrap a closure that receives the raw JSON argument object.
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: serde_json::Value,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> Result<ToolResult, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Arc::new(handler),
        }
    }

    /// Wrap a closure taking a typed argument struct.
    ///
    /// The JSON object is decoded into `A` before the closure runs. A decode
    /// failure is reported as [`ToolError::InvalidArguments`].
    pub fn typed<A, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: serde_json::Value,
        handler: F,
    ) -> Self
    where
        A: DeserializeOwned + 'static,
        F: Fn(A) -> Result<ToolResult, ToolError> + Send + Sync + 'static,
    {
        let name = name.into();
        let tool_name = name.clone();
        Self::new(name, description, schema, move |arguments| {
            let args: A = serde_json::from_value(arguments)
                .map_err(|e| ToolError::InvalidArguments(format!("{tool_name}: {e}")))?;
            handler(args)
        })
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.schema.clone()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        debug!(tool = %self.name, "Executing function tool");
        (self.handler)(arguments)
    }
}
