//! Tool resolution: which tools the model may call on a given turn.
//!
//! [`StaticTools`] offers the same list every turn. [`RetrievedTools`]
//! queries a retriever with the user's message and maps each retrieved
//! fragment back to a tool.

use async_trait::async_trait;
use std::sync::Arc;
use toolloop_core::Result;
use toolloop_core::error::ToolError;
use toolloop_core::retrieval::{RetrievedFragment, Retriever};
use toolloop_core::tool::{Tool, ToolSet};
use tracing::debug;

/// Produces the tool set for one turn.
#[async_trait]
pub trait ToolResolver: Send + Sync {
    /// Resolve the tools to offer for `message`.
    async fn resolve(&self, message: &str) -> Result<ToolSet>;
}

/// A fixed tool list, offered unchanged on every turn.
#[derive(Debug, Clone, Default)]
pub struct StaticTools {
    tools: ToolSet,
}

impl StaticTools {
    /// Build from a tool list. Tool names must be unique.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> std::result::Result<Self, ToolError> {
        Ok(Self {
            tools: ToolSet::new(tools)?,
        })
    }
}

#[async_trait]
impl ToolResolver for StaticTools {
    async fn resolve(&self, _message: &str) -> Result<ToolSet> {
        Ok(self.tools.clone())
    }
}

/// Maps a retrieved fragment to the tool it describes.
pub type ToolMapper = dyn Fn(&RetrievedFragment) -> std::result::Result<Arc<dyn Tool>, ToolError>
    + Send
    + Sync;

/// Tools looked up per turn by querying a retriever with the user message.
///
/// Fragments arrive most relevant first. When two fragments map to tools
/// with the same name, the first one wins.
pub struct RetrievedTools {
    retriever: Arc<dyn Retriever>,
    mapper: Arc<ToolMapper>,
}

impl RetrievedTools {
    pub fn new(retriever: Arc<dyn Retriever>, mapper: Arc<ToolMapper>) -> Self {
        Self { retriever, mapper }
    }
}

#[async_trait]
impl ToolResolver for RetrievedTools {
    async fn resolve(&self, message: &str) -> Result<ToolSet> {
        let fragments = self.retriever.retrieve(message).await?;

        let mut tools = ToolSet::empty();
        for fragment in &fragments {
            let tool = (self.mapper)(fragment)?;
            if tools.contains(tool.name()) {
                debug!(tool = %tool.name(), source = %fragment.source, "Skipping duplicate retrieved tool");
                continue;
            }
            tools.insert(tool)?;
        }

        debug!(
            retriever = %self.retriever.name(),
            fragments = fragments.len(),
            tools = tools.len(),
            "Resolved tools for turn"
        );
        Ok(tools)
    }
}
