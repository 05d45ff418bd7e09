//! Retriever trait: ranked text retrieval over some document index.
//!
//! Used twice by the agent: to pick tools for a turn, and to pull context
//! into the user's message before the model sees it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// A scored piece of content returned by a retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedFragment {
    /// The text content
    pub content: String,

    /// Relevance score (higher is more relevant)
    #[serde(default)]
    pub score: f32,

    /// Identifier of the source document
    pub source: String,
}

impl RetrievedFragment {
    pub fn new(source: impl Into<String>, content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            score,
            source: source.into(),
        }
    }
}

/// The core Retriever trait.
///
/// Results are ordered relevance-descending. Callers assume nothing about
/// state kept between calls.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// The retriever name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Retrieve fragments relevant to `query`.
    async fn retrieve(&self, query: &str) -> std::result::Result<Vec<RetrievedFragment>, RetrievalError>;
}
