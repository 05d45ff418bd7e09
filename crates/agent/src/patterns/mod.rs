//! Agent patterns layered over the core loop.
//!
//! - [`ContextAgent`] retrieves context for each message and rewrites it
//!   into a templated prompt before the loop sees it.

pub mod context_retriever;

pub use context_retriever::{ContextAgent, ContextAgentBuilder};
