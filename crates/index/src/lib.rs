//! Document indexes for ToolLoop.
//!
//! An index answers retrieval queries for the agent: context fragments for
//! augmented prompts, or tool descriptions for per-turn tool selection.

pub mod in_memory;

pub use in_memory::{DEFAULT_TOP_K, Document, InMemoryIndex};
