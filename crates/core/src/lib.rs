//! # ToolLoop Core
//!
//! Domain types, traits, and error definitions for the ToolLoop agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that the agent loop, providers, indexes and tools implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is a trait here:
//! - [`Provider`]: the language model client
//! - [`Retriever`]: ranked text retrieval
//! - [`Tool`]: a callable exposed to the model
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted stubs without touching the loop.

pub mod agent;
pub mod error;
pub mod event;
pub mod message;
pub mod model;
pub mod provider;
pub mod retrieval;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{LoopConfig, ToolErrorPolicy, DEFAULT_MAX_TOOL_CALLS};
pub use error::{Error, Result};
pub use event::{AgentEvent, EventBus};
pub use message::{Message, Role, ToolCallRequest, Transcript, TranscriptId};
pub use model::SupportedModel;
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use retrieval::{RetrievedFragment, Retriever};
pub use tool::{Tool, ToolResult, ToolSet};
