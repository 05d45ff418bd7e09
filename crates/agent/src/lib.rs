//! The function-calling agent loop at the heart of ToolLoop.
//!
//! Each `respond` call follows the same cycle:
//!
//! 1. **Resolve tools** for this turn (a fixed list, or retrieved per message)
//! 2. **Append** the user message to the transcript
//! 3. **Call the model** with the whole transcript and the tool definitions
//! 4. **If the reply requests a tool**: run it, append the result, go to 3
//! 5. **Otherwise**: the reply's content is the final answer
//!
//! The number of tool invocations per call is capped; hitting the cap ends
//! the turn gracefully with whatever the model said last.
//!
//! [`ContextAgent`] sits in front of an [`Agent`] and rewrites each user
//! message with retrieved context before the loop sees it.

mod blocking;
pub mod engine;
pub mod loop_runner;
pub mod patterns;
pub mod prompt;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use engine::{Agent, AgentBuilder};
pub use loop_runner::{AgentLoop, AgentResponse, ToolInvocation, decode_arguments};
pub use patterns::{ContextAgent, ContextAgentBuilder};
pub use prompt::{DEFAULT_CONTEXT_TEMPLATE, PromptTemplate};
pub use resolver::{RetrievedTools, StaticTools, ToolMapper, ToolResolver};
