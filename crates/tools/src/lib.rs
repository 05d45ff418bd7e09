//! Tool implementations for ToolLoop.
//!
//! [`FunctionTool`] turns any closure into a tool the model can call.
//! The arithmetic tools are ready-made examples built on it.

pub mod arithmetic;
pub mod function;

use std::sync::Arc;
use toolloop_core::tool::Tool;

pub use function::FunctionTool;

/// All built-in tools, in a stable order.
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(arithmetic::add()),
        Arc::new(arithmetic::subtract()),
        Arc::new(arithmetic::multiply()),
        Arc::new(arithmetic::divide()),
    ]
}
