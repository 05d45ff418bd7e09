//! Arithmetic tools: `add`, `subtract`, `multiply`, `divide`.
//!
//! Each takes two numbers `a` and `b`. Integral results are printed
//! without a trailing `.0`.

use serde::Deserialize;
use toolloop_core::tool::ToolResult;

use crate::function::FunctionTool;

#[derive(Debug, Deserialize)]
struct Operands {
    a: f64,
    b: f64,
}

fn operands_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "a": { "type": "number", "description": "The first operand" },
            "b": { "type": "number", "description": "The second operand" }
        },
        "required": ["a", "b"]
    })
}

/// Format a number, dropping the fraction for integral values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn number_result(value: f64) -> ToolResult {
    ToolResult {
        data: Some(serde_json::json!({ "result": value })),
        ..ToolResult::ok(format_number(value))
    }
}

fn binary(name: &str, description: &str, op: fn(f64, f64) -> f64) -> FunctionTool {
    FunctionTool::typed(name, description, operands_schema(), move |o: Operands| {
        Ok(number_result(op(o.a, o.b)))
    })
}

pub fn add() -> FunctionTool {
    binary("add", "Add two numbers and return the result", |a, b| a + b)
}

pub fn subtract() -> FunctionTool {
    binary("subtract", "Subtract b from a and return the result", |a, b| a - b)
}

pub fn multiply() -> FunctionTool {
    binary("multiply", "Multiply two numbers and return the result", |a, b| a * b)
}

/// Division by zero is a soft failure the model can react to.
pub fn divide() -> FunctionTool {
    FunctionTool::typed(
        "divide",
        "Divide a by b and return the result",
        operands_schema(),
        |o: Operands| {
            if o.b == 0.0 {
                return Ok(ToolResult::failure("Error: Division by zero"));
            }
            Ok(number_result(o.a / o.b))
        },
    )
}
