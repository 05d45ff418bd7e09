//! Shared test helpers for agent tests.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use toolloop_core::error::{ProviderError, RetrievalError, ToolError};
use toolloop_core::message::{Message, ToolCallRequest};
use toolloop_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use toolloop_core::retrieval::{RetrievedFragment, Retriever};
use toolloop_core::tool::{Tool, ToolResult};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request it was given.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that first requests a tool, then answers.
    pub fn tool_then_answer(name: &str, args: serde_json::Value, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(name, args),
            make_text_response(answer),
        ])
    }

    /// Create a provider that requests the same tool `times` times in a row.
    pub fn always_tool(name: &str, args: serde_json::Value, times: usize) -> Self {
        Self::new((0..times).map(|_| make_tool_call_response(name, args.clone())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        let count = requests.len();
        if count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                count,
                responses.len()
            );
        }

        requests.push(request);
        Ok(responses[count].clone())
    }
}

/// A provider that always fails.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

fn mock_usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool call).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}

/// Create a response that requests one tool call with no content.
pub fn make_tool_call_response(name: &str, args: serde_json::Value) -> ProviderResponse {
    make_raw_tool_call_response(name, &serde_json::to_string(&args).unwrap())
}

/// Create a tool-call response with a verbatim argument payload.
pub fn make_raw_tool_call_response(name: &str, raw_args: &str) -> ProviderResponse {
    let call = ToolCallRequest::new(name, raw_args).with_id(format!("call_{name}"));
    ProviderResponse {
        message: Message::assistant_tool_call(None, call),
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}

/// `add(a, b)` over integers, counting its invocations.
#[derive(Default)]
pub struct AddTool {
    pub calls: AtomicUsize,
}

impl AddTool {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Add two integers and return the result"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "a": { "type": "integer" },
                "b": { "type": "integer" }
            },
            "required": ["a", "b"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let a = arguments["a"].as_i64().unwrap_or(0);
        let b = arguments["b"].as_i64().unwrap_or(0);
        Ok(ToolResult::ok((a + b).to_string()))
    }
}

/// A tool whose body always fails.
pub struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "broken".into(),
            reason: "disk on fire".into(),
        })
    }
}

/// A tool that sleeps for a minute before answering.
pub struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Takes its time"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        Ok(ToolResult::ok("finally"))
    }
}

/// A named tool with a fixed output, for retrieval-driven tests.
pub struct NamedTool(pub String);

#[async_trait]
impl Tool for NamedTool {
    fn name(&self) -> &str {
        &self.0
    }

    fn description(&self) -> &str {
        "Returns its own name"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::ok(self.0.clone()))
    }
}

/// A retriever that returns fixed fragments and records every query.
pub struct RecordingRetriever {
    fragments: Vec<RetrievedFragment>,
    queries: Mutex<Vec<String>>,
}

impl RecordingRetriever {
    pub fn new(fragments: Vec<RetrievedFragment>) -> Self {
        Self {
            fragments,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Fragments from `(source, content)` pairs, scored descending.
    pub fn with_texts(texts: &[(&str, &str)]) -> Self {
        let n = texts.len() as f32;
        Self::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, (source, content))| RetrievedFragment::new(*source, *content, n - i as f32))
                .collect(),
        )
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for RecordingRetriever {
    fn name(&self) -> &str {
        "recording"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedFragment>, RetrievalError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.fragments.clone())
    }
}

/// A retriever that always fails.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &str {
        "failing"
    }

    async fn retrieve(&self, _query: &str) -> Result<Vec<RetrievedFragment>, RetrievalError> {
        Err(RetrievalError::Unavailable("index offline".into()))
    }
}

pub fn add_tool() -> Arc<AddTool> {
    Arc::new(AddTool::default())
}
