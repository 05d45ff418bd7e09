//! The agent reasoning loop implementation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use toolloop_core::agent::{LoopConfig, ToolErrorPolicy};
use toolloop_core::error::ToolError;
use toolloop_core::event::{AgentEvent, EventBus};
use toolloop_core::message::{Message, ToolCallRequest, Transcript};
use toolloop_core::model::SupportedModel;
use toolloop_core::provider::{Provider, ProviderRequest, ToolDefinition, Usage};
use toolloop_core::tool::{ToolResult, ToolSet};
use tracing::{debug, info, warn};

use crate::resolver::ToolResolver;

/// One tool invocation performed during a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// The tool that ran
    pub name: String,
    /// Decoded arguments it received
    pub arguments: serde_json::Value,
    /// Text fed back to the model
    pub output: String,
    /// Whether the tool reported success
    pub success: bool,
}

/// The final answer of one `respond` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Content of the last assistant message, as the model returned it.
    /// May be `None` when the turn ended at the ceiling on a bare tool call.
    pub content: Option<String>,
    /// Tool invocations made during the turn, in order
    pub tool_calls: Vec<ToolInvocation>,
    /// Token usage summed over every model call of the turn
    pub usage: Usage,
    /// True when the tool-call ceiling ended the turn
    pub ceiling_reached: bool,
}

impl AgentResponse {
    /// The content as a string slice, empty when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

impl std::fmt::Display for AgentResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// Decode a raw tool-call payload into a JSON argument object.
///
/// An empty payload means "no arguments". Anything else must parse as a
/// JSON object.
pub fn decode_arguments(raw: &str) -> Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }

    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ToolError::InvalidArguments(format!("{e} in payload {raw:?}")))?;

    if !value.is_object() {
        return Err(ToolError::InvalidArguments(format!(
            "expected a JSON object, got {raw:?}"
        )));
    }
    Ok(value)
}

/// The core loop that alternates model calls and tool execution.
///
/// Stateless between calls: the transcript is passed in by the caller.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: SupportedModel,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// Picks the tools offered to the model each turn
    resolver: Arc<dyn ToolResolver>,

    /// Ceiling, verbosity, tool error policy
    config: LoopConfig,

    /// Optional diagnostic side channel
    event_bus: Option<Arc<EventBus>>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: SupportedModel,
        resolver: Arc<dyn ToolResolver>,
        config: LoopConfig,
    ) -> Self {
        Self {
            provider,
            model,
            temperature: toolloop_core::provider::default_temperature(),
            max_tokens: None,
            resolver,
            config,
            event_bus: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: Option<u32>) -> Self {
        self.max_tokens = max;
        self
    }

    /// Publish diagnostic events to `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn model(&self) -> SupportedModel {
        self.model
    }

    pub(crate) fn publish(&self, event: AgentEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    /// Run one turn: `message` in, final answer out.
    ///
    /// Everything sent to or received from the model is appended to
    /// `transcript`, including the messages of a turn that ends in an error.
    pub async fn run(
        &self,
        message: &str,
        transcript: &mut Transcript,
    ) -> Result<AgentResponse, toolloop_core::Error> {
        let tools = self.resolver.resolve(message).await?;
        let definitions = tools.definitions();

        info!(
            transcript_id = %transcript.id,
            history = transcript.len(),
            tools = tools.len(),
            "Processing message"
        );
        self.publish(AgentEvent::TurnStarted {
            transcript_id: transcript.id.to_string(),
            tools: tools.names().into_iter().map(String::from).collect(),
            timestamp: Utc::now(),
        });

        transcript.push(Message::user(message));

        let mut usage = Usage::default();
        let mut invocations: Vec<ToolInvocation> = Vec::new();
        let mut iteration = 0u32;

        loop {
            iteration += 1;
            debug!(
                transcript_id = %transcript.id,
                iteration = iteration,
                "Agent loop iteration"
            );

            let reply = self.call_model(transcript, &definitions, &mut usage).await?;
            let content = reply.content.clone();

            let Some(call) = reply.tool_call else {
                info!(
                    transcript_id = %transcript.id,
                    tool_calls = invocations.len(),
                    total_tokens = usage.total_tokens,
                    "Final answer produced"
                );
                return Ok(AgentResponse {
                    content,
                    tool_calls: invocations,
                    usage,
                    ceiling_reached: false,
                });
            };

            if invocations.len() as u32 >= self.config.max_tool_calls {
                warn!(
                    transcript_id = %transcript.id,
                    max_tool_calls = self.config.max_tool_calls,
                    pending_tool = %call.name,
                    "Exceeded max tool calls, returning last assistant message"
                );
                self.publish(AgentEvent::CeilingReached {
                    transcript_id: transcript.id.to_string(),
                    max_tool_calls: self.config.max_tool_calls,
                    pending_tool: call.name.clone(),
                    timestamp: Utc::now(),
                });
                return Ok(AgentResponse {
                    content,
                    tool_calls: invocations,
                    usage,
                    ceiling_reached: true,
                });
            }

            let invocation = self.dispatch(&tools, call, transcript).await?;
            invocations.push(invocation);
        }
    }

    /// Send the transcript to the model and append its reply.
    ///
    /// Returns a copy of the appended assistant message.
    async fn call_model(
        &self,
        transcript: &mut Transcript,
        definitions: &[ToolDefinition],
        usage: &mut Usage,
    ) -> Result<Message, toolloop_core::Error> {
        let request = ProviderRequest {
            model: self.model.to_string(),
            messages: transcript.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: definitions.to_vec(),
        };

        let response = self.provider.complete(request).await?;

        if let Some(turn_usage) = response.usage {
            *usage += turn_usage;
        }
        self.publish(AgentEvent::ModelResponded {
            transcript_id: transcript.id.to_string(),
            model: response.model.clone(),
            requested_tool: response.message.tool_call.as_ref().map(|c| c.name.clone()),
            usage: response.usage,
            timestamp: Utc::now(),
        });

        let reply = response.message;
        transcript.push(reply.clone());
        Ok(reply)
    }

    /// Resolve, decode and run one tool call, appending its result.
    async fn dispatch(
        &self,
        tools: &ToolSet,
        call: ToolCallRequest,
        transcript: &mut Transcript,
    ) -> Result<ToolInvocation, toolloop_core::Error> {
        let tool = tools.get(&call.name)?;
        let arguments = decode_arguments(&call.arguments)?;

        if self.config.verbose {
            info!(tool = %call.name, arguments = %call.arguments, "Calling tool");
        } else {
            debug!(tool = %call.name, arguments = %call.arguments, "Calling tool");
        }

        let start = std::time::Instant::now();
        let outcome = tool.execute(arguments.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.publish(AgentEvent::ToolExecuted {
            tool_name: call.name.clone(),
            success: matches!(&outcome, Ok(r) if r.success),
            duration_ms,
            timestamp: Utc::now(),
        });

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                match self.config.tool_error_policy {
                    ToolErrorPolicy::Propagate => return Err(e.into()),
                    ToolErrorPolicy::ReportToModel => ToolResult::failure(format!("Error: {e}")),
                }
            }
        };

        if self.config.verbose {
            info!(tool = %call.name, output = %result.output, "Tool returned");
        } else {
            debug!(tool = %call.name, success = result.success, "Tool returned");
        }

        transcript.push(Message::tool_result(
            &call.name,
            call.id.clone(),
            &result.output,
        ));

        Ok(ToolInvocation {
            name: call.name,
            arguments,
            output: result.output,
            success: result.success,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticTools;
    use crate::test_helpers::*;
    use toolloop_core::error::{Error, ProviderError};
    use toolloop_core::message::Role;
    use toolloop_core::tool::Tool;

    fn runner(provider: Arc<dyn Provider>, tools: Vec<Arc<dyn Tool>>, config: LoopConfig) -> AgentLoop {
        let resolver = Arc::new(StaticTools::new(tools).unwrap());
        AgentLoop::new(provider, SupportedModel::default(), resolver, config)
    }

    #[test]
    fn decode_empty_payload_is_empty_object() {
        assert_eq!(decode_arguments("  ").unwrap(), serde_json::json!({}));
    }

    #[test]
    fn decode_rejects_malformed_and_non_objects() {
        assert!(matches!(decode_arguments("{\"a\": 2,"), Err(ToolError::InvalidArguments(_))));
        assert!(matches!(decode_arguments("[1, 2]"), Err(ToolError::InvalidArguments(_))));
        assert_eq!(
            decode_arguments(r#"{"a": 2, "b": 3}"#).unwrap(),
            serde_json::json!({"a": 2, "b": 3})
        );
    }

    #[tokio::test]
    async fn simple_text_response() {
        let provider = Arc::new(SequentialMockProvider::single_text("Hello! How can I help?"));
        let agent = runner(provider.clone(), vec![], LoopConfig::default());

        let mut transcript = Transcript::new();
        let response = agent.run("Hello!", &mut transcript).await.unwrap();

        assert_eq!(response.content.as_deref(), Some("Hello! How can I help?"));
        assert!(!response.ceiling_reached);
        assert_eq!(provider.call_count(), 1);
        // User + Assistant
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].role, Role::User);
        assert_eq!(transcript.messages()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn add_scenario_produces_four_messages() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            "add",
            serde_json::json!({"a": 2, "b": 3}),
            "5",
        ));
        let add = add_tool();
        let agent = runner(provider.clone(), vec![add.clone()], LoopConfig::default());

        let mut transcript = Transcript::new();
        let response = agent.run("What is 2 + 3?", &mut transcript).await.unwrap();

        assert_eq!(response.text(), "5");
        assert_eq!(add.calls(), 1);
        assert_eq!(transcript.len(), 4);

        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);

        let tool_msg = &transcript.messages()[2];
        assert_eq!(tool_msg.text(), "5");
        assert_eq!(tool_msg.tool_name.as_deref(), Some("add"));
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_add"));

        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].arguments, serde_json::json!({"a": 2, "b": 3}));
        assert_eq!(response.usage.total_tokens, 30);
    }

    #[tokio::test]
    async fn every_model_call_sees_the_whole_transcript_and_tools() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            "add",
            serde_json::json!({"a": 1, "b": 1}),
            "2",
        ));
        let agent = runner(provider.clone(), vec![add_tool()], LoopConfig::default());

        let mut transcript = Transcript::new();
        agent.run("1+1?", &mut transcript).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[0].model, "gpt-3.5-turbo-0613");
        for req in &requests {
            assert_eq!(req.tools.len(), 1);
            assert_eq!(req.tools[0].name, "add");
        }
    }

    #[tokio::test]
    async fn ceiling_stops_after_exactly_n_invocations() {
        for n in [1u32, 3, 5] {
            let provider = Arc::new(SequentialMockProvider::always_tool(
                "add",
                serde_json::json!({"a": 1, "b": 2}),
                n as usize + 1,
            ));
            let add = add_tool();
            let config = LoopConfig { max_tool_calls: n, ..LoopConfig::default() };
            let agent = runner(provider.clone(), vec![add.clone()], config);

            let mut transcript = Transcript::new();
            let response = agent.run("loop forever", &mut transcript).await.unwrap();

            assert_eq!(add.calls(), n as usize, "ceiling {n}");
            assert_eq!(provider.call_count(), n as usize + 1);
            assert!(response.ceiling_reached);
            assert_eq!(response.tool_calls.len(), n as usize);
            // The pending request stays in the transcript, unanswered.
            let last = transcript.last().unwrap();
            assert_eq!(last.role, Role::Assistant);
            assert!(last.tool_call.is_some());
            assert!(response.content.is_none());
        }
    }

    #[tokio::test]
    async fn unknown_tool_aborts_turn() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(
            "multiply",
            serde_json::json!({"a": 2, "b": 3}),
        )]));
        let agent = runner(provider, vec![add_tool()], LoopConfig::default());

        let mut transcript = Transcript::new();
        let err = agent.run("2*3?", &mut transcript).await.unwrap_err();

        assert!(matches!(err, Error::Tool(ToolError::NotFound(ref name)) if name == "multiply"));
        // User message and the offending assistant message were still recorded.
        assert_eq!(transcript.len(), 2);
        assert!(transcript.last().unwrap().tool_call.is_some());
    }

    #[tokio::test]
    async fn malformed_arguments_abort_turn() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_raw_tool_call_response(
            "add",
            "{\"a\": 2, \"b\":",
        )]));
        let add = add_tool();
        let agent = runner(provider, vec![add.clone()], LoopConfig::default());

        let mut transcript = Transcript::new();
        let err = agent.run("2+?", &mut transcript).await.unwrap_err();

        assert!(matches!(err, Error::Tool(ToolError::InvalidArguments(_))));
        assert_eq!(add.calls(), 0);
    }

    #[tokio::test]
    async fn tool_failure_propagates_by_default() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(
            "broken",
            serde_json::json!({}),
        )]));
        let agent = runner(provider.clone(), vec![Arc::new(BrokenTool)], LoopConfig::default());

        let mut transcript = Transcript::new();
        let err = agent.run("try it", &mut transcript).await.unwrap_err();

        assert!(matches!(err, Error::Tool(ToolError::ExecutionFailed { .. })));
        assert_eq!(provider.call_count(), 1);
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn tool_failure_reported_to_model_when_configured() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            "broken",
            serde_json::json!({}),
            "The tool failed, sorry.",
        ));
        let config = LoopConfig {
            tool_error_policy: ToolErrorPolicy::ReportToModel,
            ..LoopConfig::default()
        };
        let agent = runner(provider.clone(), vec![Arc::new(BrokenTool)], config);

        let mut transcript = Transcript::new();
        let response = agent.run("try it", &mut transcript).await.unwrap();

        assert_eq!(response.text(), "The tool failed, sorry.");
        assert_eq!(transcript.len(), 4);
        let tool_msg = &transcript.messages()[2];
        assert!(tool_msg.text().starts_with("Error: "));
        assert!(tool_msg.text().contains("disk on fire"));
        assert!(!response.tool_calls[0].success);

        // The second model call saw the error text.
        let second = &provider.requests()[1];
        assert!(second.messages[2].text().contains("disk on fire"));
    }

    #[tokio::test]
    async fn provider_error_propagates_after_user_message() {
        let agent = runner(Arc::new(FailingProvider), vec![], LoopConfig::default());

        let mut transcript = Transcript::new();
        let err = agent.run("hello", &mut transcript).await.unwrap_err();

        assert!(matches!(err, Error::Provider(ProviderError::Network(_))));
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_turn_keeps_messages_appended_so_far() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            "slow",
            serde_json::json!({}),
            "done",
        ));
        let agent = runner(provider.clone(), vec![Arc::new(SlowTool)], LoopConfig::default());

        let mut transcript = Transcript::new();
        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            agent.run("take your time", &mut transcript),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(provider.call_count(), 1);
        // User message and the assistant's tool request, no tool result.
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].text(), "take your time");
        let last = transcript.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.tool_call.as_ref().unwrap().name, "slow");
    }

    #[tokio::test]
    async fn existing_prefix_is_never_modified() {
        let history = vec![
            Message::system("You are a calculator."),
            Message::user("hi"),
            Message::assistant("hello"),
        ];
        let ids: Vec<String> = history.iter().map(|m| m.id.clone()).collect();

        // One successful turn and one failing turn on the same transcript.
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response("add", serde_json::json!({"a": 2, "b": 3})),
            make_text_response("5"),
            make_tool_call_response("missing", serde_json::json!({})),
        ]));
        let agent = runner(provider, vec![add_tool()], LoopConfig::default());
        let mut transcript = Transcript::from(history);

        agent.run("2+3", &mut transcript).await.unwrap();
        let after_first: Vec<String> = transcript.messages().iter().map(|m| m.id.clone()).collect();
        assert!(agent.run("again", &mut transcript).await.is_err());

        let after_second: Vec<String> = transcript.messages().iter().map(|m| m.id.clone()).collect();
        assert_eq!(&after_first[..3], &ids[..]);
        assert_eq!(&after_second[..after_first.len()], &after_first[..]);
        assert_eq!(after_second.len(), after_first.len() + 2);
    }

    #[tokio::test]
    async fn events_are_published_when_bus_attached() {
        let provider = Arc::new(SequentialMockProvider::always_tool(
            "add",
            serde_json::json!({"a": 1, "b": 1}),
            2,
        ));
        let bus = Arc::new(EventBus::new(32));
        let mut rx = bus.subscribe();
        let config = LoopConfig { max_tool_calls: 1, ..LoopConfig::default() };
        let agent = runner(provider, vec![add_tool()], config).with_event_bus(bus);

        let mut transcript = Transcript::new();
        agent.run("go", &mut transcript).await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                AgentEvent::TurnStarted { .. } => "turn",
                AgentEvent::ModelResponded { .. } => "model",
                AgentEvent::ToolExecuted { .. } => "tool",
                AgentEvent::CeilingReached { .. } => "ceiling",
                AgentEvent::PromptAugmented { .. } => "prompt",
            });
        }
        assert_eq!(kinds, vec!["turn", "model", "tool", "model", "ceiling"]);
    }
}
