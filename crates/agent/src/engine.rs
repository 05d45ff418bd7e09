//! The chat engine: an [`AgentLoop`] paired with the conversation it owns.

use std::sync::Arc;
use toolloop_core::agent::{LoopConfig, ToolErrorPolicy};
use toolloop_core::event::EventBus;
use toolloop_core::message::{Message, Transcript};
use toolloop_core::model::SupportedModel;
use toolloop_core::provider::Provider;
use toolloop_core::retrieval::Retriever;
use toolloop_core::tool::Tool;
use toolloop_core::{Error, Result};
use tracing::debug;

use crate::blocking::block_on;
use crate::loop_runner::{AgentLoop, AgentResponse};
use crate::resolver::{RetrievedTools, StaticTools, ToolMapper, ToolResolver};

/// A function-calling agent holding one conversation.
///
/// `respond` continues the agent's own transcript. `respond_in` runs the
/// same loop against a caller-held transcript, and `query` against a fresh
/// one that is thrown away afterwards.
pub struct Agent {
    runner: AgentLoop,
    transcript: Transcript,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    /// Wrap an existing loop with an empty transcript.
    pub fn from_loop(runner: AgentLoop) -> Self {
        Self {
            runner,
            transcript: Transcript::new(),
        }
    }

    /// Send a message in the agent's own conversation.
    pub async fn respond(&mut self, message: &str) -> Result<AgentResponse> {
        self.runner.run(message, &mut self.transcript).await
    }

    /// Send a message in a caller-held conversation.
    pub async fn respond_in(
        &self,
        message: &str,
        transcript: &mut Transcript,
    ) -> Result<AgentResponse> {
        self.runner.run(message, transcript).await
    }

    /// One question in, one answer out. No history is kept.
    pub async fn query(&self, query: &str) -> Result<AgentResponse> {
        let mut scratch = Transcript::new();
        self.runner.run(query, &mut scratch).await
    }

    pub fn respond_blocking(&mut self, message: &str) -> Result<AgentResponse> {
        block_on(self.respond(message))
    }

    pub fn respond_in_blocking(
        &self,
        message: &str,
        transcript: &mut Transcript,
    ) -> Result<AgentResponse> {
        block_on(self.respond_in(message, transcript))
    }

    pub fn query_blocking(&self, query: &str) -> Result<AgentResponse> {
        block_on(self.query(query))
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        debug!(transcript_id = %self.transcript.id, "Resetting transcript");
        self.transcript.clear();
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn config(&self) -> &LoopConfig {
        self.runner.config()
    }

    pub fn model(&self) -> SupportedModel {
        self.runner.model()
    }

    pub(crate) fn runner(&self) -> &AgentLoop {
        &self.runner
    }
}

/// Builder for [`Agent`].
///
/// Exactly one tool source may be set: a static list (`tools`/`tool`), a
/// retriever with a mapper (`tool_retriever`), or a custom `resolver`.
/// With none, the agent runs with no tools.
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn Provider>>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    tools: Vec<Arc<dyn Tool>>,
    tool_retriever: Option<(Arc<dyn Retriever>, Arc<ToolMapper>)>,
    resolver: Option<Arc<dyn ToolResolver>>,
    chat_history: Vec<Message>,
    config: LoopConfig,
    event_bus: Option<Arc<EventBus>>,
}

impl AgentBuilder {
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Model id; checked against the allow-list in [`AgentBuilder::build`].
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Pick tools per turn by querying `retriever` with the user message.
    pub fn tool_retriever(mut self, retriever: Arc<dyn Retriever>, mapper: Arc<ToolMapper>) -> Self {
        self.tool_retriever = Some((retriever, mapper));
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ToolResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Seed the agent's transcript with prior messages.
    pub fn chat_history(mut self, history: Vec<Message>) -> Self {
        self.chat_history = history;
        self
    }

    pub fn max_tool_calls(mut self, max: u32) -> Self {
        self.config.max_tool_calls = max;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn tool_error_policy(mut self, policy: ToolErrorPolicy) -> Self {
        self.config.tool_error_policy = policy;
        self
    }

    /// Replace the whole loop configuration.
    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// True when tools come from a retriever or a custom resolver.
    pub(crate) fn has_dynamic_tools(&self) -> bool {
        self.tool_retriever.is_some() || self.resolver.is_some()
    }

    pub fn build(self) -> Result<Agent> {
        let model = match &self.model {
            Some(name) => name.parse::<SupportedModel>()?,
            None => SupportedModel::default(),
        };

        let provider = self
            .provider
            .ok_or_else(|| Error::config("No provider configured for agent"))?;

        if self.config.max_tool_calls == 0 {
            return Err(Error::config("max_tool_calls must be at least 1"));
        }

        let sources = usize::from(!self.tools.is_empty())
            + usize::from(self.tool_retriever.is_some())
            + usize::from(self.resolver.is_some());
        if sources > 1 {
            return Err(Error::config(
                "Choose one tool source: a tool list, a tool retriever, or a resolver",
            ));
        }

        let resolver: Arc<dyn ToolResolver> = match (self.resolver, self.tool_retriever) {
            (Some(resolver), _) => resolver,
            (None, Some((retriever, mapper))) => Arc::new(RetrievedTools::new(retriever, mapper)),
            (None, None) => Arc::new(StaticTools::new(self.tools)?),
        };

        let mut runner = AgentLoop::new(provider, model, resolver, self.config)
            .with_max_tokens(self.max_tokens);
        if let Some(temperature) = self.temperature {
            runner = runner.with_temperature(temperature);
        }
        if let Some(bus) = self.event_bus {
            runner = runner.with_event_bus(bus);
        }

        Ok(Agent {
            runner,
            transcript: Transcript::from(self.chat_history),
        })
    }
}
