//! Context augmentation: retrieve, rewrite, then delegate to an [`Agent`].
//!
//! # Flow
//!
//! 1. Retrieve fragments for the user's original message
//! 2. Join their contents with the separator
//! 3. Render `{context_str}` and `{query_str}` into the prompt template
//! 4. Hand the rewritten message to the inner agent's loop

use chrono::Utc;
use std::sync::Arc;
use toolloop_core::event::AgentEvent;
use toolloop_core::message::Transcript;
use toolloop_core::retrieval::Retriever;
use toolloop_core::{Error, Result};
use tracing::{debug, info};

use crate::blocking::block_on;
use crate::engine::{Agent, AgentBuilder};
use crate::loop_runner::AgentResponse;
use crate::prompt::PromptTemplate;

/// An agent that grounds each message in retrieved context.
pub struct ContextAgent {
    inner: Agent,
    retriever: Arc<dyn Retriever>,
    template: PromptTemplate,
    separator: String,
}

impl ContextAgent {
    /// Start building around `retriever`; the agent is configured via `agent`.
    pub fn builder(retriever: Arc<dyn Retriever>, agent: AgentBuilder) -> ContextAgentBuilder {
        ContextAgentBuilder {
            retriever,
            agent,
            template: None,
            separator: "\n".to_string(),
        }
    }

    /// Rewrite `message` with context retrieved for it.
    pub async fn augment(&self, message: &str) -> Result<String> {
        let fragments = self.retriever.retrieve(message).await?;

        let context = fragments
            .iter()
            .map(|f| f.content.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator);
        let prompt = self.template.render(&context, message);

        if self.inner.config().verbose {
            info!(fragments = fragments.len(), prompt = %prompt, "Augmented prompt");
        } else {
            debug!(fragments = fragments.len(), "Augmented prompt");
        }
        self.inner.runner().publish(AgentEvent::PromptAugmented {
            fragments: fragments.len(),
            prompt: prompt.clone(),
            timestamp: Utc::now(),
        });

        Ok(prompt)
    }

    pub async fn respond(&mut self, message: &str) -> Result<AgentResponse> {
        let prompt = self.augment(message).await?;
        self.inner.respond(&prompt).await
    }

    pub async fn respond_in(
        &self,
        message: &str,
        transcript: &mut Transcript,
    ) -> Result<AgentResponse> {
        let prompt = self.augment(message).await?;
        self.inner.respond_in(&prompt, transcript).await
    }

    pub async fn query(&self, query: &str) -> Result<AgentResponse> {
        let prompt = self.augment(query).await?;
        self.inner.query(&prompt).await
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

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn transcript(&self) -> &Transcript {
        self.inner.transcript()
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn agent(&self) -> &Agent {
        &self.inner
    }
}

/// Builder for [`ContextAgent`].
pub struct ContextAgentBuilder {
    retriever: Arc<dyn Retriever>,
    agent: AgentBuilder,
    template: Option<String>,
    separator: String,
}

impl ContextAgentBuilder {
    /// Use a custom template with `{context_str}` and `{query_str}` slots.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// String placed between retrieved fragments. Defaults to `"\n"`.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn build(self) -> Result<ContextAgent> {
        let template = match self.template {
            Some(t) => PromptTemplate::new(t)?,
            None => PromptTemplate::default(),
        };

        if self.agent.has_dynamic_tools() {
            return Err(Error::config(
                "Context agents only support a static tool list",
            ));
        }

        Ok(ContextAgent {
            inner: self.agent.build()?,
            retriever: self.retriever,
            template,
            separator: self.separator,
        })
    }
}
