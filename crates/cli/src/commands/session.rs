//! Agent construction shared by `chat` and `query`.

use std::path::PathBuf;
use std::sync::Arc;
use toolloop_agent::{Agent, AgentResponse, ContextAgent, ToolMapper};
use toolloop_config::AppConfig;
use toolloop_core::error::ToolError;
use toolloop_core::provider::Provider;
use toolloop_core::retrieval::RetrievedFragment;
use toolloop_core::tool::{Tool, ToolSet};
use toolloop_index::InMemoryIndex;
use tracing::info;

/// Command-line overrides on top of the config file.
pub struct SessionOptions {
    pub context_dir: Option<PathBuf>,
    pub retrieve_tools: bool,
    pub verbose: bool,
}

/// A plain agent, or one that augments messages with retrieved context.
pub enum Session {
    Plain(Agent),
    Augmented(ContextAgent),
}

impl Session {
    pub async fn respond(&mut self, message: &str) -> toolloop_core::Result<AgentResponse> {
        match self {
            Session::Plain(agent) => agent.respond(message).await,
            Session::Augmented(agent) => agent.respond(message).await,
        }
    }

    pub async fn query(&self, query: &str) -> toolloop_core::Result<AgentResponse> {
        match self {
            Session::Plain(agent) => agent.query(query).await,
            Session::Augmented(agent) => agent.query(query).await,
        }
    }

    pub fn reset(&mut self) {
        match self {
            Session::Plain(agent) => agent.reset(),
            Session::Augmented(agent) => agent.reset(),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Session::Plain(_) => "plain",
            Session::Augmented(_) => "context-augmented",
        }
    }
}

/// Load config, apply overrides and fail early without an API key.
pub fn load_config(options: &SessionOptions) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    config.agent.verbose |= options.verbose;
    if options.context_dir.is_some() {
        config.context.documents_dir = options.context_dir.clone();
    }
    config.tool_retrieval.enabled |= options.retrieve_tools;
    config
        .validate()
        .map_err(|e| format!("Invalid options: {e}"))?;

    if config.api_key.is_none() && config.provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    TOOLLOOP_API_KEY    = 'sk-...'   (generic)");
        eprintln!("    OPENAI_API_KEY      = 'sk-...'   (OpenAI)");
        eprintln!("    OPENROUTER_API_KEY  = 'sk-or-...' (OpenRouter)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    Ok(config)
}

/// Build the session described by `config` around `provider`.
pub async fn build_session(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let tools = toolloop_tools::builtin_tools();

    let mut builder = Agent::builder()
        .provider(provider)
        .model(config.model.clone())
        .temperature(config.temperature)
        .config(config.agent.clone());
    if let Some(max_tokens) = config.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }

    if config.tool_retrieval.enabled {
        let index = InMemoryIndex::from_tools(&tools).with_top_k(config.tool_retrieval.top_k);
        builder = builder.tool_retriever(Arc::new(index), tool_mapper(&tools)?);
    } else {
        builder = builder.tools(tools);
    }

    let Some(dir) = &config.context.documents_dir else {
        return Ok(Session::Plain(builder.build()?));
    };

    let index = InMemoryIndex::load_dir(dir)
        .await?
        .with_top_k(config.context.top_k);
    info!(dir = %dir.display(), documents = index.len().await, "Loaded context documents");

    let mut context = ContextAgent::builder(Arc::new(index), builder)
        .separator(config.context.separator.clone());
    if let Some(template) = &config.context.template {
        context = context.template(template.clone());
    }
    Ok(Session::Augmented(context.build()?))
}

/// Map fragments of a tool-description index back to the tools.
fn tool_mapper(tools: &[Arc<dyn Tool>]) -> Result<Arc<ToolMapper>, ToolError> {
    let set = ToolSet::new(tools.to_vec())?;
    Ok(Arc::new(
        move |fragment: &RetrievedFragment| -> Result<Arc<dyn Tool>, ToolError> {
            set.get(&fragment.source).cloned()
        },
    ))
}
