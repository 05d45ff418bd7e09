//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, OpenRouter, Ollama and any endpoint exposing
//! `/v1/chat/completions` with function calling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use toolloop_core::error::ProviderError;
use toolloop_core::message::{Message, Role, ToolCallRequest};
use toolloop_core::provider::*;
use tracing::{debug, warn};

/// Request timeout for one completion call.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Result<Self, ProviderError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert transcript messages to the OpenAI wire format.
    ///
    /// Tool results carrying a call id use role `tool`; without one they
    /// fall back to the legacy `function` role keyed by name. A call id is
    /// only sent when the next message answers it, since the API rejects
    /// `tool_calls` left without a result (ceiling stop, aborted dispatch).
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let answered_id = messages
                    .get(i + 1)
                    .filter(|next| next.role == Role::Tool)
                    .and_then(|next| next.tool_call_id.as_deref());
                Self::to_api_message(m, answered_id)
            })
            .collect()
    }

    fn to_api_message(m: &Message, answered_id: Option<&str>) -> ApiMessage {
        let mut msg = ApiMessage {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            }
            .into(),
            content: m.content.clone(),
            tool_calls: None,
            function_call: None,
            tool_call_id: None,
            name: None,
        };

        match m.role {
            Role::Assistant => {
                if let Some(call) = &m.tool_call {
                    let function = ApiFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    };
                    match call.id.as_deref().filter(|id| answered_id == Some(*id)) {
                        Some(id) => {
                            msg.tool_calls = Some(vec![ApiToolCall {
                                id: Some(id.to_string()),
                                r#type: "function".into(),
                                function,
                            }])
                        }
                        None => msg.function_call = Some(function),
                    }
                }
            }
            Role::Tool => match &m.tool_call_id {
                Some(id) => msg.tool_call_id = Some(id.clone()),
                None => {
                    msg.role = "function".into();
                    msg.name = m.tool_name.clone();
                }
            },
            Role::System | Role::User => {}
        }
        msg
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = serde_json::json!("auto");
        }
        body
    }

    /// Turn a parsed API response into one assistant message.
    ///
    /// Only the first tool call is kept.
    fn from_api_response(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::EmptyResponse("No choices in response".into()))?;

        let ApiMessage {
            content,
            tool_calls,
            function_call,
            ..
        } = choice.message;

        let mut calls = tool_calls.unwrap_or_default();
        if calls.len() > 1 {
            warn!(count = calls.len(), "Provider returned parallel tool calls, keeping the first");
        }

        let tool_call = if calls.is_empty() {
            function_call.map(|f| ToolCallRequest::new(f.name, f.arguments))
        } else {
            let first = calls.swap_remove(0);
            let call = ToolCallRequest::new(first.function.name, first.function.arguments);
            Some(match first.id {
                Some(id) => call.with_id(id),
                None => call,
            })
        };

        let message = match tool_call {
            Some(call) => Message::assistant_tool_call(content, call),
            None => Message::assistant_reply(content),
        };

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            usage,
            model: api_response.model,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            warn!(provider = %self.name, retry_after_secs, "Provider rate limited request");
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::from_api_response(api_response)
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<ApiFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default = "default_call_type")]
    r#type: String,
    function: ApiFunction,
}

fn default_call_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
