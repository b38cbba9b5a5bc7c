//! OpenAI-compatible Chat Completions API provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ChatModel;
use crate::{
    error::{Error, Result},
    types::{Completion, Context, Message, ToolCall},
};

/// Default base URL for the OpenAI API
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Settings for an OpenAI-compatible chat model
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// Model id (e.g. "gpt-4o")
    pub model: String,
    /// Base URL, without the trailing `/chat/completions`
    pub base_url: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum tokens per response
    pub max_tokens: Option<u32>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// OpenAI-compatible chat completions client
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    settings: OpenAiSettings,
}

impl OpenAiChatModel {
    /// Create a new client with an API key
    pub fn new(api_key: impl Into<String>, settings: OpenAiSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            settings,
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable
    pub fn from_env(settings: OpenAiSettings) -> Result<Self> {
        let api_key = super::get_api_key(None, "OPENAI_API_KEY")?;
        Ok(Self::new(api_key, settings))
    }

    fn build_request(&self, context: &Context) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(context.messages.len() + 1);

        // The windowed list already starts with the system message; only add
        // one if the caller handed us a bare history.
        if !context.messages.first().is_some_and(Message::is_system)
            && !context.system_prompt.is_empty()
        {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(context.system_prompt.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        messages.extend(pair_tool_messages(&context.messages));

        let tools = if context.tools.is_empty() {
            None
        } else {
            Some(
                context
                    .tools
                    .iter()
                    .map(|t| OpenAITool {
                        tool_type: "function".to_string(),
                        function: OpenAIFunction {
                            name: t.name.clone(),
                            description: Some(t.description.clone()),
                            parameters: Some(t.parameters.clone()),
                        },
                    })
                    .collect(),
            )
        };

        let has_tools = tools.is_some();
        OpenAIRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            tools,
            tool_choice: has_tools.then(|| serde_json::json!("auto")),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn invoke(&self, context: &Context) -> Result<Completion> {
        let request = self.build_request(context);
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        tracing::debug!(
            model = %self.settings.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(Error::RateLimited { retry_after });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::InvalidApiKey);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status.as_u16(), &text));
        }

        let body: OpenAIResponse = response.json().await?;
        parse_response(body)
    }

    fn model_id(&self) -> &str {
        &self.settings.model
    }
}

fn convert_message(msg: &Message) -> OpenAIMessage {
    match msg {
        Message::System { content, .. } => OpenAIMessage {
            role: "system".to_string(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        Message::User { content, .. } => OpenAIMessage {
            role: "user".to_string(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        Message::Assistant {
            content,
            tool_calls,
            ..
        } => OpenAIMessage {
            role: "assistant".to_string(),
            content: if content.is_empty() {
                None
            } else {
                Some(content.clone())
            },
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(
                    tool_calls
                        .iter()
                        .map(|tc| OpenAIToolCall {
                            id: tc.id.clone(),
                            call_type: "function".to_string(),
                            function: OpenAIFunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.args.to_string(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: None,
        },
        Message::Tool {
            tool_call_id,
            content,
            ..
        } => OpenAIMessage {
            role: "tool".to_string(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.clone()),
        },
    }
}

/// Placeholder answer for a call whose result fell outside the window
const UNANSWERED_TOOL_CALL: &str = "Tool call was not executed.";

/// Convert messages so every tool message answers a call of the preceding
/// assistant message and every call gets an answer. Windowing can cut an
/// assistant message off from its results; the API rejects both cases.
fn pair_tool_messages(messages: &[Message]) -> Vec<OpenAIMessage> {
    fn answer_open(open: &mut Vec<String>, out: &mut Vec<OpenAIMessage>) {
        for id in open.drain(..) {
            out.push(OpenAIMessage {
                role: "tool".to_string(),
                content: Some(UNANSWERED_TOOL_CALL.to_string()),
                tool_calls: None,
                tool_call_id: Some(id),
            });
        }
    }

    let mut out = Vec::with_capacity(messages.len());
    let mut open: Vec<String> = Vec::new();

    for msg in messages {
        match msg {
            Message::Tool { tool_call_id, .. } => {
                match open.iter().position(|id| id == tool_call_id) {
                    Some(index) => {
                        open.remove(index);
                        out.push(convert_message(msg));
                    }
                    None => {
                        tracing::debug!(tool_call_id = %tool_call_id, "Dropping orphan tool message");
                    }
                }
            }
            Message::Assistant { tool_calls, .. } => {
                answer_open(&mut open, &mut out);
                out.push(convert_message(msg));
                open.extend(tool_calls.iter().map(|tc| tc.id.clone()));
            }
            _ => {
                answer_open(&mut open, &mut out);
                out.push(convert_message(msg));
            }
        }
    }
    answer_open(&mut open, &mut out);
    out
}

fn parse_response(body: OpenAIResponse) -> Result<Completion> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("response has no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let args = if tc.function.arguments.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&tc.function.arguments).map_err(|e| {
                    Error::UnexpectedResponse(format!(
                        "tool call '{}' has malformed arguments: {}",
                        tc.function.name, e
                    ))
                })?
            };
            Ok(ToolCall::new(tc.id, tc.function.name, args))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

fn parse_api_error(status: u16, text: &str) -> Error {
    match serde_json::from_str::<OpenAIErrorEnvelope>(text) {
        Ok(envelope) => Error::api(
            envelope
                .error
                .error_type
                .unwrap_or_else(|| format!("http_{}", status)),
            envelope.error.message,
        ),
        Err(_) => Error::api(format!("http_{}", status), text.to_string()),
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorEnvelope {
    error: OpenAIErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}
