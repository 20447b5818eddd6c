//! llama.cpp chat client speaking the OpenAI-compatible streaming protocol.
//!
//! Handles:
//! - Connection discovery (`/v1/models`, `/props`)
//! - Streamed chat completions with tool calling
//! - Token budget tracking from usage reports, estimated in between
//!
//! Connection state is replaced as a whole: `connect` builds a complete new
//! state and installs it only on success.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use qogito_core::budget::{TokenBudget, estimate_tokens};
use qogito_core::error::ProviderError;
use qogito_core::message::{Message, ToolCall};
use qogito_core::provider::{ChunkSink, CompletionClient, Outcome};
use qogito_core::tool::ToolDefinition;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::sse::{DONE_SENTINEL, LineBuffer, StreamAccumulator, data_payload};
use crate::transport::{TransportConfig, map_reqwest_error, trim_base_url};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ConnectionState {
    base_url: String,
    model_id: String,
    display_name: String,
    context_size: u64,
    connected: bool,
}

/// Streaming chat client for a llama.cpp server.
pub struct LlamaCppClient {
    http: reqwest::Client,
    discovery_timeout: Duration,
    state: RwLock<ConnectionState>,
    last_total_tokens: AtomicU64,
}

impl LlamaCppClient {
    pub fn new(transport: &TransportConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: transport.build_client()?,
            discovery_timeout: transport.discovery_timeout,
            state: RwLock::new(ConnectionState::default()),
            last_total_tokens: AtomicU64::new(0),
        })
    }

    fn state(&self) -> ConnectionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Discover the served model. No-op when already connected or `url` is
    /// empty. On failure the client is left fully disconnected.
    pub async fn connect(&self, url: &str) -> Result<(), ProviderError> {
        if self.is_connected() || url.is_empty() {
            return Ok(());
        }

        match self.discover(trim_base_url(url)).await {
            Ok(state) => {
                info!(
                    base_url = %state.base_url,
                    model = %state.model_id,
                    n_ctx = state.context_size,
                    "Connected to llama.cpp server"
                );
                self.install(state);
                Ok(())
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Connection failed");
                self.disconnect();
                Err(e)
            }
        }
    }

    async fn discover(&self, base_url: &str) -> Result<ConnectionState, ProviderError> {
        let response = self
            .http
            .get(format!("{base_url}/v1/models"))
            .timeout(self.discovery_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(ProviderError::Http {
                status: response.status().as_u16(),
            });
        }
        let models: ModelList = response
            .json()
            .await
            .map_err(map_reqwest_error)?;
        let model_id = models
            .data
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or(ProviderError::NoModels)?;

        Ok(ConnectionState {
            base_url: base_url.to_string(),
            display_name: display_model_name(&model_id).to_string(),
            model_id,
            context_size: self.fetch_context_size(base_url).await,
            connected: true,
        })
    }

    /// `n_ctx` from `/props`; 0 when the server does not report it.
    async fn fetch_context_size(&self, base_url: &str) -> u64 {
        let response = match self
            .http
            .get(format!("{base_url}/props"))
            .timeout(self.discovery_timeout)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(status = r.status().as_u16(), "No /props available");
                return 0;
            }
            Err(e) => {
                debug!(error = %e, "Failed to fetch /props");
                return 0;
            }
        };
        match response.json::<Props>().await {
            Ok(props) => props
                .default_generation_settings
                .and_then(|s| s.n_ctx)
                .unwrap_or(0),
            Err(e) => {
                debug!(error = %e, "Unreadable /props body");
                0
            }
        }
    }

    pub fn disconnect(&self) {
        self.install(ConnectionState::default());
        self.reset_token_count();
    }

    pub fn is_connected(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .connected
    }

    pub fn display_model_name(&self) -> String {
        self.state().display_name
    }

    pub fn model_id(&self) -> String {
        self.state().model_id
    }

    pub fn context_size(&self) -> u64 {
        self.state().context_size
    }

    pub fn base_url(&self) -> String {
        self.state().base_url
    }

    pub fn last_total_tokens(&self) -> u64 {
        self.last_total_tokens.load(Ordering::Relaxed)
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
        messages
            .iter()
            .map(|m| match m {
                Message::System { content } => ApiMessage::System { content },
                Message::User { content } => ApiMessage::User { content },
                Message::Assistant {
                    content,
                    tool_calls,
                } => ApiMessage::Assistant {
                    content: content.as_deref(),
                    tool_calls: tool_calls.iter().map(ApiToolCall::from).collect(),
                },
                Message::Tool {
                    tool_call_id,
                    content,
                } => ApiMessage::Tool {
                    tool_call_id,
                    content,
                },
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiTool<'_>> {
        tools
            .iter()
            .map(|t| ApiTool {
                r#type: "function",
                function: t,
            })
            .collect()
    }
}

/// Strip the split-file and `.gguf` suffixes from a model id.
pub fn display_model_name(model_id: &str) -> &str {
    model_id
        .find("-00001-of-")
        .or_else(|| model_id.find(".gguf"))
        .map_or(model_id, |i| &model_id[..i])
}

#[async_trait]
impl CompletionClient for LlamaCppClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_chunk: &mut ChunkSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ProviderError> {
        let state = self.state();
        if !state.connected {
            return Err(ProviderError::NotConnected);
        }

        let body = ChatRequest {
            messages: Self::to_api_messages(messages),
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
            tools: Self::to_api_tools(tools),
        };

        debug!(
            model = %state.model_id,
            messages = messages.len(),
            tools = tools.len(),
            "Sending streaming completion request"
        );

        let request = self
            .http
            .post(format!("{}/v1/chat/completions", state.base_url))
            .header("Accept", "text/event-stream")
            .json(&body)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Aborted),
            result = request => result.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Completion request rejected");
            return Err(ProviderError::Http {
                status: status.as_u16(),
            });
        }

        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::new();
        let mut accumulator = StreamAccumulator::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProviderError::Aborted),
                next = body.next() => next,
            };
            let Some(read) = next else { break };
            let bytes = read.map_err(map_reqwest_error)?;

            for line in lines.push(&bytes) {
                let Some(payload) = data_payload(&line) else {
                    continue;
                };
                if payload == DONE_SENTINEL {
                    return Ok(accumulator.finish());
                }

                let effect = accumulator.apply(payload)?;
                if let Some(total) = effect.total_tokens {
                    self.last_total_tokens.store(total, Ordering::Relaxed);
                }
                if let Some(text) = effect.text {
                    self.last_total_tokens
                        .fetch_add(estimate_tokens(&text), Ordering::Relaxed);
                    on_chunk(&text);
                }
            }
        }

        warn!(
            pending_bytes = lines.pending_len(),
            "Stream ended without [DONE] sentinel"
        );
        Ok(accumulator.finish())
    }

    fn token_budget(&self) -> TokenBudget {
        TokenBudget::new(self.last_total_tokens(), self.context_size())
    }

    fn reset_token_count(&self) {
        self.last_total_tokens.store(0, Ordering::Relaxed);
    }
}

// --- Wire types (internal) ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ApiMessage<'a>>,
    stream: bool,
    stream_options: StreamOptions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum ApiMessage<'a> {
    System {
        content: &'a str,
    },
    User {
        content: &'a str,
    },
    Assistant {
        /// Serialized as `null` for tool-call-only replies.
        content: Option<&'a str>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ApiToolCall<'a>>,
    },
    Tool {
        tool_call_id: &'a str,
        content: &'a str,
    },
}

#[derive(Debug, Serialize)]
struct ApiToolCall<'a> {
    id: &'a str,
    r#type: &'static str,
    function: ApiFunction<'a>,
}

impl<'a> From<&'a ToolCall> for ApiToolCall<'a> {
    fn from(call: &'a ToolCall) -> Self {
        Self {
            id: &call.id,
            r#type: "function",
            function: ApiFunction {
                name: &call.name,
                arguments: &call.arguments,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiFunction<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    r#type: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Props {
    #[serde(default)]
    default_generation_settings: Option<GenerationSettings>,
}

#[derive(Debug, Deserialize)]
struct GenerationSettings {
    #[serde(default)]
    n_ctx: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_name_strips_suffixes() {
        assert_eq!(
            display_model_name("Qwen3-Coder-30B-Q4_K_M-00001-of-00002.gguf"),
            "Qwen3-Coder-30B-Q4_K_M"
        );
        assert_eq!(display_model_name("llama-3.1-8b.gguf"), "llama-3.1-8b");
        assert_eq!(display_model_name("gpt-oss"), "gpt-oss");
    }

    #[test]
    fn assistant_without_text_serializes_null_content() {
        let history = vec![
            Message::system("sys"),
            Message::assistant_tool_calls(
                "",
                vec![ToolCall {
                    id: "call_1".into(),
                    name: "list_tools".into(),
                    arguments: "{}".into(),
                }],
            ),
            Message::tool_result("call_1", "list_tools"),
        ];
        let api = serde_json::to_value(LlamaCppClient::to_api_messages(&history)).unwrap();
        assert_eq!(
            api,
            json!([
                {"role": "system", "content": "sys"},
                {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "list_tools", "arguments": "{}"}
                    }]
                },
                {"role": "tool", "tool_call_id": "call_1", "content": "list_tools"}
            ])
        );
    }

    #[test]
    fn plain_assistant_has_no_tool_calls_key() {
        let api = serde_json::to_value(LlamaCppClient::to_api_messages(&[Message::assistant(
            "hi",
        )]))
        .unwrap();
        assert_eq!(api, json!([{"role": "assistant", "content": "hi"}]));
    }

    #[test]
    fn request_omits_empty_tools() {
        let history = [Message::user("hi")];
        let request = ChatRequest {
            messages: LlamaCppClient::to_api_messages(&history),
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
            tools: Vec::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert_eq!(value["stream_options"]["include_usage"], true);
    }

    #[test]
    fn tools_use_function_wrapper() {
        let tools = [ToolDefinition {
            name: "read_file".into(),
            description: "Read".into(),
            parameters: json!({"type": "object"}),
        }];
        let api = serde_json::to_value(LlamaCppClient::to_api_tools(&tools)).unwrap();
        assert_eq!(api[0]["type"], "function");
        assert_eq!(api[0]["function"]["name"], "read_file");
        assert_eq!(api[0]["function"]["parameters"]["type"], "object");
    }

    #[tokio::test]
    async fn complete_requires_connection() {
        let client = LlamaCppClient::new(&TransportConfig::default()).unwrap();
        let mut sink = |_: &str| {};
        let err = client
            .complete(&[], &[], &mut sink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::NotConnected);
    }
}
