//! Chat-completion request wire format and per-client configuration.

use loadbench_core::Message;
use serde::Serialize;

/// Static, per-run configuration for a `StreamingClient`. Everything here is
/// fixed for the life of a run; only `messages` varies per call.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub openai_compatible: bool,
    pub user_agent: String,
    pub prevent_server_caching: bool,
    pub backoff_enabled: bool,
    pub max_tokens: Option<u64>,
    pub completions: Option<u32>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    /// Forwarded as the wire `model` field; only meaningful for
    /// OpenAI-compatible endpoints, where the deployment isn't already
    /// embedded in the URL path.
    pub model: Option<String>,
}

/// The request body actually sent on the wire. `presence_penalty` is
/// forwarded under its correct name; the upstream implementation this system
/// was distilled from mis-spells it `presenece_penalty` when serializing the
/// request (see DESIGN.md) — this implementation fixes that typo rather than
/// reproducing it, per §9's explicit instruction to forward the field
/// correctly.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<Message>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ClientConfig {
    pub fn build_request(&self, messages: Vec<Message>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            messages,
            stream: true,
            max_tokens: self.max_tokens,
            n: self.completions,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            temperature: self.temperature,
            top_p: self.top_p,
            model: self.model.clone(),
        }
    }
}
