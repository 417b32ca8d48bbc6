//! The OpenAI-style `/chat/completions` API shared by DeepSeek and GPT.
//! Endpoints, requests and response parsing live here. The vendor modules only
//! read their own cached-token fields out of the usage block.

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::prompt::Prompt;
use super::provider::GenerationParams;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: Option<u32>,
    /// DeepSeek prefix-cache hits.
    #[serde(default)]
    pub prompt_cache_hit_tokens: Option<u32>,
    /// OpenAI prompt caching.
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: Option<u32>,
}

pub(crate) fn endpoint(base_url: &str, _model: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

pub(crate) fn models_endpoint(base_url: &str) -> String {
    format!("{}/models", base_url.trim_end_matches('/'))
}

pub(crate) fn generate_request(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    model: &str,
    prompt: &Prompt,
    params: GenerationParams,
) -> RequestBuilder {
    let mut messages = Vec::with_capacity(2);
    if !prompt.system.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: &prompt.system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &prompt.user,
    });

    let body = ChatRequest {
        model,
        messages,
        max_tokens: params.max_tokens,
        temperature: params.temperature,
        stream: false,
    };

    client.post(endpoint).bearer_auth(api_key).json(&body)
}

pub(crate) fn validation_request(client: &Client, endpoint: &str, api_key: &str) -> RequestBuilder {
    client.get(endpoint).bearer_auth(api_key)
}

pub(crate) fn parse(body: &str, vendor: &str) -> Result<(ChatResponse, String), String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| format!("malformed {} response: {}", vendor, e))?;
    let text = response
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .unwrap_or_default();
    Ok((response, text))
}
