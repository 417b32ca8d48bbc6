use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::prompt::Prompt;
use super::provider::{Completion, GenerationParams};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    cache_read_input_tokens: Option<u32>,
}

pub(crate) fn endpoint(base_url: &str, _model: &str) -> String {
    format!("{}/messages", base_url.trim_end_matches('/'))
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
    let request = MessageRequest {
        model,
        max_tokens: params.max_tokens,
        temperature: params.temperature,
        messages: vec![Message {
            role: "user",
            content: &prompt.user,
        }],
        system: (!prompt.system.is_empty()).then_some(prompt.system.as_str()),
    };

    client
        .post(endpoint)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&request)
}

pub(crate) fn validation_request(client: &Client, endpoint: &str, api_key: &str) -> RequestBuilder {
    client
        .get(endpoint)
        .query(&[("limit", "1")])
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
}

pub(crate) fn parse_completion(body: &str) -> Result<Completion, String> {
    let response: MessageResponse =
        serde_json::from_str(body).map_err(|e| format!("malformed Claude response: {}", e))?;

    let text = response
        .content
        .into_iter()
        .filter(|block| block.content_type == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n");

    let usage = response.usage.unwrap_or_default();
    Ok(Completion {
        text,
        model: response.model,
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        cached_tokens: usage.cache_read_input_tokens.unwrap_or(0),
        total_tokens: None,
    })
}
