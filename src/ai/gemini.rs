use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::prompt::Prompt;
use super::provider::{Completion, GenerationParams};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: Option<u32>,
    #[serde(default)]
    cached_content_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// The API key is added as a query parameter by `generate_request`, so transport
/// errors are logged without their URL.
pub(crate) fn endpoint(base_url: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    )
}

pub(crate) fn models_endpoint(base_url: &str) -> String {
    format!("{}/models", base_url.trim_end_matches('/'))
}

pub(crate) fn generate_request(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    _model: &str,
    prompt: &Prompt,
    params: GenerationParams,
) -> RequestBuilder {
    let request = GenerateContentRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: &prompt.user }],
        }],
        system_instruction: (!prompt.system.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part {
                text: &prompt.system,
            }],
        }),
        generation_config: GenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_tokens,
        },
    };

    client
        .post(endpoint)
        .query(&[("key", api_key)])
        .json(&request)
}

pub(crate) fn validation_request(client: &Client, endpoint: &str, api_key: &str) -> RequestBuilder {
    client
        .get(endpoint)
        .query(&[("key", api_key), ("pageSize", "1")])
}

pub(crate) fn parse_completion(body: &str) -> Result<Completion, String> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| format!("malformed Gemini response: {}", e))?;

    if response.candidates.is_empty() {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(format!("Gemini returned no content: {}", reason));
    }

    let candidate = &response.candidates[0];
    let text = candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.as_deref().filter(|r| *r != "STOP") {
            return Err(format!("Gemini stopped without text: {}", reason));
        }
    }

    let usage = response.usage_metadata.unwrap_or_default();
    Ok(Completion {
        text,
        model: response.model_version,
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
        cached_tokens: usage.cached_content_token_count.unwrap_or(0),
        total_tokens: usage.total_token_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_parts_and_reads_usage_metadata() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Part one. "}, {"text": "Part two."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 900,
                "candidatesTokenCount": 70,
                "totalTokenCount": 970,
                "cachedContentTokenCount": 512
            },
            "modelVersion": "gemini-2.0-flash"
        }"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.text, "Part one. Part two.");
        assert_eq!(completion.input_tokens, 900);
        assert_eq!(completion.output_tokens, 70);
        assert_eq!(completion.cached_tokens, 512);
        assert_eq!(completion.total_tokens, Some(970));
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_completion(body).unwrap_err();
        assert!(err.contains("SAFETY"));
    }

    #[test]
    fn endpoint_embeds_model() {
        assert_eq!(
            endpoint("https://generativelanguage.googleapis.com/v1beta", "gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
