use super::chat_completions;
use super::provider::Completion;

pub(crate) fn parse_completion(body: &str) -> Result<Completion, String> {
    let (response, text) = chat_completions::parse(body, "OpenAI")?;
    let usage = response.usage.unwrap_or_default();
    let cached_tokens = usage
        .prompt_tokens_details
        .and_then(|details| details.cached_tokens)
        .unwrap_or(0);
    Ok(Completion {
        text,
        model: response.model,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        cached_tokens,
        total_tokens: usage.total_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cached_prompt_tokens() {
        let body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Done."}, "finish_reason": "stop"}],
            "usage": {
                "prompt_tokens": 1200,
                "completion_tokens": 80,
                "total_tokens": 1280,
                "prompt_tokens_details": {"cached_tokens": 1024}
            }
        }"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.text, "Done.");
        assert_eq!(completion.cached_tokens, 1024);
        assert_eq!(completion.input_tokens, 1200);
    }

    #[test]
    fn missing_choices_yield_empty_text() {
        let completion = parse_completion(r#"{"choices": []}"#).unwrap();
        assert!(completion.text.is_empty());
        assert_eq!(completion.input_tokens, 0);
    }
}
