use super::chat_completions;
use super::provider::Completion;

pub(crate) fn parse_completion(body: &str) -> Result<Completion, String> {
    let (response, text) = chat_completions::parse(body, "DeepSeek")?;
    let usage = response.usage.unwrap_or_default();
    Ok(Completion {
        text,
        model: response.model,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        cached_tokens: usage.prompt_cache_hit_tokens.unwrap_or(0),
        total_tokens: usage.total_tokens,
    })
}
