use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
        CreateChatCompletionResponse, FinishReason,
    },
};

use super::{GenerateRequest, GenerateResponse, Provider};

/// Any endpoint speaking the OpenAI chat-completions dialect. The reasoning
/// budget has no equivalent field there and is dropped.
pub struct OpenAIProvider {
    base_url: Option<String>,
    server_address: String,
}

impl OpenAIProvider {
    pub fn new(base_url: Option<String>) -> Self {
        let server_address = base_url
            .as_deref()
            .and_then(host_of)
            .unwrap_or_else(|| "api.openai.com".to_string());
        Self {
            base_url,
            server_address,
        }
    }

    fn client(&self, credential: &str) -> Client<OpenAIConfig> {
        let mut config = OpenAIConfig::new().with_api_key(credential);
        if let Some(base) = &self.base_url {
            config = config.with_api_base(base);
        }
        Client::with_config(config)
    }
}

fn host_of(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    Some(host.to_string())
}

fn finish_reason_str(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
        FinishReason::ToolCalls => "tool_calls",
        FinishReason::ContentFilter => "content_filter",
        _ => "other",
    }
}

fn into_response(response: CreateChatCompletionResponse) -> anyhow::Result<GenerateResponse> {
    let choice = response.choices.into_iter().next();
    let finish_reason = choice.as_ref().and_then(|c| c.finish_reason);

    if matches!(finish_reason, Some(FinishReason::ContentFilter)) {
        return Err(anyhow::anyhow!("response blocked by content filter"));
    }

    let content = choice.and_then(|c| c.message.content).unwrap_or_default();

    let (input_tokens, output_tokens) = match &response.usage {
        Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
        None => (0, 0),
    };

    Ok(GenerateResponse {
        content,
        model: response.model,
        input_tokens,
        output_tokens,
        finish_reason: finish_reason
            .map(finish_reason_str)
            .unwrap_or_default()
            .to_string(),
    })
}

#[async_trait::async_trait]
impl Provider for OpenAIProvider {
    async fn generate(
        &self,
        credential: &str,
        req: &GenerateRequest,
    ) -> anyhow::Result<GenerateResponse> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(req.system.clone()),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(req.prompt.clone()),
                name: None,
            }),
        ];

        tracing::debug!(
            reasoning_budget = req.reasoning_budget,
            "reasoning budget not supported by chat-completions provider"
        );

        #[allow(deprecated)]
        let request = CreateChatCompletionRequest {
            model: req.model.clone(),
            messages,
            temperature: Some(req.temperature),
            top_p: Some(req.top_p),
            ..Default::default()
        };

        let response = self.client(credential).chat().create(request).await?;
        into_response(response)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn server_address(&self) -> &str {
        &self.server_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::classify::classify_failure;
    use serde_json::json;

    fn completion(finish_reason: &str, content: Option<&str>) -> CreateChatCompletionResponse {
        serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": finish_reason
            }],
            "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}
        }))
        .unwrap()
    }

    #[test]
    fn test_default_server_address() {
        let provider = OpenAIProvider::new(None);
        assert_eq!(provider.server_address(), "api.openai.com");
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_server_address_from_base_url() {
        let provider = OpenAIProvider::new(Some("http://localhost:11434/v1".to_string()));
        assert_eq!(provider.server_address(), "localhost");
    }

    #[test]
    fn test_server_address_ipv6_base_url() {
        let provider = OpenAIProvider::new(Some("http://[::1]:11434/v1".to_string()));
        assert_eq!(provider.server_address(), "::1");
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://example.com/v1").as_deref(), Some("example.com"));
        assert_eq!(
            host_of("https://user:pw@proxy.example.com/v1").as_deref(),
            Some("proxy.example.com")
        );
        assert_eq!(host_of(""), None);
    }

    #[test]
    fn test_completion_maps_text_and_usage() {
        let resp = into_response(completion("stop", Some("# تقرير"))).unwrap();
        assert_eq!(resp.content, "# تقرير");
        assert_eq!(resp.model, "gpt-4o-2024-08-06");
        assert_eq!(resp.input_tokens, 42);
        assert_eq!(resp.output_tokens, 7);
        assert_eq!(resp.finish_reason, "stop");
    }

    #[test]
    fn test_missing_content_is_empty() {
        let resp = into_response(completion("length", None)).unwrap();
        assert!(resp.content.is_empty());
        assert_eq!(resp.finish_reason, "length");
    }

    #[test]
    fn test_content_filter_finish_is_content_filtered() {
        let err = into_response(completion("content_filter", Some("partial"))).unwrap_err();
        assert_eq!(classify_failure(&err).kind(), "content_filtered");
    }
}
