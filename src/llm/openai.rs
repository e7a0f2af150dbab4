//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；DeepSeek、OpenAI、自建代理均可。
//! Oracle 只需要非流式完成：一次请求，取首条 content；空回复按服务错误处理。
//! 结构化结果要求稳定输出，默认温度取低值。

use std::sync::atomic::{AtomicU64, Ordering};

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, TokenTotals};
use crate::memory::{Message, Role};

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// 累计 token 用量（prompt / completion）
#[derive(Debug, Default)]
pub struct TokenUsage {
    prompt: AtomicU64,
    completion: AtomicU64,
}

impl TokenUsage {
    pub fn record(&self, prompt: u64, completion: u64) {
        self.prompt.fetch_add(prompt, Ordering::Relaxed);
        self.completion.fetch_add(completion, Ordering::Relaxed);
    }

    pub fn totals(&self) -> TokenTotals {
        TokenTotals::new(
            self.prompt.load(Ordering::Relaxed),
            self.completion.load(Ordering::Relaxed),
        )
    }
}

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    usage: TokenUsage,
}

impl OpenAiClient {
    /// api_key 为空时依次回退到 OPENAI_API_KEY 与占位值（占位值会在请求时被服务端拒绝）
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            usage: TokenUsage::default(),
        }
    }

    /// 配置里的 [llm].temperature；超出 [0, 2] 时钳制
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    fn request_message(m: &Message) -> Result<ChatCompletionRequestMessage, LlmError> {
        let content = m.content.clone();
        let built = match m.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()
                .map(ChatCompletionRequestMessage::System),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map(ChatCompletionRequestMessage::User),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(content)
                .build()
                .map(ChatCompletionRequestMessage::Assistant),
        };
        built.map_err(|e| LlmError::Request(e.to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let messages = messages
            .iter()
            .map(Self::request_message)
            .collect::<Result<Vec<_>, _>>()?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages(messages)
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Service(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.usage
                .record(usage.prompt_tokens as u64, usage.completion_tokens as u64);
            tracing::debug!(
                model = %self.model,
                prompt = usage.prompt_tokens,
                completion = usage.completion_tokens,
                "token usage"
            );
        }

        match response.choices.first().and_then(|c| c.message.content.clone()) {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(LlmError::Service("empty completion".to_string())),
        }
    }

    fn token_usage(&self) -> TokenTotals {
        self.usage.totals()
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulates() {
        let usage = TokenUsage::default();
        usage.record(100, 20);
        usage.record(50, 5);
        assert_eq!(usage.totals(), TokenTotals::new(150, 25));
        assert_eq!(usage.totals().total, 175);
    }

    #[test]
    fn test_request_message_roles() {
        let msg = OpenAiClient::request_message(&Message::system("rules")).unwrap();
        assert!(matches!(msg, ChatCompletionRequestMessage::System(_)));
        let msg = OpenAiClient::request_message(&Message::user("answer")).unwrap();
        assert!(matches!(msg, ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_temperature_is_clamped() {
        let client = OpenAiClient::new(None, "gpt-4o-mini", Some("sk-test")).with_temperature(5.0);
        assert_eq!(client.temperature, 2.0);
        assert_eq!(client.name(), "gpt-4o-mini");
    }
}
