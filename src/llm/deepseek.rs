//! DeepSeek 后端（OpenAI 兼容端点）
//!
//! 面试分析对 JSON 输出稳定性要求高，默认用 deepseek-chat；deepseek-reasoner 可用但更慢。

use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const DEEPSEEK_REASONER: &str = "deepseek-reasoner";

/// 该端点只提供 deepseek-* 模型；其它名字（如沿用了 OpenAI 配置）回退到 deepseek-chat
pub fn resolve_model(requested: Option<&str>) -> String {
    let requested = requested
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_MODEL").ok());
    match requested {
        Some(m) if m.starts_with("deepseek") => m,
        Some(m) => {
            tracing::warn!("Model {} is not served by DeepSeek, using {}", m, DEEPSEEK_CHAT);
            DEEPSEEK_CHAT.to_string()
        }
        None => DEEPSEEK_CHAT.to_string(),
    }
}

/// Key 取 DEEPSEEK_API_KEY，其次 OPENAI_API_KEY
pub fn create_deepseek_client(model: Option<&str>) -> OpenAiClient {
    let api_key = std::env::var("DEEPSEEK_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok();
    OpenAiClient::new(
        Some(DEEPSEEK_BASE_URL),
        &resolve_model(model),
        api_key.as_deref(),
    )
}
