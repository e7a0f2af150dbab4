//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：complete 发起一次非流式完成。
//! 不在此层做重试：Oracle 约定每次调用至多一次网络请求，重试由调用方决定。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::Message;

/// LLM 后端错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// 后端自身报告超时（客户端侧超时由 Oracle 适配器的 tokio timeout 负责）
    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM service error: {0}")]
    Service(String),

    #[error("LLM request build error: {0}")]
    Request(String),
}

/// 累计 token 用量快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenTotals {
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，返回首条回复文本
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 累计 token 使用统计；不上报用量的后端保持默认的全 0
    fn token_usage(&self) -> TokenTotals {
        TokenTotals::default()
    }

    /// 后端名称（日志用）
    fn name(&self) -> &str {
        "llm"
    }
}
