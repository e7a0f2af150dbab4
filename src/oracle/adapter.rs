//! Oracle 适配器：把 PromptSpec 交给外部生成式服务，返回原始结构化文本或失败
//!
//! 约定：每次 invoke 至多一次网络调用（不在内部重试）；超时返回 Timeout，服务错误返回 ServiceError；
//! 语法合法但不符合 Schema 的回复原样透传，校验不是这一层的职责。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmClient, LlmError, TokenTotals};
use crate::oracle::prompt::PromptSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleFailureKind {
    Timeout,
    ServiceError,
}

impl fmt::Display for OracleFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleFailureKind::Timeout => write!(f, "timeout"),
            OracleFailureKind::ServiceError => write!(f, "service error"),
        }
    }
}

/// Oracle 调用失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("oracle {kind}: {detail}")]
pub struct OracleFailure {
    pub kind: OracleFailureKind,
    pub detail: String,
}

impl OracleFailure {
    pub fn timeout(after: Duration) -> Self {
        Self {
            kind: OracleFailureKind::Timeout,
            detail: format!("no reply within {}ms", after.as_millis()),
        }
    }

    pub fn service(detail: impl Into<String>) -> Self {
        Self {
            kind: OracleFailureKind::ServiceError,
            detail: detail.into(),
        }
    }
}

/// Oracle 调用被取消（候选人或操作员中止本轮）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn invoke(&self, spec: &PromptSpec) -> Result<String, OracleFailure>;

    /// 后端累计 token 用量（写入会话报告）
    fn token_usage(&self) -> TokenTotals {
        TokenTotals::default()
    }
}

/// 基于 LlmClient 的 Oracle：渲染 system/user 消息，带超时发起一次 complete
pub struct LlmOracle {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl LlmOracle {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn invoke(&self, spec: &PromptSpec) -> Result<String, OracleFailure> {
        let messages = spec.to_messages();
        tracing::info!(
            purpose = spec.purpose(),
            backend = self.llm.name(),
            timeout_ms = self.timeout.as_millis() as u64,
            "oracle request"
        );
        for m in &messages {
            tracing::debug!(role = ?m.role, "prompt:\n{}", m.content);
        }

        let reply = match tokio::time::timeout(self.timeout, self.llm.complete(&messages)).await {
            Err(_) => Err(OracleFailure::timeout(self.timeout)),
            Ok(Err(LlmError::Timeout)) => Err(OracleFailure::timeout(self.timeout)),
            Ok(Err(e)) => Err(OracleFailure::service(e.to_string())),
            Ok(Ok(text)) => Ok(text),
        };

        match &reply {
            Ok(text) => tracing::debug!("oracle raw output: {}", text),
            Err(e) => tracing::warn!(purpose = spec.purpose(), "oracle call failed: {}", e),
        }
        reply
    }

    fn token_usage(&self) -> TokenTotals {
        self.llm.token_usage()
    }
}

/// 带取消的调用：取消令牌先触发时返回 Err(Cancelled)，Oracle 结果被丢弃
pub async fn invoke_cancellable(
    oracle: &dyn Oracle,
    spec: &PromptSpec,
    cancel: &CancellationToken,
) -> Result<Result<String, OracleFailure>, Cancelled> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        reply = oracle.invoke(spec) => Ok(reply),
    }
}
