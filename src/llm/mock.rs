//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! - `MockLlmClient`：按请求里声明的字段生成合法 JSON，便于本地跑通完整面试流程。
//! - `ScriptedLlmClient`：按顺序回放预置回复并记录调用次数，供单元 / 集成测试断言。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, TokenTotals, TokenUsage};
use crate::memory::{Message, Role};
use crate::oracle::prompt::{ANSWER_SECTION, TOPIC_SECTION};

/// 离线 Mock：根据回答长度给出分析，根据目标话题生成问题
#[derive(Debug, Default)]
pub struct MockLlmClient;

fn section<'a>(text: &'a str, header: &str) -> Option<&'a str> {
    let start = text.find(header)? + header.len();
    let rest = &text[start..];
    let end = rest.find("\n## ").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        if system.contains("\"decision\"") {
            let topic = section(user, TOPIC_SECTION).unwrap_or("your recent work");
            let reply = serde_json::json!({
                "analysis": format!("Next focus: {topic}"),
                "strategy": "Ask an open question anchored in real experience.",
                "difficulty_adjustment": "HOLD",
                "decision": "PIVOT",
                "question": format!("Can you walk me through how you have applied {topic} in a recent project?"),
                "new_topic": topic,
            });
            return Ok(reply.to_string());
        }

        let words = section(user, ANSWER_SECTION)
            .map(|a| a.split_whitespace().count())
            .unwrap_or(0);
        let (adjustment, status) = match words {
            0..=8 => ("DECREASE", "WEAK"),
            9..=39 => ("HOLD", "PARTIAL"),
            _ => ("INCREASE", "STRONG"),
        };
        let reply = serde_json::json!({
            "analysis": format!("Answer length {words} words."),
            "strategy": "Mock heuristic based on answer length.",
            "difficulty_adjustment": adjustment,
            "competency_status": status,
            "evidence": format!("{words} words"),
        });
        Ok(reply.to_string())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// 脚本化客户端：依次弹出预置回复；队列耗尽时返回 Service 错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    /// 每次成功回复计入的 (prompt, completion) token 数
    usage_per_reply: Option<(u64, u64)>,
    usage: TokenUsage,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条成功回复
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// 追加一条失败回复
    pub fn fail(self, err: LlmError) -> Self {
        self.push(Err(err));
        self
    }

    /// 每次调用前先等待（用于超时 / 取消测试）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 每条成功回复按固定 token 数计入用量
    pub fn with_usage(mut self, prompt: u64, completion: u64) -> Self {
        self.usage_per_reply = Some((prompt, completion));
        self
    }

    pub fn push(&self, reply: Result<String, LlmError>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply);
        }
    }

    /// 已发生的调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 已收到的请求（按调用顺序）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut r) = self.requests.lock() {
            r.push(messages.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        let reply = next.unwrap_or_else(|| Err(LlmError::Service("script exhausted".to_string())));
        if let (Ok(_), Some((prompt, completion))) = (&reply, self.usage_per_reply) {
            self.usage.record(prompt, completion);
        }
        reply
    }

    fn token_usage(&self) -> TokenTotals {
        self.usage.totals()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replays_in_order() {
        let llm = ScriptedLlmClient::new()
            .reply("first")
            .fail(LlmError::Timeout);
        let msgs = vec![Message::user("hi")];
        assert_eq!(llm.complete(&msgs).await.unwrap(), "first");
        assert_eq!(llm.complete(&msgs).await, Err(LlmError::Timeout));
        assert!(matches!(llm.complete(&msgs).await, Err(LlmError::Service(_))));
        assert_eq!(llm.calls(), 3);
        assert_eq!(llm.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_scripted_usage_counts_successful_replies() {
        let llm = ScriptedLlmClient::new()
            .reply("ok")
            .fail(LlmError::Timeout)
            .with_usage(40, 10);
        let msgs = vec![Message::user("hi")];
        let _ = llm.complete(&msgs).await;
        let _ = llm.complete(&msgs).await;
        assert_eq!(llm.token_usage(), TokenTotals::new(40, 10));
        assert_eq!(MockLlmClient.token_usage().total, 0);
    }

    #[tokio::test]
    async fn test_mock_grades_by_answer_length() {
        let msgs = vec![
            Message::system("fields: \"analysis\", \"competency_status\""),
            Message::user(format!("{ANSWER_SECTION}\nno idea\n## History\n-")),
        ];
        let out = MockLlmClient.complete(&msgs).await.unwrap();
        assert!(out.contains("WEAK"));
        assert!(out.contains("DECREASE"));
    }

    #[tokio::test]
    async fn test_mock_strategist_uses_topic() {
        let msgs = vec![
            Message::system("fields: \"decision\""),
            Message::user(format!("{TOPIC_SECTION}\nDatabase\n## Difficulty\n2")),
        ];
        let out = MockLlmClient.complete(&msgs).await.unwrap();
        assert!(out.contains("Database"));
        assert!(out.contains("PIVOT"));
    }
}
