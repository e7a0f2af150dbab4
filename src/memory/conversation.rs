//! 短期记忆：面试问答窗口
//!
//! 保留最近 N 轮问答（每轮一问一答，故实际保留约 max_turns*2 条消息），超出时自动剪枝，
//! 拼入分析 / 出题两类 prompt 作为对话上下文。完整历史以 Turn 形式保存在 SessionState。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 问答窗口：面试官提问记为 Assistant，候选人回答记为 User
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_turns: max_turns.max(1),
        }
    }

    /// 记录一轮完整问答
    pub fn push_exchange(&mut self, question: &str, answer: &str) {
        self.messages.push(Message::assistant(question));
        self.messages.push(Message::user(answer));
        self.prune();
    }

    /// 渲染为 prompt 文本；无历史时给出占位说明
    pub fn render(&self) -> String {
        if self.messages.is_empty() {
            return "No conversation history yet.".to_string();
        }
        self.messages
            .iter()
            .map(|m| match m.role {
                Role::Assistant => format!("Interviewer: {}", m.content),
                Role::User => format!("Candidate: {}", m.content),
                Role::System => format!("Note: {}", m.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 超出 max_turns*2 时丢弃最旧的消息，保留最近部分
    fn prune(&mut self) {
        if self.messages.len() > self.max_turns * 2 {
            let keep = self.max_turns * 2;
            self.messages.drain(..self.messages.len() - keep);
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
