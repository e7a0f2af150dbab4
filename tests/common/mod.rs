//! 集成测试共用：按步骤回放的 LLM 客户端与结构化回复构造

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use interview::config::InterviewSection;
use interview::interview::InterviewSession;
use interview::llm::{LlmClient, LlmError};
use interview::memory::Message;
use interview::oracle::LlmOracle;

/// 单次调用的行为
pub enum Step {
    Reply(String),
    Fail(LlmError),
    /// 长时间不返回，用于超时 / 取消
    Hang,
}

#[derive(Default)]
pub struct StepClient {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl StepClient {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }
}

#[async_trait]
impl LlmClient for StepClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(LlmError::Service("hang elapsed".to_string()))
            }
            None => Err(LlmError::Service("no more steps".to_string())),
        }
    }
}

pub fn analysis(adjustment: &str, status: &str, evidence: &str) -> Step {
    Step::Reply(format!(
        r#"{{"analysis":"assessed","strategy":"next","difficulty_adjustment":"{adjustment}","competency_status":"{status}","evidence":"{evidence}"}}"#
    ))
}

pub fn question(decision: &str, text: &str, new_topic: &str) -> Step {
    Step::Reply(format!(
        r#"{{"analysis":"focus","strategy":"probe","difficulty_adjustment":"HOLD","decision":"{decision}","question":"{text}","new_topic":"{new_topic}"}}"#
    ))
}

pub const ORACLE_TIMEOUT: Duration = Duration::from_millis(100);

pub fn session(client: Arc<StepClient>, names: &[&str], max_turns: u32) -> InterviewSession {
    let settings = InterviewSection {
        max_turns,
        ..InterviewSection::default()
    };
    let oracle = Arc::new(LlmOracle::new(client, ORACLE_TIMEOUT));
    InterviewSession::new(names.iter().copied(), oracle, &settings).unwrap()
}
