//! 会话阶段与对外投影
//!
//! 调用方（传输层、控制台）只持有轻量的 SessionSnapshot（阶段、当前问题、难度、剩余轮数、结束原因）；
//! 完整状态由 InterviewSession 维护并投影出来。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 会话生命周期阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Init,
    Asking,
    AwaitingAnswer,
    Analyzing,
    Selecting,
    Strategizing,
    Closing,
    /// 吸收态：不再接受回答
    Terminated,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Init => "INIT",
            SessionPhase::Asking => "ASKING",
            SessionPhase::AwaitingAnswer => "AWAITING_ANSWER",
            SessionPhase::Analyzing => "ANALYZING",
            SessionPhase::Selecting => "SELECTING",
            SessionPhase::Strategizing => "STRATEGIZING",
            SessionPhase::Closing => "CLOSING",
            SessionPhase::Terminated => "TERMINATED",
        };
        write!(f, "{s}")
    }
}

/// 会话结束原因
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    /// 选题返回 None：全部能力已 Strong
    CoverageComplete,
    /// 轮次预算耗尽
    BudgetExhausted,
    /// 连续降级达到上限，提前结束
    IncompleteSession,
    /// 操作员主动结束
    Aborted,
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationCause::CoverageComplete => "coverage complete",
            TerminationCause::BudgetExhausted => "turn budget exhausted",
            TerminationCause::IncompleteSession => "incomplete session",
            TerminationCause::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// 调用方看到的「投影」状态
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub current_question: Option<String>,
    pub current_topic: Option<String>,
    pub difficulty: u8,
    pub turns_taken: usize,
    pub turns_remaining: u32,
    pub termination: Option<TerminationCause>,
    pub error_message: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Init,
            current_question: None,
            current_topic: None,
            difficulty: crate::interview::difficulty::DEFAULT_LEVEL,
            turns_taken: 0,
            turns_remaining: 0,
            termination: None,
            error_message: None,
        }
    }
}

impl SessionSnapshot {
    /// 是否可以提交回答
    pub fn input_open(&self) -> bool {
        self.phase == SessionPhase::AwaitingAnswer
    }
}
