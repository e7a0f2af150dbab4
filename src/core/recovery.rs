//! 降级恢复引擎
//!
//! 根据失败发生的阶段与连续失败次数给出动作：分析失败 → 原话题通用追问；出题失败 → 模板题；
//! 连续降级达到上限 → 提前结束（IncompleteSession）。降级题目不经过 Oracle 生成。

use serde::{Deserialize, Serialize};

use crate::core::{FailureKind, TurnFailure};
use crate::interview::difficulty::DifficultyLevel;

/// 失败所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    Analysis,
    Strategy,
}

/// 降级记录（写入 Turn）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradeReason {
    pub stage: TurnStage,
    pub kind: FailureKind,
    pub detail: String,
}

/// 恢复动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 难度保持，沿用上一话题做通用追问
    ProbeSameTopic(String),
    /// 沿用选题结果，按当前难度出模板题
    TemplatedQuestion(String),
    /// 连续降级达到上限，提前结束
    Terminate,
}

#[derive(Debug, Clone)]
pub struct RecoveryEngine {
    max_consecutive_failures: u32,
}

impl RecoveryEngine {
    pub fn new(max_consecutive_failures: u32) -> Self {
        Self {
            max_consecutive_failures: max_consecutive_failures.max(1),
        }
    }

    pub fn max_consecutive_failures(&self) -> u32 {
        self.max_consecutive_failures
    }

    pub fn reason(stage: TurnStage, failure: &TurnFailure) -> DegradeReason {
        DegradeReason {
            stage,
            kind: failure.kind(),
            detail: failure.to_string(),
        }
    }

    /// consecutive：计入本次失败后的连续降级次数
    pub fn handle(
        &self,
        stage: TurnStage,
        consecutive: u32,
        topic: &str,
        difficulty: DifficultyLevel,
    ) -> RecoveryAction {
        if consecutive >= self.max_consecutive_failures {
            return RecoveryAction::Terminate;
        }
        match stage {
            TurnStage::Analysis => RecoveryAction::ProbeSameTopic(Self::probe_question(topic)),
            TurnStage::Strategy => {
                RecoveryAction::TemplatedQuestion(Self::templated_question(topic, difficulty))
            }
        }
    }

    pub fn probe_question(topic: &str) -> String {
        format!("Can you go deeper on that? Please walk me through a concrete example related to {topic}.")
    }

    pub fn templated_question(topic: &str, difficulty: DifficultyLevel) -> String {
        match difficulty.get() {
            1 => format!("In your own words, what does {topic} mean and why does it matter?"),
            2 => format!("Can you describe a situation where you applied {topic} in practice?"),
            3 => format!("When working on {topic}, how do you decide between the approaches available to you?"),
            4 => format!("What trade-offs have you had to balance in {topic}, and how did you resolve them?"),
            _ => format!(
                "Imagine {topic} has to hold up under heavy load, partial failure and tight cost limits. How would you design for that, and which edge cases worry you most?"
            ),
        }
    }
}

impl Default for RecoveryEngine {
    fn default() -> Self {
        Self::new(3)
    }
}
