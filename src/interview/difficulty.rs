//! 难度控制：[1,5] 区间内的整数等级，每轮至多 ±1

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;
/// 默认起始难度（中等偏易）
pub const DEFAULT_LEVEL: u8 = 2;

/// 每轮难度信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyAdjustment {
    Increase,
    Decrease,
    Hold,
}

impl fmt::Display for DifficultyAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyAdjustment::Increase => write!(f, "INCREASE"),
            DifficultyAdjustment::Decrease => write!(f, "DECREASE"),
            DifficultyAdjustment::Hold => write!(f, "HOLD"),
        }
    }
}

/// 难度等级；构造时即夹到 [1,5]，之后只能经 `adjust` 变化
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DifficultyLevel(u8);

impl DifficultyLevel {
    pub fn new(level: u8) -> Self {
        Self(level.clamp(MIN_LEVEL, MAX_LEVEL))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// INCREASE → min(current+1, 5)；DECREASE → max(current-1, 1)；HOLD → current
    pub fn adjust(self, signal: DifficultyAdjustment) -> Self {
        match signal {
            DifficultyAdjustment::Increase => Self((self.0 + 1).min(MAX_LEVEL)),
            DifficultyAdjustment::Decrease => Self(self.0.saturating_sub(1).max(MIN_LEVEL)),
            DifficultyAdjustment::Hold => self,
        }
    }

    /// 给出题方的语义说明（控制器只管边界，题型映射由 Strategist 负责）
    pub fn band(self) -> &'static str {
        match self.0 {
            1 => "definitional recall: ask the candidate to define or explain a core concept",
            2 => "guided application: ask how the concept is used in a familiar, concrete situation",
            3 => "applied judgment: ask when they would choose one approach over another and why",
            4 => "trade-off analysis: ask them to compare designs under competing constraints",
            _ => "architectural and edge-case reasoning under real-world constraints (scale, failure, cost)",
        }
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self(DEFAULT_LEVEL)
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 难度控制器：纯函数式，无副作用
#[derive(Debug, Default, Clone, Copy)]
pub struct DifficultyController;

impl DifficultyController {
    pub fn adjust(current: DifficultyLevel, signal: DifficultyAdjustment) -> DifficultyLevel {
        current.adjust(signal)
    }
}
