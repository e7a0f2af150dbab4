//! 面试领域层：能力表、难度控制、选题、单轮分析与出题、会话状态机

pub mod analyzer;
pub mod competency;
pub mod difficulty;
pub mod session;
pub mod strategist;
pub mod topic;

pub use analyzer::{is_declined, TurnAnalyzer};
pub use competency::{Competency, CompetencyRegistry, CompetencyStatus};
pub use difficulty::{DifficultyAdjustment, DifficultyController, DifficultyLevel};
pub use session::{
    farewell, InterviewSession, SessionReport, SessionState, Turn, TurnOutcome, WELCOME_MESSAGE,
};
pub use strategist::QuestionStrategist;
pub use topic::TopicSelector;
