//! 核心编排层：错误与恢复、状态投影、会话监管、会话任务驱动

pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod session_supervisor;
pub mod state;

pub use error::{FailureKind, InterviewError, TurnFailure};
pub use orchestrator::{
    create_llm_from_config, create_oracle_from_config, create_session, spawn_session, Command,
    IGNORED_ANSWER_MESSAGE,
};
pub use recovery::{DegradeReason, RecoveryAction, RecoveryEngine, TurnStage};
pub use session_supervisor::SessionSupervisor;
pub use state::{SessionPhase, SessionSnapshot, TerminationCause};
