//! Interview - 自适应面试编排引擎
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与降级恢复、阶段投影、会话监管、会话任务驱动
//! - **interview**: 能力表、难度控制、选题、单轮分析与出题、会话状态机
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 滚动对话窗口与面试记录持久化
//! - **observability**: tracing 初始化
//! - **oracle**: Oracle 适配、提示词、结构化结果 Schema 与校验修复

pub mod config;
pub mod core;
pub mod interview;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod oracle;

pub use crate::core::{spawn_session, Command, InterviewError, TerminationCause};
pub use crate::interview::{InterviewSession, SessionReport, Turn, TurnOutcome};
