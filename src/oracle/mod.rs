//! Oracle 层：外部生成式推理服务的调用、结构化结果约定、校验与修复

pub mod adapter;
pub mod prompt;
pub mod schema;
pub mod validator;

pub use adapter::{invoke_cancellable, Cancelled, LlmOracle, Oracle, OracleFailure, OracleFailureKind};
pub use prompt::{AnalysisContext, PromptContext, PromptSpec, StrategyContext};
pub use schema::{
    AnalysisResult, Decision, ResultSchema, StrategyResult, StructuredResult, ANALYSIS_SCHEMA,
    STRATEGIST_SCHEMA,
};
pub use validator::{validate, SchemaValidator, Validated, Violation};
