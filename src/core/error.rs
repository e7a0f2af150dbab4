//! 面试引擎错误类型
//!
//! TurnFailure 是单轮内部失败（Oracle / 校验 / 非法决策 / 取消），由 RecoveryEngine 降级处理；
//! InterviewError 是暴露给调用方的错误。单轮失败从不直接让会话失败。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oracle::{OracleFailure, OracleFailureKind, Violation};

/// 单轮内失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnFailure {
    #[error(transparent)]
    Oracle(OracleFailure),

    /// 修复一次后仍不合规
    #[error("validation error: {0}")]
    Validation(Violation),

    /// 违反调用约定（如仍有剩余能力时给出 CLOSE）
    #[error("illegal transition: {0}")]
    IllegalTransition(String),

    #[error("turn cancelled")]
    Cancelled,
}

impl TurnFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            TurnFailure::Oracle(f) => match f.kind {
                OracleFailureKind::Timeout => FailureKind::OracleTimeout,
                OracleFailureKind::ServiceError => FailureKind::OracleServiceError,
            },
            TurnFailure::Validation(_) => FailureKind::ValidationError,
            TurnFailure::IllegalTransition(_) => FailureKind::IllegalTransition,
            TurnFailure::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// 失败类别（写入 Turn 审计记录）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    OracleTimeout,
    OracleServiceError,
    ValidationError,
    IllegalTransition,
    Cancelled,
}

/// 面试会话对外错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterviewError {
    #[error("Oracle timeout: {0}")]
    OracleTimeout(String),

    #[error("Oracle service error: {0}")]
    OracleServiceError(String),

    #[error("Validation error: {0}")]
    Validation(Violation),

    /// 在错误阶段提交回答、或终止后继续提交
    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    /// 本轮被候选人或操作员中止，会话状态未改动
    #[error("Turn cancelled")]
    Cancelled,

    #[error("Invalid competencies: {0}")]
    InvalidCompetencies(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<TurnFailure> for InterviewError {
    fn from(f: TurnFailure) -> Self {
        match f {
            TurnFailure::Oracle(o) => match o.kind {
                OracleFailureKind::Timeout => InterviewError::OracleTimeout(o.detail),
                OracleFailureKind::ServiceError => InterviewError::OracleServiceError(o.detail),
            },
            TurnFailure::Validation(v) => InterviewError::Validation(v),
            TurnFailure::IllegalTransition(msg) => InterviewError::IllegalTransition(msg),
            TurnFailure::Cancelled => InterviewError::Cancelled,
        }
    }
}

impl From<config::ConfigError> for InterviewError {
    fn from(e: config::ConfigError) -> Self {
        InterviewError::ConfigError(e.to_string())
    }
}
