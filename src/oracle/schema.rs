//! 结构化结果约定：有序字段 Schema 与强类型结果
//!
//! 两类调用各有一份固定字段顺序；推理字段（analysis / strategy）必须排在决定性字段之前，
//! 由 Validator 按声明顺序校验。JSON Schema 由 schemars 从强类型结果自动生成，拼入 system prompt。

use std::fmt;

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::interview::competency::CompetencyStatus;
use crate::interview::difficulty::DifficultyAdjustment;

/// 字段类型：自由文本或枚举（取值为大写 token）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    /// 非空文本
    RequiredText,
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn text(name: &'static str) -> Self {
        Self { name, ty: FieldType::Text }
    }

    pub const fn required_text(name: &'static str) -> Self {
        Self { name, ty: FieldType::RequiredText }
    }

    pub const fn one_of(name: &'static str, tokens: &'static [&'static str]) -> Self {
        Self { name, ty: FieldType::Enum(tokens) }
    }
}

/// 有序字段 Schema
#[derive(Debug, PartialEq, Eq)]
pub struct ResultSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl ResultSchema {
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// prompt 用的字段说明（带序号与取值范围）
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, f)| match f.ty {
                FieldType::Text => format!("{}. \"{}\": string", i + 1, f.name),
                FieldType::RequiredText => format!("{}. \"{}\": non-empty string", i + 1, f.name),
                FieldType::Enum(tokens) => {
                    format!("{}. \"{}\": one of {}", i + 1, f.name, tokens.join(" | "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub const ADJUSTMENT_TOKENS: &[&str] = &["INCREASE", "DECREASE", "HOLD"];
pub const STATUS_TOKENS: &[&str] = &["PARTIAL", "STRONG", "WEAK"];
pub const DECISION_TOKENS: &[&str] = &["DEEPEN", "PIVOT", "CLOSE"];

pub static ANALYSIS_SCHEMA: ResultSchema = ResultSchema {
    name: "answer_analysis",
    fields: &[
        FieldSpec::text("analysis"),
        FieldSpec::text("strategy"),
        FieldSpec::one_of("difficulty_adjustment", ADJUSTMENT_TOKENS),
        FieldSpec::one_of("competency_status", STATUS_TOKENS),
        FieldSpec::text("evidence"),
    ],
};

pub static STRATEGIST_SCHEMA: ResultSchema = ResultSchema {
    name: "next_question",
    fields: &[
        FieldSpec::text("analysis"),
        FieldSpec::text("strategy"),
        FieldSpec::one_of("difficulty_adjustment", ADJUSTMENT_TOKENS),
        FieldSpec::one_of("decision", DECISION_TOKENS),
        FieldSpec::required_text("question"),
        FieldSpec::text("new_topic"),
    ],
};

/// Strategist 的下一步决策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// 继续深挖当前话题
    Deepen,
    /// 转向新话题
    Pivot,
    /// 结束面试（仅在覆盖完成时合法）
    Close,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Deepen => write!(f, "DEEPEN"),
            Decision::Pivot => write!(f, "PIVOT"),
            Decision::Close => write!(f, "CLOSE"),
        }
    }
}

/// 回答分析结果（Turn Analyzer）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    /// 对回答的分析
    pub analysis: String,
    /// 下一步考察策略
    pub strategy: String,
    pub difficulty_adjustment: DifficultyAdjustment,
    /// 当前话题的能力状态（PARTIAL / STRONG / WEAK）
    pub competency_status: CompetencyStatus,
    /// 支撑判断的证据
    pub evidence: String,
}

/// 出题结果（Question Strategist）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StrategyResult {
    /// 重述本题关注点
    pub analysis: String,
    pub strategy: String,
    /// 回显本轮难度信号，便于审计
    pub difficulty_adjustment: DifficultyAdjustment,
    pub decision: Decision,
    /// 给候选人的下一道题
    pub question: String,
    pub new_topic: String,
}

/// 强类型结构化结果：绑定其有序字段 Schema
pub trait StructuredResult: DeserializeOwned + JsonSchema + Send {
    fn schema() -> &'static ResultSchema;

    /// schemars 生成的 JSON Schema 文本（properties 保持字段声明顺序）
    fn schema_text() -> String {
        let schema = schema_for!(Self);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    }
}

impl StructuredResult for AnalysisResult {
    fn schema() -> &'static ResultSchema {
        &ANALYSIS_SCHEMA
    }
}

impl StructuredResult for StrategyResult {
    fn schema() -> &'static ResultSchema {
        &STRATEGIST_SCHEMA
    }
}
