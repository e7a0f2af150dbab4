//! Schema 校验与修复
//!
//! 校验字段存在、类型、枚举取值与声明顺序；不合规时发起恰好一次修复请求，
//! 修复结果仍不合规则本轮以 ValidationError 失败，不再重试。
//! 已合规的结果重复校验不会触发修复。

use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::TurnFailure;
use crate::oracle::adapter::{invoke_cancellable, Oracle};
use crate::oracle::prompt::PromptSpec;
use crate::oracle::schema::{FieldType, ResultSchema, StructuredResult};

/// 结构化结果违规
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("output is not a JSON object: {0}")]
    Unparseable(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be a string, found {found}")]
    WrongType { field: &'static str, found: String },

    #[error("field `{field}` must be one of {allowed}, found \"{value}\"")]
    NotInEnum {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("field `{field}` must come after `{after}`")]
    OutOfOrder {
        field: &'static str,
        after: &'static str,
    },

    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("cannot decode result: {0}")]
    Decode(String),
}

/// 校验通过的结果，附带是否经过修复
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<T> {
    pub value: T,
    pub repaired: bool,
}

/// 从回复中提取 JSON 文本：```json 代码块、或首个 `{` 到最后一个 `}`
pub fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 按 Schema 校验并规范化（枚举 token 去空白、转大写），返回规范化后的对象
pub fn check(schema: &ResultSchema, output: &str) -> Result<Map<String, Value>, Violation> {
    let json = extract_json(output)
        .ok_or_else(|| Violation::Unparseable("no JSON object found".to_string()))?;
    let mut obj = match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(obj)) => obj,
        Ok(other) => return Err(Violation::Unparseable(format!("top-level {}", type_name(&other)))),
        Err(e) => return Err(Violation::Unparseable(e.to_string())),
    };

    let mut last: Option<(usize, &'static str)> = None;
    for spec in schema.fields {
        let Some(pos) = obj.keys().position(|k| k == spec.name) else {
            return Err(Violation::MissingField(spec.name));
        };
        let Some(value) = obj.get_mut(spec.name) else {
            return Err(Violation::MissingField(spec.name));
        };
        let found = type_name(value);
        let Value::String(text) = value else {
            return Err(Violation::WrongType {
                field: spec.name,
                found: found.to_string(),
            });
        };
        match spec.ty {
            FieldType::Text => {}
            FieldType::RequiredText => {
                if text.trim().is_empty() {
                    return Err(Violation::EmptyField(spec.name));
                }
            }
            FieldType::Enum(tokens) => {
                let normalized = text.trim().to_uppercase();
                if !tokens.contains(&normalized.as_str()) {
                    return Err(Violation::NotInEnum {
                        field: spec.name,
                        value: text.clone(),
                        allowed: tokens.join(" | "),
                    });
                }
                *text = normalized;
            }
        }
        if let Some((prev_pos, prev_name)) = last {
            if pos < prev_pos {
                return Err(Violation::OutOfOrder {
                    field: spec.name,
                    after: prev_name,
                });
            }
        }
        last = Some((pos, spec.name));
    }
    Ok(obj)
}

/// 校验并解码为强类型结果
pub fn validate<T: StructuredResult>(output: &str) -> Result<T, Violation> {
    let obj = check(T::schema(), output)?;
    serde_json::from_value(Value::Object(obj)).map_err(|e| Violation::Decode(e.to_string()))
}

/// 校验失败时发起一次修复请求
pub struct SchemaValidator<'a> {
    oracle: &'a dyn Oracle,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(oracle: &'a dyn Oracle) -> Self {
        Self { oracle }
    }

    /// 首次校验 → 失败则修复一次 → 仍失败返回 Validation
    pub async fn validate_or_repair<T: StructuredResult>(
        &self,
        request: &PromptSpec,
        output: &str,
        cancel: &CancellationToken,
    ) -> Result<Validated<T>, TurnFailure> {
        let violation = match validate::<T>(output) {
            Ok(value) => {
                return Ok(Validated {
                    value,
                    repaired: false,
                })
            }
            Err(v) => v,
        };
        tracing::warn!(
            schema = request.schema.name,
            "structured result rejected ({}), requesting one repair",
            violation
        );

        let repair = PromptSpec::repair(request, output, &violation.to_string());
        let repaired = invoke_cancellable(self.oracle, &repair, cancel)
            .await
            .map_err(|_| TurnFailure::Cancelled)?
            .map_err(TurnFailure::Oracle)?;

        match validate::<T>(&repaired) {
            Ok(value) => {
                tracing::info!(schema = request.schema.name, "repair accepted");
                Ok(Validated {
                    value,
                    repaired: true,
                })
            }
            Err(v) => {
                tracing::warn!(schema = request.schema.name, "repair rejected ({}), giving up", v);
                Err(TurnFailure::Validation(v))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::interview::competency::CompetencyStatus;
    use crate::interview::difficulty::{DifficultyAdjustment, DifficultyLevel};
    use crate::llm::ScriptedLlmClient;
    use crate::oracle::adapter::LlmOracle;
    use crate::oracle::prompt::AnalysisContext;
    use crate::oracle::schema::{AnalysisResult, StrategyResult};

    const VALID: &str = r#"{"analysis":"clear","strategy":"go deeper","difficulty_adjustment":"INCREASE","competency_status":"STRONG","evidence":"named trade-offs"}"#;
    const MISSING_ADJUSTMENT: &str = r#"{"analysis":"clear","strategy":"go deeper","competency_status":"STRONG","evidence":"x"}"#;

    fn request() -> PromptSpec {
        PromptSpec::analysis::<AnalysisResult>(AnalysisContext {
            topic: "API Design".to_string(),
            question: "q".to_string(),
            answer: "a".to_string(),
            difficulty: DifficultyLevel::default(),
            declined: false,
            checklist: String::new(),
            history: String::new(),
        })
    }

    #[test]
    fn test_valid_result_decodes() {
        let r: AnalysisResult = validate(VALID).unwrap();
        assert_eq!(r.difficulty_adjustment, DifficultyAdjustment::Increase);
        assert_eq!(r.competency_status, CompetencyStatus::Strong);
    }

    #[test]
    fn test_fenced_and_lowercase_tokens_accepted() {
        let raw = "Sure!\n```json\n{\"analysis\":\"a\",\"strategy\":\"s\",\"difficulty_adjustment\":\" hold \",\"competency_status\":\"weak\",\"evidence\":\"e\"}\n```";
        let r: AnalysisResult = validate(raw).unwrap();
        assert_eq!(r.difficulty_adjustment, DifficultyAdjustment::Hold);
        assert_eq!(r.competency_status, CompetencyStatus::Weak);
    }

    #[test]
    fn test_missing_field() {
        assert_eq!(
            validate::<AnalysisResult>(MISSING_ADJUSTMENT).unwrap_err(),
            Violation::MissingField("difficulty_adjustment")
        );
    }

    #[test]
    fn test_enum_membership() {
        let raw = VALID.replace("INCREASE", "MAYBE");
        assert!(matches!(
            validate::<AnalysisResult>(&raw).unwrap_err(),
            Violation::NotInEnum { field: "difficulty_adjustment", .. }
        ));
        let raw = VALID.replace("STRONG", "PENDING");
        assert!(matches!(
            validate::<AnalysisResult>(&raw).unwrap_err(),
            Violation::NotInEnum { field: "competency_status", .. }
        ));
    }

    #[test]
    fn test_wrong_type() {
        let raw = r#"{"analysis":1,"strategy":"s","difficulty_adjustment":"HOLD","competency_status":"WEAK","evidence":"e"}"#;
        assert!(matches!(
            validate::<AnalysisResult>(raw).unwrap_err(),
            Violation::WrongType { field: "analysis", .. }
        ));
    }

    #[test]
    fn test_question_before_reasoning_is_out_of_order() {
        let raw = r#"{"question":"Why?","analysis":"a","strategy":"s","difficulty_adjustment":"HOLD","decision":"PIVOT","new_topic":"t"}"#;
        assert_eq!(
            validate::<StrategyResult>(raw).unwrap_err(),
            Violation::OutOfOrder { field: "question", after: "decision" }
        );
    }

    #[test]
    fn test_empty_question_rejected() {
        let raw = r#"{"analysis":"a","strategy":"s","difficulty_adjustment":"HOLD","decision":"PIVOT","question":"  ","new_topic":"t"}"#;
        assert_eq!(
            validate::<StrategyResult>(raw).unwrap_err(),
            Violation::EmptyField("question")
        );
    }

    #[test]
    fn test_unparseable() {
        assert!(matches!(
            validate::<AnalysisResult>("I think the answer was fine").unwrap_err(),
            Violation::Unparseable(_)
        ));
        assert!(matches!(
            validate::<AnalysisResult>("{not json}").unwrap_err(),
            Violation::Unparseable(_)
        ));
    }

    #[tokio::test]
    async fn test_valid_result_never_triggers_repair() {
        let llm = Arc::new(ScriptedLlmClient::new());
        let oracle = LlmOracle::new(llm.clone(), Duration::from_secs(1));
        let validator = SchemaValidator::new(&oracle);
        let token = CancellationToken::new();
        for _ in 0..2 {
            let v = validator
                .validate_or_repair::<AnalysisResult>(&request(), VALID, &token)
                .await
                .unwrap();
            assert!(!v.repaired);
        }
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_single_repair_succeeds() {
        let llm = Arc::new(ScriptedLlmClient::new().reply(VALID));
        let oracle = LlmOracle::new(llm.clone(), Duration::from_secs(1));
        let validator = SchemaValidator::new(&oracle);
        let v = validator
            .validate_or_repair::<AnalysisResult>(&request(), MISSING_ADJUSTMENT, &CancellationToken::new())
            .await
            .unwrap();
        assert!(v.repaired);
        assert_eq!(llm.calls(), 1);
        let repair_prompt = &llm.requests()[0][1].content;
        assert!(repair_prompt.contains("missing field `difficulty_adjustment`"));
    }

    #[tokio::test]
    async fn test_failed_repair_is_not_retried() {
        let llm = Arc::new(
            ScriptedLlmClient::new()
                .reply(MISSING_ADJUSTMENT)
                .reply(VALID),
        );
        let oracle = LlmOracle::new(llm.clone(), Duration::from_secs(1));
        let validator = SchemaValidator::new(&oracle);
        let err = validator
            .validate_or_repair::<AnalysisResult>(&request(), MISSING_ADJUSTMENT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, TurnFailure::Validation(Violation::MissingField("difficulty_adjustment")));
        assert_eq!(llm.calls(), 1);
        assert_eq!(llm.remaining(), 1);
    }
}
