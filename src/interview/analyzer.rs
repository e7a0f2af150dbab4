//! Turn Analyzer：把（问题、回答、会话状态）交给 Oracle，得到经校验的结构化分析
//!
//! 分析始终作为单次结构化调用请求并校验，成功后才由会话状态机一次性提交到能力表与难度；
//! 这里不改动任何状态。

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::core::TurnFailure;
use crate::oracle::{
    invoke_cancellable, AnalysisContext, AnalysisResult, Oracle, PromptSpec, SchemaValidator,
    Validated,
};

static DECLINE_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// 候选人是否明确跳过 / 表示不会
pub fn is_declined(answer: &str) -> bool {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return true;
    }
    DECLINE_RE
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(i\s+don'?t\s+know|i\s+do\s+not\s+know|don'?t\s+know|not\s+sure|no\s+idea|can'?t\s+answer|cannot\s+answer|skip|pass|i'?m\s+not\s+sure|not\s+familiar)\b",
            )
            .ok()
        })
        .as_ref()
        .is_some_and(|re| re.is_match(trimmed))
}

pub struct TurnAnalyzer {
    oracle: Arc<dyn Oracle>,
}

impl TurnAnalyzer {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub async fn analyze(
        &self,
        ctx: AnalysisContext,
        cancel: &CancellationToken,
    ) -> Result<Validated<AnalysisResult>, TurnFailure> {
        let topic = ctx.topic.clone();
        let spec = PromptSpec::analysis::<AnalysisResult>(ctx);
        let raw = invoke_cancellable(self.oracle.as_ref(), &spec, cancel)
            .await
            .map_err(|_| TurnFailure::Cancelled)?
            .map_err(TurnFailure::Oracle)?;

        let result = SchemaValidator::new(self.oracle.as_ref())
            .validate_or_repair::<AnalysisResult>(&spec, &raw, cancel)
            .await?;
        tracing::info!(
            topic = %topic,
            status = %result.value.competency_status,
            adjustment = %result.value.difficulty_adjustment,
            repaired = result.repaired,
            "answer analyzed"
        );
        Ok(result)
    }
}
