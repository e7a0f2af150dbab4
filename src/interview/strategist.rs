//! Question Strategist：先推理后出题
//!
//! 单次结构化调用，字段顺序固定为 analysis → strategy → difficulty_adjustment → decision → question → new_topic，
//! 推理字段先于问题生成；字段顺序由 Validator 校验。
//! 只有在选题返回 None 时 CLOSE 才合法，而 Strategist 只在有目标话题时被调用，因此这里收到 CLOSE 即视为违约。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::TurnFailure;
use crate::oracle::{
    invoke_cancellable, Decision, Oracle, PromptSpec, SchemaValidator, StrategyContext,
    StrategyResult, Validated,
};

pub struct QuestionStrategist {
    oracle: Arc<dyn Oracle>,
}

impl QuestionStrategist {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub async fn next_question(
        &self,
        ctx: StrategyContext,
        cancel: &CancellationToken,
    ) -> Result<Validated<StrategyResult>, TurnFailure> {
        let topic = ctx.topic.clone();
        let spec = PromptSpec::strategy::<StrategyResult>(ctx);
        let raw = invoke_cancellable(self.oracle.as_ref(), &spec, cancel)
            .await
            .map_err(|_| TurnFailure::Cancelled)?
            .map_err(TurnFailure::Oracle)?;

        let result = SchemaValidator::new(self.oracle.as_ref())
            .validate_or_repair::<StrategyResult>(&spec, &raw, cancel)
            .await?;

        if result.value.decision == Decision::Close {
            tracing::warn!(topic = %topic, "strategist emitted CLOSE while competencies remain");
            return Err(TurnFailure::IllegalTransition(format!(
                "CLOSE emitted while `{topic}` is still selected"
            )));
        }
        tracing::info!(
            topic = %topic,
            decision = %result.value.decision,
            new_topic = %result.value.new_topic,
            "question generated"
        );
        Ok(result)
    }
}
