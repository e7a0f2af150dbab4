//! Oracle 请求描述与 prompt 渲染
//!
//! 三种调用形态互斥：回答分析、出题、修复。上下文是封闭枚举，分析与出题上下文不可能混在同一次请求里。

use crate::interview::difficulty::DifficultyLevel;
use crate::memory::Message;
use crate::oracle::schema::{AnalysisResult, ResultSchema, StructuredResult};

pub const TOPIC_SECTION: &str = "## Target topic";
pub const QUESTION_SECTION: &str = "## Question asked";
pub const ANSWER_SECTION: &str = "## Candidate answer";
pub const DIFFICULTY_SECTION: &str = "## Difficulty";
pub const CHECKLIST_SECTION: &str = "## Competency checklist";
pub const HISTORY_SECTION: &str = "## Recent conversation";
pub const PRIOR_ANALYSIS_SECTION: &str = "## Analysis of the previous answer";
pub const ELAPSED_SECTION: &str = "## Elapsed time";
pub const ORIGINAL_OUTPUT_SECTION: &str = "## Your previous output";
pub const VIOLATION_SECTION: &str = "## Contract violation";

const ANALYST_ROLE: &str = "You are an expert technical interviewer assessing one answer. \
Judge the answer only against the target competency. Think first: write your analysis and \
strategy, then give the difficulty signal (INCREASE for a strong answer, DECREASE for a weak or \
declined answer, HOLD otherwise), the competency status, and the evidence you relied on.";

const STRATEGIST_ROLE: &str = "You are a professional interviewer planning the next question. \
Reason before you write the question: restate the focus, explain the strategy, echo the \
difficulty signal, choose DEEPEN (stay on the current topic), PIVOT (move to the target topic) \
or CLOSE (only when no competency remains), then write ONE conversational question calibrated \
to the difficulty band, and name its topic in new_topic.";

const REPAIR_ROLE: &str = "Your previous output violated the required response contract. \
Return a corrected version that keeps the original meaning and satisfies the contract exactly.";

/// 回答分析上下文
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub topic: String,
    pub question: String,
    pub answer: String,
    pub difficulty: DifficultyLevel,
    /// 候选人明确表示跳过 / 不会
    pub declined: bool,
    pub checklist: String,
    pub history: String,
}

/// 出题上下文
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub topic: String,
    pub difficulty: DifficultyLevel,
    /// 剩余（非 Strong）能力清单
    pub remaining: Vec<String>,
    /// 开场题没有上一轮分析
    pub prior_analysis: Option<AnalysisResult>,
    pub elapsed_minutes: i64,
    pub history: String,
}

/// 修复上下文：原始输出与违规描述
#[derive(Debug, Clone)]
pub struct RepairContext {
    pub original_output: String,
    pub violation: String,
}

#[derive(Debug, Clone)]
pub enum PromptContext {
    Analysis(AnalysisContext),
    Strategy(StrategyContext),
    Repair(RepairContext),
}

/// 一次 Oracle 请求：任务、有序字段 Schema、上下文
#[derive(Debug, Clone)]
pub struct PromptSpec {
    pub schema: &'static ResultSchema,
    pub json_schema: String,
    pub context: PromptContext,
}

impl PromptSpec {
    pub fn analysis<T: StructuredResult>(ctx: AnalysisContext) -> Self {
        Self::for_result::<T>(PromptContext::Analysis(ctx))
    }

    pub fn strategy<T: StructuredResult>(ctx: StrategyContext) -> Self {
        Self::for_result::<T>(PromptContext::Strategy(ctx))
    }

    /// 修复请求沿用被修复调用的 Schema
    pub fn repair(original: &PromptSpec, output: &str, violation: &str) -> Self {
        Self {
            schema: original.schema,
            json_schema: original.json_schema.clone(),
            context: PromptContext::Repair(RepairContext {
                original_output: output.to_string(),
                violation: violation.to_string(),
            }),
        }
    }

    fn for_result<T: StructuredResult>(context: PromptContext) -> Self {
        Self {
            schema: T::schema(),
            json_schema: T::schema_text(),
            context,
        }
    }

    /// 日志用的调用目的
    pub fn purpose(&self) -> &'static str {
        match self.context {
            PromptContext::Analysis(_) => "analyze answer",
            PromptContext::Strategy(_) => "generate question",
            PromptContext::Repair(_) => "repair structured result",
        }
    }

    /// 渲染为 system + user 两条消息
    pub fn to_messages(&self) -> Vec<Message> {
        let role = match self.context {
            PromptContext::Analysis(_) => ANALYST_ROLE,
            PromptContext::Strategy(_) => STRATEGIST_ROLE,
            PromptContext::Repair(_) => REPAIR_ROLE,
        };
        let system = format!(
            "{role}\n\nRespond with ONLY a JSON object (no prose, no Markdown). \
Its keys MUST appear exactly in this order:\n{}\n\nJSON Schema:\n{}",
            self.schema.describe(),
            self.json_schema
        );
        vec![Message::system(system), Message::user(self.render_context())]
    }

    fn render_context(&self) -> String {
        match &self.context {
            PromptContext::Analysis(c) => {
                let mut out = format!(
                    "{TOPIC_SECTION}\n{}\n{QUESTION_SECTION}\n{}\n{ANSWER_SECTION}\n{}\n{DIFFICULTY_SECTION}\n{} ({})\n{CHECKLIST_SECTION}\n{}\n{HISTORY_SECTION}\n{}",
                    c.topic,
                    c.question,
                    c.answer,
                    c.difficulty,
                    c.difficulty.band(),
                    c.checklist,
                    c.history,
                );
                if c.declined {
                    out.push_str("\n## Note\nThe candidate declined or said they do not know.");
                }
                out
            }
            PromptContext::Strategy(c) => {
                let remaining = if c.remaining.is_empty() {
                    "(none)".to_string()
                } else {
                    c.remaining
                        .iter()
                        .map(|n| format!("- {n}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                let prior = match &c.prior_analysis {
                    Some(a) => format!(
                        "analysis: {}\nstrategy: {}\ndifficulty_adjustment: {}\ncompetency_status: {}\nevidence: {}",
                        a.analysis, a.strategy, a.difficulty_adjustment, a.competency_status, a.evidence
                    ),
                    None => "(opening question, no previous answer)".to_string(),
                };
                format!(
                    "{TOPIC_SECTION}\n{}\n{DIFFICULTY_SECTION}\n{} ({})\n{CHECKLIST_SECTION}\n{}\n{PRIOR_ANALYSIS_SECTION}\n{}\n{ELAPSED_SECTION}\n{} minutes\n{HISTORY_SECTION}\n{}",
                    c.topic,
                    c.difficulty,
                    c.difficulty.band(),
                    remaining,
                    prior,
                    c.elapsed_minutes,
                    c.history,
                )
            }
            PromptContext::Repair(c) => format!(
                "{ORIGINAL_OUTPUT_SECTION}\n{}\n{VIOLATION_SECTION}\n{}",
                c.original_output, c.violation
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Role;
    use crate::oracle::schema::StrategyResult;

    fn analysis_ctx() -> AnalysisContext {
        AnalysisContext {
            topic: "Database".to_string(),
            question: "What is an index?".to_string(),
            answer: "A lookup structure.".to_string(),
            difficulty: DifficultyLevel::new(2),
            declined: false,
            checklist: "- Database [PENDING]".to_string(),
            history: "No conversation history yet.".to_string(),
        }
    }

    #[test]
    fn test_analysis_prompt_has_field_order_and_answer() {
        let spec = PromptSpec::analysis::<AnalysisResult>(analysis_ctx());
        let msgs = spec.to_messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::System);
        assert!(msgs[0].content.contains("1. \"analysis\""));
        assert!(msgs[1].content.contains(ANSWER_SECTION));
        assert!(msgs[1].content.contains("A lookup structure."));
        assert!(!msgs[1].content.contains(PRIOR_ANALYSIS_SECTION));
    }

    #[test]
    fn test_repair_keeps_schema() {
        let spec = PromptSpec::strategy::<StrategyResult>(StrategyContext {
            topic: "Database".to_string(),
            difficulty: DifficultyLevel::new(3),
            remaining: vec!["Database".to_string()],
            prior_analysis: None,
            elapsed_minutes: 0,
            history: String::new(),
        });
        let repair = PromptSpec::repair(&spec, "{}", "missing field `question`");
        assert!(matches!(repair.context, PromptContext::Repair(_)));
        assert_eq!(repair.purpose(), "repair structured result");
        assert_eq!(repair.schema, spec.schema);
        let msgs = repair.to_messages();
        assert!(msgs[0].content.contains("\"decision\""));
        assert!(msgs[1].content.contains("missing field `question`"));
    }
}
