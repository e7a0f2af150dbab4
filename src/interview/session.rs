//! 会话状态机
//!
//! INIT → ASKING → AWAITING_ANSWER → ANALYZING → SELECTING → STRATEGIZING → ASKING（循环）→ CLOSING → TERMINATED
//!
//! 每次 submit_answer 消耗一条回答、一格轮次预算。分析、选题、出题都在暂存副本上进行，
//! 全部完成后一次性提交（能力表、难度、Turn、预算）；中途取消则丢弃暂存，回到 AWAITING_ANSWER。
//! 单轮失败按 RecoveryEngine 降级，只有连续降级达到上限才提前结束（IncompleteSession）。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::InterviewSection;
use crate::core::{
    DegradeReason, InterviewError, RecoveryAction, RecoveryEngine, SessionPhase, SessionSnapshot,
    TerminationCause, TurnFailure, TurnStage,
};
use crate::interview::analyzer::{is_declined, TurnAnalyzer};
use crate::interview::competency::{Competency, CompetencyRegistry, CompetencyStatus};
use crate::interview::difficulty::{DifficultyAdjustment, DifficultyController, DifficultyLevel};
use crate::interview::strategist::QuestionStrategist;
use crate::interview::topic::TopicSelector;
use crate::llm::TokenTotals;
use crate::memory::ConversationMemory;
use crate::oracle::{AnalysisContext, AnalysisResult, Decision, Oracle, StrategyContext};

pub const WELCOME_MESSAGE: &str = "Hello! Thank you for joining me today. \
Please answer honestly and use specific examples from your own experience. \
If a question is unclear, just ask. Let's begin.";

/// 一次问答的不可变审计记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// 从 1 开始
    pub index: usize,
    pub topic: String,
    pub question: String,
    pub answer: String,
    /// 回答时的难度
    pub difficulty: DifficultyLevel,
    pub analysis: String,
    pub strategy: String,
    pub difficulty_adjustment: DifficultyAdjustment,
    /// 分析成功时写入能力表的状态
    pub competency_status: Option<CompetencyStatus>,
    pub evidence: String,
    pub decision: Decision,
    pub next_topic: Option<String>,
    pub next_question: Option<String>,
    /// 降级轮次的原因
    pub degraded: Option<DegradeReason>,
    pub recorded_at: DateTime<Utc>,
}

impl Turn {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// 单场面试的全部状态；每场面试独占一份，不跨会话共享
#[derive(Debug, Clone)]
pub struct SessionState {
    id: Uuid,
    registry: CompetencyRegistry,
    difficulty: DifficultyLevel,
    turns: Vec<Turn>,
    turns_remaining: u32,
    phase: SessionPhase,
    consecutive_failures: u32,
    termination: Option<TerminationCause>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl SessionState {
    fn new(registry: CompetencyRegistry, settings: &InterviewSection) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry,
            difficulty: DifficultyLevel::new(settings.initial_difficulty),
            turns: Vec::new(),
            turns_remaining: settings.max_turns.max(1),
            phase: SessionPhase::Init,
            consecutive_failures: 0,
            termination: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn registry(&self) -> &CompetencyRegistry {
        &self.registry
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turns_remaining(&self) -> u32 {
        self.turns_remaining
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn termination(&self) -> Option<TerminationCause> {
        self.termination
    }

}

/// 会话结束后交给下游（报告生成、归档）的最终快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub termination: TerminationCause,
    pub final_difficulty: DifficultyLevel,
    pub competencies: Vec<Competency>,
    pub turns: Vec<Turn>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// 整场面试的 Oracle token 用量
    #[serde(default)]
    pub token_usage: TokenTotals,
}

/// submit_answer / start 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// 下一道题
    Question { topic: String, text: String },
    /// 会话结束
    Closed {
        cause: TerminationCause,
        message: String,
    },
}

#[derive(Debug, Clone)]
struct PendingQuestion {
    topic: String,
    text: String,
}

/// 本轮出题结果（暂存）
enum NextStep {
    Ask {
        topic: String,
        question: String,
        decision: Decision,
    },
    Close(TerminationCause),
}

pub struct InterviewSession {
    state: SessionState,
    oracle: Arc<dyn Oracle>,
    analyzer: TurnAnalyzer,
    strategist: QuestionStrategist,
    recovery: RecoveryEngine,
    window: ConversationMemory,
    current: Option<PendingQuestion>,
}

impl InterviewSession {
    /// INIT：按外部清单建能力表（全部 Pending），难度与预算取自配置
    pub fn new<I, S>(
        competencies: I,
        oracle: Arc<dyn Oracle>,
        settings: &InterviewSection,
    ) -> Result<Self, InterviewError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = CompetencyRegistry::new(competencies)?;
        let state = SessionState::new(registry, settings);
        tracing::info!(
            session = %state.id,
            competencies = state.registry.len(),
            difficulty = %state.difficulty,
            budget = state.turns_remaining,
            "interview session created"
        );
        Ok(Self {
            state,
            oracle: oracle.clone(),
            analyzer: TurnAnalyzer::new(oracle.clone()),
            strategist: QuestionStrategist::new(oracle),
            recovery: RecoveryEngine::new(settings.max_consecutive_failures),
            window: ConversationMemory::new(settings.history_window),
            current: None,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn current_question(&self) -> Option<&str> {
        self.current.as_ref().map(|q| q.text.as_str())
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.current.as_ref().map(|q| q.topic.as_str())
    }

    pub fn is_terminated(&self) -> bool {
        self.state.phase == SessionPhase::Terminated
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.state.phase,
            current_question: self.current.as_ref().map(|q| q.text.clone()),
            current_topic: self.current.as_ref().map(|q| q.topic.clone()),
            difficulty: self.state.difficulty.get(),
            turns_taken: self.state.turns.len(),
            turns_remaining: self.state.turns_remaining,
            termination: self.state.termination,
            error_message: None,
        }
    }

    /// 会话结束后的最终快照；未结束时为 None
    pub fn report(&self) -> Option<SessionReport> {
        let termination = self.state.termination?;
        Some(SessionReport {
            session_id: self.state.id,
            termination,
            final_difficulty: self.state.difficulty,
            competencies: self.state.registry.iter().cloned().collect(),
            turns: self.state.turns.clone(),
            started_at: self.state.started_at,
            finished_at: self.state.finished_at.unwrap_or_else(Utc::now),
            token_usage: self.oracle.token_usage(),
        })
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        tracing::debug!(session = %self.state.id, from = %self.state.phase, to = %phase, "phase transition");
        self.state.phase = phase;
    }

    fn elapsed_minutes(&self) -> i64 {
        (Utc::now() - self.state.started_at).num_minutes()
    }

    fn remaining_names(registry: &CompetencyRegistry) -> Vec<String> {
        registry.remaining().into_iter().map(String::from).collect()
    }

    /// 开场：选题 → 出题（无上一轮分析）→ 等待回答
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<TurnOutcome, InterviewError> {
        if self.state.phase != SessionPhase::Init {
            return Err(InterviewError::IllegalTransition(format!(
                "start requested in phase {}",
                self.state.phase
            )));
        }

        self.set_phase(SessionPhase::Selecting);
        let Some(selected) = TopicSelector::select(&self.state.registry).map(String::from) else {
            return Ok(self.close(TerminationCause::CoverageComplete));
        };

        self.set_phase(SessionPhase::Strategizing);
        let ctx = StrategyContext {
            topic: selected.clone(),
            difficulty: self.state.difficulty,
            remaining: Self::remaining_names(&self.state.registry),
            prior_analysis: None,
            elapsed_minutes: 0,
            history: self.window.render(),
        };
        let (topic, question) = match self.strategist.next_question(ctx, cancel).await {
            Ok(s) => {
                let topic = TopicSelector::resolve(
                    &self.state.registry,
                    &selected,
                    s.value.decision,
                    &s.value.new_topic,
                )
                .to_string();
                (topic, s.value.question)
            }
            Err(TurnFailure::Cancelled) => {
                self.set_phase(SessionPhase::Init);
                return Err(InterviewError::Cancelled);
            }
            Err(f) => {
                tracing::warn!(session = %self.state.id, "opening question degraded: {}", f);
                self.state.consecutive_failures += 1;
                let q = RecoveryEngine::templated_question(&selected, self.state.difficulty);
                (selected, q)
            }
        };
        Ok(self.ask(topic, question))
    }

    fn ask(&mut self, topic: String, text: String) -> TurnOutcome {
        self.set_phase(SessionPhase::Asking);
        tracing::info!(session = %self.state.id, topic = %topic, difficulty = %self.state.difficulty, "asking");
        self.current = Some(PendingQuestion {
            topic: topic.clone(),
            text: text.clone(),
        });
        self.set_phase(SessionPhase::AwaitingAnswer);
        TurnOutcome::Question { topic, text }
    }

    /// 一次循环：分析 → 选题 → 出题 → 提交
    pub async fn submit_answer(
        &mut self,
        answer: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, InterviewError> {
        match self.state.phase {
            SessionPhase::AwaitingAnswer => {}
            SessionPhase::Terminated => {
                return Err(InterviewError::IllegalTransition(
                    "session is terminated; no further answers are accepted".to_string(),
                ))
            }
            phase => {
                return Err(InterviewError::IllegalTransition(format!(
                    "answer received in phase {phase}"
                )))
            }
        }
        let Some(pending) = self.current.clone() else {
            return Err(InterviewError::IllegalTransition(
                "no question is awaiting an answer".to_string(),
            ));
        };

        match self.run_turn(&pending, answer, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(TurnFailure::Cancelled) => {
                tracing::info!(session = %self.state.id, "turn cancelled, state untouched");
                self.set_phase(SessionPhase::AwaitingAnswer);
                Err(InterviewError::Cancelled)
            }
            Err(f) => {
                // run_turn 只会以 Cancelled 失败，其余失败都已降级
                self.set_phase(SessionPhase::AwaitingAnswer);
                Err(f.into())
            }
        }
    }

    async fn run_turn(
        &mut self,
        pending: &PendingQuestion,
        answer: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnFailure> {
        self.set_phase(SessionPhase::Analyzing);
        let difficulty = self.state.difficulty;
        let declined = is_declined(answer);
        if declined {
            tracing::info!(session = %self.state.id, topic = %pending.topic, "candidate declined the question");
        }
        let ctx = AnalysisContext {
            topic: pending.topic.clone(),
            question: pending.text.clone(),
            answer: answer.to_string(),
            difficulty,
            declined,
            checklist: self.state.registry.checklist(),
            history: self.window.render(),
        };

        let mut staged_registry = self.state.registry.clone();
        let mut staged_difficulty = difficulty;
        let turns_remaining = self.state.turns_remaining.saturating_sub(1);

        let (analysis, mut degraded) = match self.analyzer.analyze(ctx, cancel).await {
            Ok(v) => {
                staged_difficulty = DifficultyController::adjust(difficulty, v.value.difficulty_adjustment);
                staged_registry.update(&pending.topic, v.value.competency_status, v.value.evidence.clone());
                (Some(v.value), None)
            }
            Err(TurnFailure::Cancelled) => return Err(TurnFailure::Cancelled),
            Err(f) => {
                tracing::warn!(session = %self.state.id, topic = %pending.topic, "analysis degraded: {}", f);
                (None, Some(RecoveryEngine::reason(TurnStage::Analysis, &f)))
            }
        };

        let next = match &analysis {
            None => {
                let consecutive = self.state.consecutive_failures + 1;
                if turns_remaining == 0 {
                    NextStep::Close(TerminationCause::BudgetExhausted)
                } else {
                    match self.recovery.handle(TurnStage::Analysis, consecutive, &pending.topic, difficulty) {
                        RecoveryAction::ProbeSameTopic(q) | RecoveryAction::TemplatedQuestion(q) => {
                            NextStep::Ask {
                                topic: pending.topic.clone(),
                                question: q,
                                decision: Decision::Deepen,
                            }
                        }
                        RecoveryAction::Terminate => NextStep::Close(TerminationCause::IncompleteSession),
                    }
                }
            }
            Some(result) => {
                self.set_phase(SessionPhase::Selecting);
                match TopicSelector::select(&staged_registry).map(String::from) {
                    None => NextStep::Close(TerminationCause::CoverageComplete),
                    Some(_) if turns_remaining == 0 => NextStep::Close(TerminationCause::BudgetExhausted),
                    Some(selected) => {
                        self.set_phase(SessionPhase::Strategizing);
                        let ctx = StrategyContext {
                            topic: selected.clone(),
                            difficulty: staged_difficulty,
                            remaining: Self::remaining_names(&staged_registry),
                            prior_analysis: Some(result.clone()),
                            elapsed_minutes: self.elapsed_minutes(),
                            history: self.window.render(),
                        };
                        match self.strategist.next_question(ctx, cancel).await {
                            Ok(s) => NextStep::Ask {
                                topic: TopicSelector::resolve(
                                    &staged_registry,
                                    &selected,
                                    s.value.decision,
                                    &s.value.new_topic,
                                )
                                .to_string(),
                                question: s.value.question,
                                decision: s.value.decision,
                            },
                            Err(TurnFailure::Cancelled) => return Err(TurnFailure::Cancelled),
                            Err(f) => {
                                tracing::warn!(session = %self.state.id, topic = %selected, "strategy degraded: {}", f);
                                degraded = Some(RecoveryEngine::reason(TurnStage::Strategy, &f));
                                let consecutive = self.state.consecutive_failures + 1;
                                match self.recovery.handle(TurnStage::Strategy, consecutive, &selected, staged_difficulty) {
                                    RecoveryAction::ProbeSameTopic(q) | RecoveryAction::TemplatedQuestion(q) => {
                                        let decision = if selected == pending.topic {
                                            Decision::Deepen
                                        } else {
                                            Decision::Pivot
                                        };
                                        NextStep::Ask {
                                            topic: selected,
                                            question: q,
                                            decision,
                                        }
                                    }
                                    RecoveryAction::Terminate => {
                                        NextStep::Close(TerminationCause::IncompleteSession)
                                    }
                                }
                            }
                        }
                    }
                }
            }
        };

        // 提交点：以下不再有 await，整批生效
        let (decision, next_topic, next_question) = match &next {
            NextStep::Ask { topic, question, decision } => {
                (*decision, Some(topic.clone()), Some(question.clone()))
            }
            NextStep::Close(_) => (Decision::Close, None, None),
        };
        let turn = build_turn(
            self.state.turns.len() + 1,
            pending,
            answer,
            difficulty,
            analysis.as_ref(),
            decision,
            next_topic,
            next_question,
            degraded.clone(),
        );

        if staged_difficulty != difficulty {
            tracing::info!(session = %self.state.id, from = %difficulty, to = %staged_difficulty, "difficulty adjusted");
        }
        if let Some(a) = &analysis {
            tracing::info!(session = %self.state.id, topic = %pending.topic, status = %a.competency_status, "competency updated");
        }
        self.state.registry = staged_registry;
        self.state.difficulty = staged_difficulty;
        self.state.turns.push(turn);
        self.state.turns_remaining = turns_remaining;
        self.state.consecutive_failures = if degraded.is_some() {
            self.state.consecutive_failures + 1
        } else {
            0
        };
        self.window.push_exchange(&pending.text, answer);

        Ok(match next {
            NextStep::Ask { topic, question, .. } => self.ask(topic, question),
            NextStep::Close(cause) => self.close(cause),
        })
    }

    /// 操作员结束会话；已结束时无操作
    pub fn abort(&mut self) -> Option<TurnOutcome> {
        if self.is_terminated() {
            return None;
        }
        Some(self.close(TerminationCause::Aborted))
    }

    fn close(&mut self, cause: TerminationCause) -> TurnOutcome {
        self.set_phase(SessionPhase::Closing);
        self.current = None;
        self.state.termination = Some(cause);
        self.state.finished_at = Some(Utc::now());
        let strong = self
            .state
            .registry
            .iter()
            .filter(|c| c.status == CompetencyStatus::Strong)
            .count();
        tracing::info!(
            session = %self.state.id,
            cause = %cause,
            turns = self.state.turns.len(),
            strong,
            total = self.state.registry.len(),
            final_difficulty = %self.state.difficulty,
            tokens = self.oracle.token_usage().total,
            "interview closed"
        );
        self.set_phase(SessionPhase::Terminated);
        TurnOutcome::Closed {
            cause,
            message: farewell(cause).to_string(),
        }
    }
}

pub fn farewell(cause: TerminationCause) -> &'static str {
    match cause {
        TerminationCause::CoverageComplete | TerminationCause::BudgetExhausted => {
            "Thank you, that's all the questions I have for you today. We appreciate your time and detailed answers."
        }
        TerminationCause::IncompleteSession => {
            "I'm sorry, we've run into technical difficulties and need to end the session here. Thank you for your patience."
        }
        TerminationCause::Aborted => "The interview has been ended. Thank you for your time.",
    }
}

#[allow(clippy::too_many_arguments)]
fn build_turn(
    index: usize,
    pending: &PendingQuestion,
    answer: &str,
    difficulty: DifficultyLevel,
    analysis: Option<&AnalysisResult>,
    decision: Decision,
    next_topic: Option<String>,
    next_question: Option<String>,
    degraded: Option<DegradeReason>,
) -> Turn {
    Turn {
        index,
        topic: pending.topic.clone(),
        question: pending.text.clone(),
        answer: answer.to_string(),
        difficulty,
        analysis: analysis.map(|a| a.analysis.clone()).unwrap_or_default(),
        strategy: analysis.map(|a| a.strategy.clone()).unwrap_or_default(),
        difficulty_adjustment: analysis
            .map(|a| a.difficulty_adjustment)
            .unwrap_or(DifficultyAdjustment::Hold),
        competency_status: analysis.map(|a| a.competency_status),
        evidence: analysis.map(|a| a.evidence.clone()).unwrap_or_default(),
        decision,
        next_topic,
        next_question,
        degraded,
        recorded_at: Utc::now(),
    }
}
