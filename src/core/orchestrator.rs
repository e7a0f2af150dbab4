//! 会话编排器：每场面试一个后台任务
//!
//! 负责：按配置选择 LLM 后端并包装成 Oracle、创建会话、建立 cmd/state 两通道，
//! 并在后台任务中消费调用方命令（Answer/Cancel/Quit），驱动会话状态机并发布状态快照。
//! 每场面试独占自己的任务、通道与 SessionSupervisor，会话之间没有共享可变状态。

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::core::{InterviewError, SessionPhase, SessionSnapshot, SessionSupervisor};
use crate::interview::{InterviewSession, SessionReport};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::oracle::{LlmOracle, Oracle};

/// 调用方（控制台、传输层）发往会话任务的命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 候选人回答
    Answer(String),
    /// 中止正在进行的一轮；会话回到等待回答
    Cancel,
    /// 操作员结束会话
    Quit,
}

/// 一轮进行中又收到回答时，随该轮结果一起发布的提示
pub const IGNORED_ANSWER_MESSAGE: &str = "answer ignored: a turn was already in progress";

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let has_deepseek_key = std::env::var("DEEPSEEK_API_KEY").is_ok();
    let has_openai_key = std::env::var("OPENAI_API_KEY").is_ok();

    if provider == "mock" {
        tracing::info!("Using Mock LLM (configured)");
        Arc::new(MockLlmClient)
    } else if has_deepseek_key || (provider == "deepseek" && has_openai_key) {
        tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
        Arc::new(with_configured_temperature(
            create_deepseek_client(Some(&cfg.llm.model)),
            cfg,
        ))
    } else if has_openai_key && provider == "openai" {
        let base = cfg.llm.base_url.as_deref();
        tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
        let client = OpenAiClient::new(
            base,
            &cfg.llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        );
        Arc::new(with_configured_temperature(client, cfg))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}

fn with_configured_temperature(client: OpenAiClient, cfg: &AppConfig) -> OpenAiClient {
    match cfg.llm.temperature {
        Some(t) => client.with_temperature(t),
        None => client,
    }
}

/// LLM 后端 + 单次调用超时 → Oracle
pub fn create_oracle_from_config(cfg: &AppConfig) -> Arc<dyn Oracle> {
    Arc::new(LlmOracle::new(
        create_llm_from_config(cfg),
        cfg.llm.timeouts.request_timeout(),
    ))
}

/// 按配置创建一场面试（INIT）
pub fn create_session<I, S>(
    cfg: &AppConfig,
    competencies: I,
    oracle: Arc<dyn Oracle>,
) -> Result<InterviewSession, InterviewError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    InterviewSession::new(competencies, oracle, &cfg.interview)
}

/// 在独立任务中运行会话：返回命令发送端、状态接收端与任务句柄（结束时给出 SessionReport）
///
/// 任务先完成开场出题，之后每条 Answer 驱动一轮；一轮进行中收到 Cancel 只中止该轮，
/// 收到 Quit 或命令通道关闭时以 Aborted 结束（已结束的会话保持原结束原因）。
pub fn spawn_session(
    mut session: InterviewSession,
) -> (
    mpsc::UnboundedSender<Command>,
    watch::Receiver<SessionSnapshot>,
    JoinHandle<Option<SessionReport>>,
) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(session.snapshot());

    let handle = tokio::spawn(async move {
        let supervisor = SessionSupervisor::new();
        let session_id = session.state().id();

        let opening = supervisor.begin_turn();
        if let Err(e) = session.start(&opening).await {
            tracing::error!(session = %session_id, "opening failed: {}", e);
            session.abort();
        }
        supervisor.end_turn();
        let _ = state_tx.send(session.snapshot());

        let mut quit = false;
        while !quit && !session.is_terminated() {
            let Some(cmd) = cmd_rx.recv().await else {
                break; // cmd_tx 已关闭
            };
            match cmd {
                Command::Answer(answer) => {
                    let token = supervisor.begin_turn();
                    let mut busy = session.snapshot();
                    busy.phase = SessionPhase::Analyzing;
                    let _ = state_tx.send(busy);

                    let mut ignored_answer = false;
                    let result = {
                        let turn = session.submit_answer(&answer, &token);
                        tokio::pin!(turn);
                        loop {
                            tokio::select! {
                                res = &mut turn => break res,
                                Some(cmd) = cmd_rx.recv() => match cmd {
                                    Command::Cancel => {
                                        token.cancel();
                                    }
                                    Command::Quit => {
                                        quit = true;
                                        token.cancel();
                                    }
                                    Command::Answer(_) => {
                                        tracing::warn!(session = %session_id, "answer ignored while a turn is in flight");
                                        ignored_answer = true;
                                    }
                                },
                            }
                        }
                    };
                    supervisor.end_turn();

                    let mut snapshot = session.snapshot();
                    match result {
                        Ok(_) => {}
                        Err(InterviewError::Cancelled) => {
                            snapshot.error_message = Some("turn cancelled".to_string());
                        }
                        Err(e) => {
                            tracing::warn!(session = %session_id, "answer rejected: {}", e);
                            snapshot.error_message = Some(e.to_string());
                        }
                    }
                    if ignored_answer && snapshot.error_message.is_none() {
                        snapshot.error_message = Some(IGNORED_ANSWER_MESSAGE.to_string());
                    }
                    let _ = state_tx.send(snapshot);
                }
                Command::Cancel => {
                    // 空闲时没有进行中的轮次
                    supervisor.cancel_turn();
                }
                Command::Quit => quit = true,
            }
        }

        if session.abort().is_some() {
            supervisor.cancel();
        }
        let _ = state_tx.send(session.snapshot());
        session.report()
    });

    (cmd_tx, state_rx, handle)
}
