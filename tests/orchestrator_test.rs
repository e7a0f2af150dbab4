//! 会话任务集成测试：多会话并行隔离、进行中的一轮被取消

mod common;

use std::collections::HashSet;

use common::{question, session, Step, StepClient};
use interview::config::AppConfig;
use interview::core::{
    create_oracle_from_config, create_session, spawn_session, Command, SessionPhase,
    TerminationCause, IGNORED_ANSWER_MESSAGE,
};
use interview::interview::CompetencyStatus;

fn mock_config(max_turns: u32) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.llm.provider = "mock".to_string();
    cfg.interview.max_turns = max_turns;
    cfg
}

fn long_answer() -> String {
    "In production we ran this behind a load balancer with health checks, ".repeat(4)
}

#[tokio::test]
async fn sessions_run_in_parallel_without_sharing_state() {
    let cfg = mock_config(4);
    let mut runs = Vec::new();
    for i in 0..6 {
        let session = create_session(
            &cfg,
            ["Networking", "Observability"],
            create_oracle_from_config(&cfg),
        )
        .unwrap();
        let strong = i % 2 == 0;
        runs.push(tokio::spawn(async move {
            let (tx, mut state, handle) = spawn_session(session);
            let mut answered = 0;
            loop {
                let snapshot = state
                    .wait_for(|s| s.input_open() || s.phase == SessionPhase::Terminated)
                    .await
                    .unwrap()
                    .clone();
                if snapshot.phase == SessionPhase::Terminated {
                    break;
                }
                let answer = if strong { long_answer() } else { "no clue really".to_string() };
                tx.send(Command::Answer(answer)).unwrap();
                answered += 1;
                state
                    .wait_for(|s| s.turns_taken >= answered && s.phase != SessionPhase::Analyzing)
                    .await
                    .unwrap();
            }
            (strong, handle.await.unwrap().unwrap())
        }));
    }

    let mut ids = HashSet::new();
    for run in runs {
        let (strong, report) = run.await.unwrap();
        assert!(ids.insert(report.session_id));
        if strong {
            assert_eq!(report.termination, TerminationCause::CoverageComplete);
            assert_eq!(report.turns.len(), 2);
            assert_eq!(report.final_difficulty.get(), 4);
            assert!(report.competencies.iter().all(|c| c.status == CompetencyStatus::Strong));
        } else {
            assert_eq!(report.termination, TerminationCause::BudgetExhausted);
            assert_eq!(report.turns.len(), 4);
            assert_eq!(report.final_difficulty.get(), 1);
        }
    }
    assert_eq!(ids.len(), 6);
}

#[tokio::test]
async fn cancel_command_interrupts_turn_in_flight() {
    let client = StepClient::new([
        question("PIVOT", "How does TCP slow start work?", "Networking"),
        Step::Hang,
    ]);
    let s = session(client.clone(), &["Networking"], 5);
    let (tx, mut state, handle) = spawn_session(s);

    state.wait_for(|s| s.input_open()).await.unwrap();
    tx.send(Command::Answer("The window doubles ...".to_string())).unwrap();
    state
        .wait_for(|s| s.phase == SessionPhase::Analyzing)
        .await
        .unwrap();
    tx.send(Command::Cancel).unwrap();

    let snapshot = state
        .wait_for(|s| s.input_open() && s.error_message.is_some())
        .await
        .unwrap()
        .clone();
    assert_eq!(snapshot.turns_taken, 0);
    assert_eq!(snapshot.turns_remaining, 5);
    assert_eq!(snapshot.difficulty, 2);
    assert_eq!(snapshot.current_topic.as_deref(), Some("Networking"));

    tx.send(Command::Quit).unwrap();
    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.termination, TerminationCause::Aborted);
    assert!(report.turns.is_empty());
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn answer_during_turn_in_flight_is_reported_back() {
    let client = StepClient::new([
        question("PIVOT", "How does TCP slow start work?", "Networking"),
        Step::Hang,
    ]);
    let s = session(client.clone(), &["Networking"], 5);
    let (tx, mut state, handle) = spawn_session(s);

    state.wait_for(|s| s.input_open()).await.unwrap();
    tx.send(Command::Answer("The window doubles ...".to_string())).unwrap();
    state
        .wait_for(|s| s.phase == SessionPhase::Analyzing)
        .await
        .unwrap();
    tx.send(Command::Answer("typed again while waiting".to_string())).unwrap();

    let snapshot = state
        .wait_for(|s| s.input_open() && s.turns_taken == 1)
        .await
        .unwrap()
        .clone();
    assert_eq!(snapshot.error_message.as_deref(), Some(IGNORED_ANSWER_MESSAGE));
    assert_eq!(snapshot.turns_remaining, 4);

    tx.send(Command::Quit).unwrap();
    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.turns.len(), 1);
    assert_eq!(report.turns[0].answer, "The window doubles ...");
    assert!(report.turns[0].is_degraded());
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn dropping_command_sender_aborts_session() {
    let client = StepClient::new([question("PIVOT", "Q", "Security")]);
    let s = session(client, &["Security"], 5);
    let (tx, mut state, handle) = spawn_session(s);
    state.wait_for(|s| s.input_open()).await.unwrap();
    drop(tx);
    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.termination, TerminationCause::Aborted);
}
