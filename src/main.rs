//! Interview - 控制台面试驱动
//!
//! 入口：初始化日志、加载配置与能力清单、启动会话任务，并在标准输入输出上完成问答；
//! 会话结束后把面试记录写入 transcript 目录。
//!
//! 用法：`interview [--config <file>] [--competencies <file.toml>] [能力名 ...]`
//! 输入 `/quit` 结束面试。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use interview::config::{load_config, AppConfig};
use interview::core::{
    create_oracle_from_config, create_session, spawn_session, Command, SessionPhase,
};
use interview::interview::{farewell, WELCOME_MESSAGE};
use interview::memory::TranscriptStore;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// 能力清单文件：`competencies = ["API Design", "Database"]`
#[derive(Debug, Deserialize)]
struct CompetencyFile {
    competencies: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(name = "interview", about = "Adaptive technical interview on the console")]
#[command(version)]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 能力清单 TOML：`competencies = [...]`
    #[arg(long = "competencies", value_name = "FILE")]
    competencies_file: Option<PathBuf>,

    /// 追加在清单文件之后的能力名
    #[arg(value_name = "COMPETENCY")]
    competencies: Vec<String>,
}

fn load_competencies(args: &Cli) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    if let Some(path) = &args.competencies_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: CompetencyFile = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        names.extend(file.competencies);
    }
    names.extend(args.competencies.iter().cloned());
    Ok(names)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    interview::observability::init();

    let args = Cli::parse();
    let cfg = load_config(args.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let competencies = load_competencies(&args)?;

    let oracle = create_oracle_from_config(&cfg);
    let session =
        create_session(&cfg, competencies, oracle).context("Failed to create interview session")?;
    let (cmd_tx, mut state_rx, handle) = spawn_session(session);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(format!("Interviewer: {WELCOME_MESSAGE}\n\n").as_bytes())
        .await?;

    let mut asked: Option<(usize, String)> = None;
    loop {
        let snapshot = state_rx.borrow_and_update().clone();
        if snapshot.phase == SessionPhase::Terminated {
            if let Some(cause) = snapshot.termination {
                stdout
                    .write_all(format!("\nInterviewer: {}\n", farewell(cause)).as_bytes())
                    .await?;
            }
            break;
        }
        if let Some(err) = &snapshot.error_message {
            stdout.write_all(format!("[{err}]\n").as_bytes()).await?;
        }
        if snapshot.input_open() {
            if let Some(question) = snapshot.current_question.clone() {
                let key = (snapshot.turns_taken, question.clone());
                if asked.as_ref() != Some(&key) {
                    stdout
                        .write_all(format!("Interviewer: {question}\n").as_bytes())
                        .await?;
                    asked = Some(key);
                }
            }
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            let cmd = match lines.next_line().await? {
                None => Command::Quit,
                Some(line) if line.trim() == "/quit" => Command::Quit,
                Some(line) => Command::Answer(line),
            };
            if cmd_tx.send(cmd).is_err() {
                break;
            }
        }
        if state_rx.changed().await.is_err() {
            break;
        }
    }
    stdout.flush().await?;

    let report = handle.await.context("Session task failed")?;
    if let Some(report) = report {
        let store = TranscriptStore::new(&cfg.app.transcript_dir);
        match store.save(&report) {
            Ok(path) => tracing::info!("Transcript written to {}", path.display()),
            Err(e) => tracing::warn!("Failed to write transcript: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn test_positional_names_follow_flags() {
        let cli = Cli::try_parse_from([
            "interview",
            "--config",
            "local.toml",
            "API Design",
            "Database",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("local.toml")));
        assert!(cli.competencies_file.is_none());
        assert_eq!(cli.competencies, vec!["API Design", "Database"]);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["interview", "--confg", "x.toml", "Rust"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_help_is_not_a_competency() {
        let err = Cli::try_parse_from(["interview", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_file_names_come_before_positional() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "competencies = [\"Caching\", \"Queues\"]").unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["interview", "--competencies", path.as_str(), "Rust"]).unwrap();
        assert_eq!(load_competencies(&cli).unwrap(), vec!["Caching", "Queues", "Rust"]);
    }
}
