//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `INTERVIEW__*` 覆盖（双下划线表示嵌套，如 `INTERVIEW__LLM__PROVIDER=openai`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::InterviewError;
use crate::interview::difficulty::{DEFAULT_LEVEL, MAX_LEVEL, MIN_LEVEL};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub interview: InterviewSection,
}

/// [app] 段：应用名、记录输出目录
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 面试记录（SessionReport JSON）写入目录
    #[serde(default = "default_transcript_dir")]
    pub transcript_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            transcript_dir: default_transcript_dir(),
        }
    }
}

fn default_transcript_dir() -> PathBuf {
    PathBuf::from("transcripts")
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 采样温度；不填时用客户端默认的低温度
    pub temperature: Option<f32>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次 Oracle 调用超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

impl LlmTimeoutsSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request.max(1))
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [interview] 段：轮次预算、初始难度、连续降级上限、历史窗口
#[derive(Debug, Clone, Deserialize)]
pub struct InterviewSection {
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_initial_difficulty")]
    pub initial_difficulty: u8,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// 提示词中保留的最近问答数
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for InterviewSection {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            initial_difficulty: default_initial_difficulty(),
            max_consecutive_failures: default_max_consecutive_failures(),
            history_window: default_history_window(),
        }
    }
}

impl InterviewSection {
    /// 钳制到合法范围：难度 [1,5]，预算与失败上限至少为 1
    pub fn normalized(mut self) -> Self {
        self.initial_difficulty = self.initial_difficulty.clamp(MIN_LEVEL, MAX_LEVEL);
        self.max_turns = self.max_turns.max(1);
        self.max_consecutive_failures = self.max_consecutive_failures.max(1);
        self
    }
}

fn default_max_turns() -> u32 {
    12
}

fn default_initial_difficulty() -> u8 {
    DEFAULT_LEVEL
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_history_window() -> usize {
    5
}

/// 从 config 目录加载配置，环境变量 INTERVIEW__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 INTERVIEW__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, InterviewError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("INTERVIEW")
            .separator("__")
            .try_parsing(true),
    );

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.interview = cfg.interview.normalized();
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.interview.max_turns, 12);
        assert_eq!(cfg.interview.initial_difficulty, 2);
        assert_eq!(cfg.interview.max_consecutive_failures, 3);
        assert_eq!(cfg.interview.history_window, 5);
        assert_eq!(cfg.llm.timeouts.request_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.app.transcript_dir, PathBuf::from("transcripts"));
    }

    #[test]
    fn test_normalized_clamps() {
        let section = InterviewSection {
            max_turns: 0,
            initial_difficulty: 9,
            max_consecutive_failures: 0,
            history_window: 2,
        }
        .normalized();
        assert_eq!(section.max_turns, 1);
        assert_eq!(section.initial_difficulty, 5);
        assert_eq!(section.max_consecutive_failures, 1);
    }

    #[test]
    fn test_explicit_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[llm]\nprovider = \"mock\"\ntemperature = 0.5\n\n[interview]\nmax_turns = 4\ninitial_difficulty = 0\n"
        )
        .unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.llm.temperature, Some(0.5));
        assert_eq!(cfg.interview.max_turns, 4);
        assert_eq!(cfg.interview.initial_difficulty, 1);
        assert_eq!(cfg.interview.history_window, 5);
    }

    #[test]
    fn test_broken_file_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[interview]\nmax_turns = \"many\"\n").unwrap();
        let err = load_config(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, InterviewError::ConfigError(_)));
    }
}
