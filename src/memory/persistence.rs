//! 面试记录持久化
//!
//! 会话结束后把 SessionReport 写成单个 JSON 文件（文件名为会话 id），供报告生成等下游读取。

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::interview::SessionReport;

#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// 写入记录；目录不存在时自动创建，返回文件路径
    pub fn save(&self, report: &SessionReport) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(report.session_id);
        std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
        tracing::info!(session = %report.session_id, path = %path.display(), "transcript saved");
        Ok(path)
    }

    pub fn load(&self, session_id: Uuid) -> anyhow::Result<SessionReport> {
        Self::load_file(self.path_for(session_id))
    }

    pub fn load_file(path: impl AsRef<Path>) -> anyhow::Result<SessionReport> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }
}
