//! 能力登记表：目标能力的有序集合及各自覆盖状态
//!
//! 初始化时由外部能力清单创建（全部 Pending），此后只由 Turn Analyzer 改写状态与证据；
//! 能力永不删除，只会重新标记状态。

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::InterviewError;

/// 能力覆盖状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetencyStatus {
    /// 尚未考察
    Pending,
    /// 有一定证据但不充分
    Partial,
    /// 已充分证明
    Strong,
    /// 表现薄弱
    Weak,
}

impl CompetencyStatus {
    /// 选题用的分值：越低越优先；Pending 不参与打分
    pub fn score(self) -> Option<u8> {
        match self {
            CompetencyStatus::Pending => None,
            CompetencyStatus::Weak => Some(1),
            CompetencyStatus::Partial => Some(2),
            CompetencyStatus::Strong => Some(3),
        }
    }
}

impl fmt::Display for CompetencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompetencyStatus::Pending => write!(f, "PENDING"),
            CompetencyStatus::Partial => write!(f, "PARTIAL"),
            CompetencyStatus::Strong => write!(f, "STRONG"),
            CompetencyStatus::Weak => write!(f, "WEAK"),
        }
    }
}

/// 单项能力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    pub name: String,
    pub status: CompetencyStatus,
    /// 最近一次涉及该能力的分析给出的证据
    pub evidence: String,
}

impl Competency {
    fn new(name: String) -> Self {
        Self {
            name,
            status: CompetencyStatus::Pending,
            evidence: String::new(),
        }
    }
}

/// 有序能力表（保持声明顺序，名称唯一）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyRegistry {
    items: Vec<Competency>,
}

impl CompetencyRegistry {
    /// 由外部清单创建；空清单、空白名称、重复名称（忽略大小写）均拒绝，不做静默去重
    pub fn new<I, S>(names: I) -> Result<Self, InterviewError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<Competency> = Vec::new();
        for raw in names {
            let name = raw.into().trim().to_string();
            if name.is_empty() {
                return Err(InterviewError::InvalidCompetencies(
                    "competency name must not be blank".to_string(),
                ));
            }
            if items.iter().any(|c| c.name.eq_ignore_ascii_case(&name)) {
                return Err(InterviewError::InvalidCompetencies(format!(
                    "duplicate competency: {name}"
                )));
            }
            items.push(Competency::new(name));
        }
        if items.is_empty() {
            return Err(InterviewError::InvalidCompetencies(
                "at least one target competency is required".to_string(),
            ));
        }
        Ok(Self { items })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Competency> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Competency> {
        self.items.iter().find(|c| c.name == name)
    }

    /// 按名称查找（忽略大小写与首尾空白），返回登记表中的规范名称
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.items
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.name.as_str())
    }

    /// 改写某项能力的状态与证据；名称不存在时返回 false
    pub fn update(&mut self, name: &str, status: CompetencyStatus, evidence: impl Into<String>) -> bool {
        match self.items.iter_mut().find(|c| c.name == name) {
            Some(c) => {
                c.status = status;
                c.evidence = evidence.into();
                true
            }
            None => false,
        }
    }

    /// 尚未达到 Strong 的能力名称（声明顺序）
    pub fn remaining(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|c| c.status != CompetencyStatus::Strong)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// 渲染为 prompt 清单：`- name [STATUS]`
    pub fn checklist(&self) -> String {
        self.items
            .iter()
            .map(|c| format!("- {} [{}]", c.name, c.status))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_seeds_pending_in_order() {
        let reg = CompetencyRegistry::new(["API Design", "Database"]).unwrap();
        let names: Vec<_> = reg.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["API Design", "Database"]);
        assert!(reg.iter().all(|c| c.status == CompetencyStatus::Pending));
    }

    #[test]
    fn test_rejects_duplicates_and_blank() {
        assert!(matches!(
            CompetencyRegistry::new(["Rust", "rust"]),
            Err(InterviewError::InvalidCompetencies(_))
        ));
        assert!(CompetencyRegistry::new(["Rust", "  "]).is_err());
        assert!(CompetencyRegistry::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_update_keeps_every_competency() {
        let mut reg = CompetencyRegistry::new(["A", "B"]).unwrap();
        assert!(reg.update("A", CompetencyStatus::Strong, "solid"));
        assert!(!reg.update("Z", CompetencyStatus::Strong, "n/a"));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get("A").unwrap().evidence, "solid");
        assert_eq!(reg.remaining(), vec!["B"]);
    }

    #[test]
    fn test_canonical_name_is_case_insensitive() {
        let reg = CompetencyRegistry::new(["API Design"]).unwrap();
        assert_eq!(reg.canonical_name(" api design "), Some("API Design"));
        assert_eq!(reg.canonical_name("Kubernetes"), None);
    }
}
