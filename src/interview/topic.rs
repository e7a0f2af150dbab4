//! 选题：从剩余清单中挑选下一项目标能力
//!
//! 优先 Pending（声明顺序，首个未考察者胜出）；没有 Pending 时选分值最低的非 Strong 项
//! （Weak 优先于 Partial，同分按声明顺序）；全部 Strong 返回 None，表示覆盖完成。
//! Strong 项只能由 Strategist 的 DEEPEN 决策点名重新触发。

use crate::interview::competency::{CompetencyRegistry, CompetencyStatus};
use crate::oracle::schema::Decision;

#[derive(Debug, Default, Clone, Copy)]
pub struct TopicSelector;

impl TopicSelector {
    pub fn select(registry: &CompetencyRegistry) -> Option<&str> {
        if let Some(pending) = registry
            .iter()
            .find(|c| c.status == CompetencyStatus::Pending)
        {
            return Some(pending.name.as_str());
        }
        registry
            .iter()
            .filter(|c| c.status != CompetencyStatus::Strong)
            .min_by_key(|c| c.status.score())
            .map(|c| c.name.as_str())
    }

    /// 结合 Strategist 的决策确定下一题话题：
    /// - DEEPEN 点名已登记能力：采用之（Strong 也可，显式覆盖）
    /// - PIVOT 点名已登记的非 Strong 能力：采用之
    /// - 其余情况保持选题结果
    pub fn resolve<'a>(
        registry: &'a CompetencyRegistry,
        selected: &'a str,
        decision: Decision,
        new_topic: &str,
    ) -> &'a str {
        let Some(named) = registry.canonical_name(new_topic) else {
            return selected;
        };
        match decision {
            Decision::Deepen => named,
            Decision::Pivot => match registry.get(named) {
                Some(c) if c.status != CompetencyStatus::Strong => named,
                _ => selected,
            },
            Decision::Close => selected,
        }
    }
}
