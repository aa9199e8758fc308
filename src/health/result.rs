//! 巡检结果数据结构
//!
//! 定义一次存活巡检的汇总报告

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// 一次巡检的汇总报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// 巡检ID
    pub id: Uuid,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 总耗时
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// 探测的存活代理数
    pub probed_alive: usize,
    /// 探测的候选代理数
    pub probed_candidates: usize,
    /// 降级为候选的代理
    pub demoted: Vec<String>,
    /// 恢复为存活的代理
    pub promoted: Vec<String>,
    /// 被淘汰的代理
    pub evicted: Vec<String>,
    /// 仍然失败但保留在候选中的代理数
    pub still_failing: usize,
}

impl SweepReport {
    /// 创建新的空报告
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            duration: Duration::from_millis(0),
            probed_alive: 0,
            probed_candidates: 0,
            demoted: Vec::new(),
            promoted: Vec::new(),
            evicted: Vec::new(),
            still_failing: 0,
        }
    }

    /// 设置探测数量
    pub fn with_probed(mut self, alive: usize, candidates: usize) -> Self {
        self.probed_alive = alive;
        self.probed_candidates = candidates;
        self
    }

    /// 设置耗时
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// 本次巡检是否改变了代理池
    pub fn has_changes(&self) -> bool {
        !self.demoted.is_empty() || !self.promoted.is_empty() || !self.evicted.is_empty()
    }

    /// 获取耗时（毫秒）
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    /// 转换为JSON字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Duration序列化模块
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_has_no_changes() {
        let report = SweepReport::new(Utc::now()).with_probed(3, 1);
        assert!(!report.has_changes());
        assert_eq!(report.probed_alive, 3);
        assert_eq!(report.probed_candidates, 1);
    }

    #[test]
    fn test_report_json_uses_millis() {
        let mut report =
            SweepReport::new(Utc::now()).with_duration(Duration::from_millis(1500));
        report.evicted.push("http://127.0.0.1:9002/".to_string());

        assert!(report.has_changes());
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["duration"], 1500);
        assert_eq!(value["evicted"][0], "http://127.0.0.1:9002/");

        let back: SweepReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.duration_ms(), 1500);
    }
}
