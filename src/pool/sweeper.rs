//! 存活巡检
//!
//! 巡检在读锁下取快照，在锁外探测，然后在写锁下一次性应用变更计划。
//! 调度循环在每次巡检结束后才开始计时下一次，慢巡检只会推迟下一次，不会重叠。

use crate::health::SweepReport;
use crate::pool::proxy_pool::PoolInner;
use crate::pool::store::{AliveStore, Candidate, CandidateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// 被读写锁保护的两个列表
#[derive(Debug, Default)]
pub(crate) struct Stores {
    pub(crate) alive: AliveStore,
    pub(crate) candidates: CandidateStore,
}

/// 一次巡检的变更计划，下标都指向巡检开始时的快照
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SweepPlan {
    /// 探测失败的存活代理
    pub(crate) demote: Vec<usize>,
    /// 探测成功的候选代理
    pub(crate) promote: Vec<usize>,
    /// 探测失败的候选代理
    pub(crate) failed: Vec<usize>,
}

impl SweepPlan {
    /// 根据探测结果分类
    pub(crate) fn classify(alive_results: &[bool], candidate_results: &[bool]) -> Self {
        let mut plan = Self::default();

        for (index, alive) in alive_results.iter().enumerate() {
            if !alive {
                plan.demote.push(index);
            }
        }

        for (index, alive) in candidate_results.iter().enumerate() {
            if *alive {
                plan.promote.push(index);
            } else {
                plan.failed.push(index);
            }
        }

        plan
    }

    /// 计划是否不需要任何写操作
    pub(crate) fn is_empty(&self) -> bool {
        self.demote.is_empty() && self.promote.is_empty() && self.failed.is_empty()
    }

    /// 应用计划，调用方必须持有写锁
    ///
    /// 只有巡检会删除元素且巡检之间串行，`add` 只会在末尾追加，
    /// 所以快照下标在这里仍然有效。删除一律从大下标到小下标进行。
    pub(crate) fn apply(self, stores: &mut Stores, max_failures: u32, report: &mut SweepReport) {
        // (下标, 是否恢复)；不恢复即淘汰
        let mut removals: Vec<(usize, bool)> = Vec::with_capacity(self.promote.len());

        for index in self.failed {
            if let Some(candidate) = stores.candidates.get_mut(index) {
                if candidate.record_failure(max_failures) {
                    removals.push((index, false));
                } else {
                    report.still_failing += 1;
                }
            }
        }
        removals.extend(self.promote.into_iter().map(|index| (index, true)));
        removals.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut promoted = Vec::new();
        for (index, promote) in removals {
            if let Some(candidate) = stores.candidates.swap_remove(index) {
                if promote {
                    report.promoted.push(candidate.endpoint.to_string());
                    promoted.push(candidate.endpoint);
                } else {
                    report.evicted.push(candidate.endpoint.to_string());
                }
            }
        }

        let mut demote = self.demote;
        demote.sort_unstable_by(|a, b| b.cmp(a));
        for index in demote {
            if let Some(endpoint) = stores.alive.swap_remove(index) {
                report.demoted.push(endpoint.to_string());
                stores.candidates.push(Candidate::new(endpoint));
            }
        }

        for endpoint in promoted {
            stores.alive.push(endpoint);
        }
    }
}

/// 巡检调度循环，直到收到停止信号
///
/// 停止信号只在等待期间生效；已经开始的巡检会完整执行并应用结果
pub(crate) async fn run(inner: Arc<PoolInner>, interval: Duration, mut stop_rx: watch::Receiver<bool>) {
    info!(interval_ms = interval.as_millis() as u64, "代理存活巡检任务已启动");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop_rx.changed() => break,
        }

        if *stop_rx.borrow() {
            break;
        }

        let report = inner.sweep().await;
        debug!(sweep_id = %report.id, "巡检完成，{}ms 后开始下一次", interval.as_millis());
    }

    info!("代理存活巡检任务已停止");
}
