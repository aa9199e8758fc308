//! 代理池模块
//!
//! 维护存活列表与候选列表，后台定期巡检并自动降级、恢复、淘汰代理

pub mod proxy_pool;
pub mod store;
mod sweeper;

// 重新导出主要类型
pub use proxy_pool::{
    parse_endpoint, LogSink, PoolOptions, PoolStatus, ProxyPool, SweepCallback,
    DEFAULT_MAX_CONCURRENT_PROBES, DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_SWEEP_INTERVAL,
};
pub use store::{AliveStore, Candidate, CandidateStore};
