//! Proxy Pool - 自愈代理池
//!
//! 维护一组上游代理，持续检测存活情况，并为出站HTTP请求随机分配可用代理：
//! - 添加代理时同步探测，只保留可用代理
//! - 后台定期巡检，失败的代理降级为候选，恢复后重新可用
//! - 连续失败过多的候选代理被淘汰
//! - 可插拔的存活探测，默认使用HTTP GET

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod pool;

// 重新导出主要类型
pub use config::{Config, PoolConfig};
pub use error::{PoolError, ProxyPoolError};
pub use health::{FnProber, HttpProber, Prober, SweepReport};
pub use pool::{PoolOptions, PoolStatus, ProxyPool};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
