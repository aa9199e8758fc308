//! 存活探测模块
//!
//! 提供代理存活探测接口和巡检结果类型

pub mod checker;
pub mod result;

// 重新导出主要类型
pub use checker::{FnProber, HttpProber, Prober, DEFAULT_PROBE_TIMEOUT};
pub use result::SweepReport;
