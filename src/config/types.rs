//! 配置数据结构定义
//!
//! 定义配置文件结构体和验证逻辑

use crate::pool::{parse_endpoint, PoolOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 代理池配置
    #[serde(default)]
    pub pool: PoolConfig,
    /// 启动时添加的代理列表
    #[serde(default)]
    pub proxies: Vec<String>,
}

/// 代理池配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolConfig {
    /// 巡检间隔（秒）
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// 候选代理最大连续失败次数
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// 探测超时时间（毫秒）
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    /// 单次巡检最大并发探测数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_probes: usize,
    /// 是否输出详细诊断日志
    #[serde(default)]
    pub verbose: bool,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: default_sweep_interval(),
            max_consecutive_failures: default_max_consecutive_failures(),
            probe_timeout_ms: default_probe_timeout(),
            max_concurrent_probes: default_max_concurrent(),
            verbose: false,
            log_level: default_log_level(),
        }
    }
}

// 默认值函数
fn default_sweep_interval() -> u64 {
    5
}
fn default_max_consecutive_failures() -> u32 {
    10
}
fn default_probe_timeout() -> u64 {
    1000
}
fn default_max_concurrent() -> usize {
    32
}
fn default_log_level() -> String {
    "info".to_string()
}

impl From<&PoolConfig> for PoolOptions {
    fn from(config: &PoolConfig) -> Self {
        PoolOptions::default()
            .with_sweep_interval(Duration::from_secs(config.sweep_interval_seconds))
            .with_max_consecutive_failures(config.max_consecutive_failures)
            .with_probe_timeout(Duration::from_millis(config.probe_timeout_ms))
            .with_max_concurrent_probes(config.max_concurrent_probes)
            .with_verbose(config.verbose)
    }
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    let pool = &config.pool;

    if pool.sweep_interval_seconds == 0 {
        return Err("巡检间隔不能为0".to_string());
    }

    if pool.probe_timeout_ms == 0 {
        return Err("探测超时时间不能为0".to_string());
    }

    if pool.max_concurrent_probes == 0 {
        return Err("最大并发探测数不能为0".to_string());
    }

    if pool.max_consecutive_failures == 0 {
        return Err("最大连续失败次数至少为1".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&pool.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            pool.log_level, valid_log_levels
        ));
    }

    for proxy in &config.proxies {
        parse_endpoint(proxy).map_err(|e| e.to_string())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config {
            pool: PoolConfig::default(),
            proxies: vec!["http://127.0.0.1:9001".to_string()],
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&create_test_config()).is_ok());
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = create_test_config();
        config.pool.sweep_interval_seconds = 0;
        assert!(validate_config(&config).unwrap_err().contains("巡检间隔"));
    }

    #[test]
    fn test_zero_failures_rejected() {
        let mut config = create_test_config();
        config.pool.max_consecutive_failures = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = create_test_config();
        config.pool.log_level = "verbose".to_string();
        assert!(validate_config(&config).unwrap_err().contains("日志级别"));
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let mut config = create_test_config();
        config.proxies.push("127.0.0.1 9002".to_string());
        assert!(validate_config(&config).unwrap_err().contains("127.0.0.1 9002"));
    }

    #[test]
    fn test_pool_options_from_config() {
        let mut config = PoolConfig::default();
        config.sweep_interval_seconds = 30;
        config.probe_timeout_ms = 250;
        config.verbose = true;

        let options = PoolOptions::from(&config);
        assert_eq!(options.sweep_interval, Duration::from_secs(30));
        assert_eq!(options.probe_timeout, Duration::from_millis(250));
        assert_eq!(options.max_consecutive_failures, 10);
        assert!(options.verbose);
    }
}
