//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Proxy Pool - 自愈代理池
#[derive(Parser, Debug, Clone)]
#[command(name = "proxy-pool", version = crate::VERSION, about = crate::APP_DESCRIPTION)]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long, value_name = "FILE", env = "PROXY_POOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// 日志级别，未指定时使用配置文件中的 log_level
    #[arg(short, long, value_enum, env = "PROXY_POOL_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// 输出代理池详细诊断日志
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&log::LevelFilter::from(*self).as_str().to_lowercase())
    }
}

/// 子命令
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动代理池并持续巡检，直到 Ctrl-C
    Run {
        /// 额外添加的代理地址
        #[arg(value_name = "PROXY")]
        proxies: Vec<String>,

        /// 巡检间隔（秒），覆盖配置文件
        #[arg(short, long, value_name = "SECONDS", env = "PROXY_POOL_INTERVAL")]
        interval: Option<u64>,

        /// 状态输出间隔（秒）
        #[arg(short, long, value_name = "SECONDS", default_value_t = 30)]
        report_interval: u64,

        /// 以JSON格式输出状态日志
        #[arg(long)]
        json: bool,
    },

    /// 对单个代理执行一次探测
    Check {
        /// 代理地址
        address: String,

        /// 超时时间（毫秒）
        #[arg(short, long, value_name = "MILLIS", default_value_t = 1000)]
        timeout: u64,

        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// 生成示例配置文件
    Init {
        /// 配置文件路径
        #[arg(value_name = "FILE", default_value = "config.toml")]
        config_path: PathBuf,

        /// 覆盖已存在的文件
        #[arg(short, long)]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径，默认同 --config
        #[arg(value_name = "FILE")]
        config_path: Option<PathBuf>,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }

    /// 是否启用详细输出
    pub fn is_verbose(&self) -> bool {
        self.verbose || matches!(self.log_level, Some(LogLevel::Debug))
    }

    /// 实际生效的日志级别：命令行优先，其次是配置文件，默认info
    pub fn effective_log_level(&self, config_level: Option<&str>) -> LogLevel {
        self.log_level
            .or_else(|| config_level.and_then(|level| LogLevel::from_str(level, true).ok()))
            .unwrap_or(LogLevel::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let args = Args::try_parse_from([
            "proxy-pool",
            "--config",
            "pool.toml",
            "run",
            "http://127.0.0.1:9001",
            "http://127.0.0.1:9002",
            "--interval",
            "10",
        ])
        .unwrap();

        assert_eq!(args.get_config_path(), PathBuf::from("pool.toml"));
        match args.command {
            Commands::Run {
                proxies,
                interval,
                report_interval,
                json,
            } => {
                assert_eq!(proxies.len(), 2);
                assert_eq!(interval, Some(10));
                assert_eq!(report_interval, 30);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_command() {
        let args =
            Args::try_parse_from(["proxy-pool", "check", "http://127.0.0.1:9001", "-f", "json"])
                .unwrap();
        assert!(matches!(
            args.command,
            Commands::Check {
                timeout: 1000,
                format: OutputFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_verbose_from_debug_level() {
        let args = Args::try_parse_from(["proxy-pool", "-l", "debug", "version"]).unwrap();
        assert!(args.is_verbose());
        assert_eq!(
            log::LevelFilter::from(args.effective_log_level(Some("error"))),
            log::LevelFilter::Debug
        );
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = Args::try_parse_from(["proxy-pool", "version"]).unwrap();
        assert!(!args.is_verbose());
        assert_eq!(args.effective_log_level(Some("warn")), LogLevel::Warn);
        assert_eq!(args.effective_log_level(Some("bogus")), LogLevel::Info);
        assert_eq!(args.effective_log_level(None), LogLevel::Info);
    }
}
