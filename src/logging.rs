//! 日志系统模块
//!
//! 基于 tracing 的结构化日志，`log` 记录通过 tracing-log 桥接进来

use crate::pool::PoolStatus;
use anyhow::{anyhow, Context};
use log::LevelFilter;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 默认日志级别
    pub level: LevelFilter,
    /// 日志文件路径，只在 `console` 关闭时生效
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 按模块覆盖日志级别，例如 `proxy_pool::pool` => Debug
    pub module_levels: HashMap<String, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }
}

/// 进程内的日志安装状态
#[derive(Default)]
struct InstallState {
    /// 安装结果，`None` 表示还没安装过
    outcome: Option<Result<(), String>>,
    config: Option<LogConfig>,
}

static INSTALL_STATE: OnceLock<Mutex<InstallState>> = OnceLock::new();

fn install_state() -> anyhow::Result<MutexGuard<'static, InstallState>> {
    INSTALL_STATE
        .get_or_init(Mutex::default)
        .lock()
        .map_err(|e| anyhow!("日志状态锁异常: {}", e))
}

/// 日志系统
#[derive(Debug)]
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 只持有配置，不安装全局 subscriber，用于输出状态日志
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    /// 安装全局日志，重复调用会复用第一次的结果
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 安装全局日志
    ///
    /// `force_reinit` 为 true 时忽略之前的结果重新安装。tracing 的全局
    /// subscriber 只能设置一次，重新安装遇到已存在的 subscriber 时视为成功。
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        if !force_reinit {
            if let Some(previous) = install_state()?.outcome.clone() {
                previous.map_err(|e| anyhow!("日志系统之前初始化失败: {}", e))?;
                return Ok(Self::new(config));
            }
        }

        let outcome = Self::install(&config);

        {
            let mut state = install_state()?;
            state.outcome = Some(outcome.as_ref().map(|_| ()).map_err(|e| e.to_string()));
            state.config = Some(config.clone());
        }

        outcome?;
        Ok(Self::new(config))
    }

    fn install(config: &LogConfig) -> anyhow::Result<()> {
        static LOG_BRIDGE: OnceLock<Result<(), String>> = OnceLock::new();
        LOG_BRIDGE
            .get_or_init(|| tracing_log::LogTracer::init().map_err(|e| e.to_string()))
            .clone()
            .map_err(|e| anyhow!("LogTracer初始化失败: {}", e))?;

        let filter = Self::build_filter(config);

        let installed = match (&config.file_path, config.console) {
            (Some(path), false) => {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("创建日志文件失败: {}", path.display()))?;
                let layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true);
                registry().with(filter).with(layer).try_init()
            }
            _ => registry()
                .with(filter)
                .with(Self::console_layer(config.json_format))
                .try_init(),
        };

        match installed {
            Ok(()) => {
                tracing::info!(
                    level = %config.level,
                    json = config.json_format,
                    "日志系统初始化完成"
                );
                Ok(())
            }
            // try_init 也会安装 LogTracer；测试进程里可能已经装过 subscriber
            Err(e)
                if e.to_string().contains("already been set")
                    || e.to_string().contains("already initialized") =>
            {
                tracing::debug!("日志系统已经初始化过了");
                Ok(())
            }
            Err(e) => Err(anyhow!("tracing subscriber初始化失败: {}", e)),
        }
    }

    /// RUST_LOG 优先，再叠加默认级别和模块级别
    fn build_filter(config: &LogConfig) -> EnvFilter {
        let mut filter =
            EnvFilter::from_default_env().add_directive(level_directive(config.level));

        for (module, level) in &config.module_levels {
            match format!("{}={}", module, level.as_str().to_lowercase()).parse::<Directive>() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => tracing::warn!("忽略无效的模块日志级别 {}: {}", module, e),
            }
        }

        filter
    }

    fn console_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let timer = fmt::time::ChronoUtc::rfc_3339();
        if json {
            fmt::layer()
                .json()
                .with_timer(timer)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer()
                .with_timer(timer)
                .with_target(true)
                .with_thread_ids(true)
                .boxed()
        }
    }

    /// 全局日志是否已安装
    pub fn is_initialized() -> bool {
        install_state()
            .map(|state| state.outcome.is_some())
            .unwrap_or(false)
    }

    /// 安装全局日志时使用的配置
    pub fn current_config() -> Option<LogConfig> {
        install_state().ok().and_then(|state| state.config.clone())
    }

    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Ok(mut state) = install_state() {
            *state = InstallState::default();
        }
    }

    /// 输出一行代理池状态
    pub fn pool_status_log(&self, status: &PoolStatus) {
        if self.config.json_format {
            let entry = serde_json::json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "type": "pool_status",
                "status": status,
            });
            tracing::info!("{entry}");
            return;
        }

        let last_sweep_ms = status.last_sweep.as_ref().map(|r| r.duration_ms());
        tracing::info!(
            last_sweep_ms,
            "POOL: 存活 {} / 候选 {} / 已巡检 {} 次{}",
            status.alive,
            status.candidates,
            status.sweeps_completed,
            if status.is_running { "" } else { " (已停止)" }
        );
    }
}

fn level_directive(level: LevelFilter) -> Directive {
    use tracing_subscriber::filter::LevelFilter as TracingLevel;
    let level = match level {
        LevelFilter::Off => TracingLevel::OFF,
        LevelFilter::Error => TracingLevel::ERROR,
        LevelFilter::Warn => TracingLevel::WARN,
        LevelFilter::Info => TracingLevel::INFO,
        LevelFilter::Debug => TracingLevel::DEBUG,
        LevelFilter::Trace => TracingLevel::TRACE,
    };
    level.into()
}
