//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, ConfigLoader, TomlConfigLoader, SAMPLE_CONFIG};
use crate::error::{PoolError, Result};
use crate::health::{HttpProber, Prober};
use crate::logging::{LogConfig, LoggingSystem};
use crate::pool::{parse_endpoint, PoolOptions, ProxyPool};
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载配置；未显式指定且默认路径不存在时使用默认配置
async fn load_config(args: &Args) -> Result<Config> {
    let config_path = args.get_config_path();
    if args.config.is_none() && !config_path.exists() {
        info!("未找到配置文件，使用默认配置");
        return Ok(Config::default());
    }

    let loader = TomlConfigLoader::new(true);
    loader.load_from_file(&config_path).await
}

/// 运行命令：启动代理池并定期输出状态，直到收到 Ctrl-C
pub struct RunCommand;

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Run {
            proxies,
            interval,
            report_interval,
            json,
        } = &args.command
        else {
            return Ok(());
        };

        let config = load_config(args).await?;

        let mut options = PoolOptions::from(&config.pool)
            .with_verbose(config.pool.verbose || args.is_verbose())
            .with_log_sink(|line| info!(target: "proxy_pool::diagnostics", "{line}"));
        if let Some(secs) = interval {
            options = options.with_sweep_interval(Duration::from_secs(*secs));
        }

        let pool = ProxyPool::new(options)?;

        for address in config.proxies.iter().chain(proxies.iter()) {
            match pool.add(address).await {
                Ok(endpoint) => info!("已添加代理: {}", endpoint),
                Err(e) => warn!("添加代理失败: {}", e),
            }
        }

        let status_logger = LoggingSystem::new(LogConfig {
            json_format: *json,
            ..Default::default()
        });

        let mut ticker = tokio::time::interval(Duration::from_secs((*report_interval).max(1)));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    status_logger.pool_status_log(&pool.status().await);
                }
                result = &mut shutdown => {
                    if let Err(e) = result {
                        warn!("监听停止信号失败: {}", e);
                    }
                    info!("收到停止信号");
                    break;
                }
            }
        }

        pool.stop();
        status_logger.pool_status_log(&pool.status().await);
        Ok(())
    }
}

/// 单次探测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Check {
            address,
            timeout,
            format,
        } = &args.command
        else {
            return Ok(());
        };

        let endpoint = parse_endpoint(address)?;
        let prober = HttpProber::new(Duration::from_millis(*timeout))?;

        let start = Instant::now();
        let alive = prober.probe(&endpoint).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match format {
            OutputFormat::Json => {
                let result = serde_json::json!({
                    "endpoint": endpoint.as_str(),
                    "alive": alive,
                    "elapsed_ms": elapsed_ms,
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            OutputFormat::Text => {
                println!(
                    "{} {} ({}ms)",
                    endpoint,
                    if alive { "存活" } else { "不可用" },
                    elapsed_ms
                );
            }
        }

        if alive {
            Ok(())
        } else {
            Err(PoolError::EndpointUnreachable {
                endpoint: endpoint.to_string(),
            }
            .into())
        }
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, SAMPLE_CONFIG).await?;
        println!("配置文件已创建: {}", config_path.display());
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Validate { config_path } = &args.command else {
            return Ok(());
        };

        let path = config_path.clone().unwrap_or_else(|| args.get_config_path());
        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(&path).await?;

        println!("配置文件有效: {}", path.display());
        println!("  巡检间隔: {}秒", config.pool.sweep_interval_seconds);
        println!("  最大连续失败次数: {}", config.pool.max_consecutive_failures);
        println!("  探测超时: {}毫秒", config.pool.probe_timeout_ms);
        println!("  代理数量: {}", config.proxies.len());
        Ok(())
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}
