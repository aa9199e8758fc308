//! Proxy Pool 主程序入口
//!
//! 自愈代理池命令行工具

use anyhow::{Context, Result};
use clap::Parser;
use proxy_pool::cli::args::{Args, Commands};
use proxy_pool::cli::commands::{
    CheckCommand, Command, InitCommand, RunCommand, ValidateCommand, VersionCommand,
};
use proxy_pool::config::{ConfigLoader, TomlConfigLoader};
use proxy_pool::logging::{LogConfig, LoggingSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 命令行未指定日志级别时读取配置文件
    let config_level = TomlConfigLoader::default()
        .load_from_file(args.get_config_path())
        .await
        .ok()
        .map(|config| config.pool.log_level);

    // 初始化日志系统
    let log_config = LogConfig {
        level: args.effective_log_level(config_level.as_deref()).into(),
        console: true,
        json_format: false,
        ..Default::default()
    };

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Proxy Pool v{} 启动", proxy_pool::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: &dyn Command = match &args.command {
        Commands::Run { .. } => &RunCommand,
        Commands::Check { .. } => &CheckCommand,
        Commands::Init { .. } => &InitCommand,
        Commands::Validate { .. } => &ValidateCommand,
        Commands::Version { .. } => &VersionCommand,
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
