//! 配置加载
//!
//! 读取TOML配置文件，支持 `${VAR}` 形式的环境变量替换

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// 配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 读取并验证配置文件
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串解析并验证配置
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否替换 `${VAR}`
    enable_env_substitution: bool,
}

fn env_var_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}"))
        .as_ref()
        .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)).into())
}

impl TomlConfigLoader {
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换环境变量，遇到第一个未定义的变量时返回错误
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let mut missing: Option<String> = None;
        let replaced = env_var_pattern()?.replace_all(content, |caps: &Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| {
                if missing.is_none() {
                    missing = Some(caps[1].to_string());
                }
                String::new()
            })
        });

        match missing {
            Some(var) => Err(ConfigError::EnvVarError { var }.into()),
            None => Ok(replaced.into_owned()),
        }
    }

    fn parse(&self, content: &str) -> Result<Config> {
        let content = self.substitute_env_vars(content)?;
        let config = toml::from_str::<Config>(&content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?;
        self.validate(&config)?;
        Ok(config)
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into())
            }
            Err(e) => {
                return Err(ConfigError::ParseError(format!("读取文件失败: {}", e)).into())
            }
        };

        let config = self.parse(&content)?;
        log::info!(
            "已加载配置文件 {}: {} 个代理",
            path.display(),
            config.proxies.len()
        );
        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        self.parse(content)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 默认配置文件路径
///
/// 优先当前目录的 config.toml，其次用户配置目录下的 proxy-pool/config.toml
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from("config.toml");
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|dir| dir.join(crate::APP_NAME).join("config.toml"))
        .unwrap_or(local)
}

/// `init` 命令写出的示例配置
pub const SAMPLE_CONFIG: &str = r#"# proxy-pool 配置文件

# 启动时添加的代理
proxies = [
    "http://127.0.0.1:9001",
]

[pool]
# 巡检间隔（秒）
sweep_interval_seconds = 5
# 候选代理连续失败超过该次数后淘汰
max_consecutive_failures = 10
# 探测超时时间（毫秒）
probe_timeout_ms = 1000
# 单次巡检最大并发探测数
max_concurrent_probes = 32
# 是否输出详细诊断日志
verbose = false
# 日志级别: debug, info, warn, error
log_level = "info"
"#;
