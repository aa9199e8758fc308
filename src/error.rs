//! 错误处理模块
//!
//! 定义代理池的统一错误类型

use thiserror::Error;

/// Proxy Pool 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum ProxyPoolError {
    /// 代理池操作错误
    #[error("代理池错误: {0}")]
    Pool(#[from] PoolError),

    /// 存活探测相关错误
    #[error("存活探测错误: {0}")]
    Probe(#[from] ProbeError),

    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 代理池操作错误类型
///
/// 所有错误都同步返回给调用方，后台巡检的探测失败不会出现在这里
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// 代理地址格式错误
    #[error("代理地址无效: {address} ({reason})")]
    InvalidAddress { address: String, reason: String },

    /// 添加时的首次探测失败
    #[error("代理不可用: {endpoint}")]
    EndpointUnreachable { endpoint: String },

    /// 当前没有存活的代理
    #[error("没有可用的代理")]
    NoneAvailable,
}

/// 存活探测错误类型
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ProxyPoolError>;
