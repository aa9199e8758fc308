//! 代理存活探测器实现
//!
//! 提供可插拔的探测接口，以及默认的HTTP GET探测

use crate::error::ProbeError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;
use url::Url;

/// 默认探测超时时间
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// 存活探测器trait，判断一个代理当前是否可用
#[async_trait]
pub trait Prober: Send + Sync {
    /// 探测代理是否存活
    ///
    /// # 参数
    /// * `endpoint` - 代理地址
    ///
    /// # 返回
    /// * `bool` - 存活返回true
    async fn probe(&self, endpoint: &Url) -> bool;
}

/// HTTP探测器：对代理地址发起GET请求，状态码为200即视为存活
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// 超时时间
    timeout: Duration,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// # 参数
    /// * `timeout` - 单次探测超时时间
    ///
    /// # 返回
    /// * `Result<Self, ProbeError>` - 探测器实例
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self { client, timeout })
    }

    /// 获取超时时间
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 格式化请求错误信息
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            "Connection refused".to_string()
        } else if error.is_request() {
            "Invalid request".to_string()
        } else {
            format!("Request failed: {error}")
        }
    }
}

impl fmt::Debug for HttpProber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpProber")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &Url) -> bool {
        let start_time = Instant::now();
        let response = timeout(self.timeout, self.client.get(endpoint.clone()).send()).await;
        let elapsed = start_time.elapsed();

        match response {
            Ok(Ok(response)) => {
                let alive = response.status() == StatusCode::OK;
                debug!(
                    endpoint = %endpoint,
                    status = response.status().as_u16(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "探测完成"
                );
                alive
            }
            Ok(Err(e)) => {
                debug!(
                    endpoint = %endpoint,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "探测失败: {}",
                    Self::format_request_error(&e)
                );
                false
            }
            Err(_) => {
                debug!(endpoint = %endpoint, "探测超时");
                false
            }
        }
    }
}

/// 闭包探测器，把普通函数适配为 [`Prober`]
///
/// 常用于测试中的模拟探测，或调用方自带的探测逻辑
pub struct FnProber<F> {
    check: F,
}

impl<F> FnProber<F>
where
    F: Fn(&Url) -> bool + Send + Sync,
{
    /// 用闭包创建探测器
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

#[async_trait]
impl<F> Prober for FnProber<F>
where
    F: Fn(&Url) -> bool + Send + Sync,
{
    async fn probe(&self, endpoint: &Url) -> bool {
        (self.check)(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_prober_creation() {
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT);
        assert!(prober.is_ok());
        assert_eq!(prober.unwrap().timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_http_prober_status_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .create_async()
            .await;

        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let endpoint = Url::parse(&server.url()).unwrap();

        assert!(prober.probe(&endpoint).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_prober_status_not_ok() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(503)
            .create_async()
            .await;

        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let endpoint = Url::parse(&server.url()).unwrap();

        assert!(!prober.probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_http_prober_other_success_codes_are_dead() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(204)
            .create_async()
            .await;

        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let endpoint = Url::parse(&server.url()).unwrap();

        // 只有200才算存活
        assert!(!prober.probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_http_prober_connection_refused() {
        let prober = HttpProber::new(Duration::from_millis(500)).unwrap();
        let endpoint = Url::parse("http://127.0.0.1:1").unwrap();

        assert!(!prober.probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_fn_prober() {
        let prober = FnProber::new(|u: &Url| u.port() == Some(9001));

        assert!(prober.probe(&Url::parse("http://127.0.0.1:9001").unwrap()).await);
        assert!(!prober.probe(&Url::parse("http://127.0.0.1:9002").unwrap()).await);
    }
}
