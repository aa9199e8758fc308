//! 代理池实现
//!
//! 对外提供 add/get/all/stop，后台任务定期巡检存活列表和候选列表

use crate::error::{PoolError, Result};
use crate::health::{HttpProber, Prober, SweepReport, DEFAULT_PROBE_TIMEOUT};
use crate::pool::sweeper::{self, Stores, SweepPlan};
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, RwLock, Semaphore};
use tracing::{debug, info};
use url::Url;

/// 默认巡检间隔
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// 默认最大连续失败次数
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// 默认单次巡检的最大并发探测数
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 32;

/// 诊断日志回调
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// 巡检结果回调
pub type SweepCallback = Arc<dyn Fn(&SweepReport) + Send + Sync>;

/// 代理池构造选项
#[derive(Clone)]
pub struct PoolOptions {
    /// 存活探测器，为空时使用 [`HttpProber`]
    pub prober: Option<Arc<dyn Prober>>,
    /// 候选代理连续失败超过该次数后淘汰
    pub max_consecutive_failures: u32,
    /// 巡检间隔
    pub sweep_interval: Duration,
    /// 默认探测器的超时时间
    pub probe_timeout: Duration,
    /// 单次巡检的最大并发探测数
    pub max_concurrent_probes: usize,
    /// 是否输出详细诊断日志
    pub verbose: bool,
    /// 诊断日志回调，只在 `verbose` 时调用，此时诊断不再作为 debug 事件输出
    pub log_sink: Option<LogSink>,
    /// 巡检结果回调
    pub on_sweep: Option<SweepCallback>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            prober: None,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
            verbose: false,
            log_sink: None,
            on_sweep: None,
        }
    }
}

impl fmt::Debug for PoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("custom_prober", &self.prober.is_some())
            .field("max_consecutive_failures", &self.max_consecutive_failures)
            .field("sweep_interval", &self.sweep_interval)
            .field("probe_timeout", &self.probe_timeout)
            .field("max_concurrent_probes", &self.max_concurrent_probes)
            .field("verbose", &self.verbose)
            .field("log_sink", &self.log_sink.is_some())
            .field("on_sweep", &self.on_sweep.is_some())
            .finish()
    }
}

impl PoolOptions {
    /// 设置存活探测器
    pub fn with_prober<P: Prober + 'static>(mut self, prober: P) -> Self {
        self.prober = Some(Arc::new(prober));
        self
    }

    /// 设置最大连续失败次数
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    /// 设置巡检间隔
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// 设置默认探测器的超时时间
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// 设置最大并发探测数
    pub fn with_max_concurrent_probes(mut self, max: usize) -> Self {
        self.max_concurrent_probes = max;
        self
    }

    /// 开启或关闭详细诊断日志
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// 设置诊断日志回调
    pub fn with_log_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    /// 设置巡检结果回调
    pub fn with_on_sweep<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SweepReport) + Send + Sync + 'static,
    {
        self.on_sweep = Some(Arc::new(callback));
        self
    }
}

/// 代理池状态
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    /// 存活代理数
    pub alive: usize,
    /// 候选代理数
    pub candidates: usize,
    /// 巡检任务是否运行中
    pub is_running: bool,
    /// 巡检间隔（毫秒）
    pub sweep_interval_ms: u64,
    /// 已完成的巡检次数
    pub sweeps_completed: u64,
    /// 最近一次巡检报告
    pub last_sweep: Option<SweepReport>,
}

/// 解析代理地址
///
/// 必须是带主机的绝对URL，例如 `http://127.0.0.1:9001`
pub fn parse_endpoint(raw: &str) -> std::result::Result<Url, PoolError> {
    let url = Url::parse(raw.trim()).map_err(|e| PoolError::InvalidAddress {
        address: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none_or(str::is_empty) {
        return Err(PoolError::InvalidAddress {
            address: raw.to_string(),
            reason: "缺少主机地址".to_string(),
        });
    }

    Ok(url)
}

/// 诊断日志输出
///
/// verbose 且设置了回调时只交给回调，否则作为 debug 事件输出
struct Diagnostics {
    verbose: bool,
    sink: Option<LogSink>,
}

impl Diagnostics {
    fn log<F: FnOnce() -> String>(&self, message: F) {
        match self.sink {
            Some(ref sink) if self.verbose => sink(&message()),
            _ => {
                if tracing::enabled!(tracing::Level::DEBUG) {
                    debug!("{}", message());
                }
            }
        }
    }
}

/// 代理池共享状态，由调用方和后台巡检任务共同持有
pub(crate) struct PoolInner {
    stores: RwLock<Stores>,
    prober: Arc<dyn Prober>,
    max_consecutive_failures: u32,
    probe_permits: Semaphore,
    diagnostics: Diagnostics,
    on_sweep: Option<SweepCallback>,
    /// 保证巡检之间串行
    sweep_guard: Mutex<()>,
    sweeps_completed: AtomicU64,
    last_report: RwLock<Option<SweepReport>>,
}

impl PoolInner {
    /// 探测单个代理并记录耗时
    async fn probe_endpoint(&self, endpoint: &Url) -> bool {
        self.diagnostics
            .log(|| format!("开始检查 {endpoint} 是否存活"));
        let start = Instant::now();
        let alive = self.prober.probe(endpoint).await;
        self.diagnostics.log(|| {
            format!(
                "检查结束 {endpoint} 耗时 {} 毫秒, {}",
                start.elapsed().as_millis(),
                if alive { "存活" } else { "不可用" }
            )
        });
        alive
    }

    /// 并发探测一组代理，结果顺序与输入一致
    async fn probe_all(&self, endpoints: &[Url]) -> Vec<bool> {
        let probes = endpoints.iter().map(|endpoint| async move {
            // 信号量不会被关闭，获取失败时直接探测
            let _permit = self.probe_permits.acquire().await.ok();
            self.probe_endpoint(endpoint).await
        });
        futures::future::join_all(probes).await
    }

    /// 执行一次完整巡检
    pub(crate) async fn sweep(&self) -> SweepReport {
        let _guard = self.sweep_guard.lock().await;
        let started_at = Utc::now();
        let start = Instant::now();
        self.diagnostics.log(|| "开始检查代理存活情况".to_string());

        let (alive, candidates) = {
            let stores = self.stores.read().await;
            (stores.alive.snapshot(), stores.candidates.endpoints())
        };

        let (alive_results, candidate_results) =
            tokio::join!(self.probe_all(&alive), self.probe_all(&candidates));

        let plan = SweepPlan::classify(&alive_results, &candidate_results);
        let mut report = SweepReport::new(started_at).with_probed(alive.len(), candidates.len());

        if !plan.is_empty() {
            let mut stores = self.stores.write().await;
            plan.apply(&mut stores, self.max_consecutive_failures, &mut report);
        }

        let report = report.with_duration(start.elapsed());
        self.log_report(&report);

        self.sweeps_completed.fetch_add(1, Ordering::Relaxed);
        *self.last_report.write().await = Some(report.clone());

        if let Some(ref callback) = self.on_sweep {
            callback(&report);
        }

        self.diagnostics.log(|| "存活检查结束".to_string());
        report
    }

    fn log_report(&self, report: &SweepReport) {
        for endpoint in &report.demoted {
            self.diagnostics.log(|| format!("{endpoint} 已降级为候选"));
        }
        for endpoint in &report.promoted {
            self.diagnostics.log(|| format!("{endpoint} 已恢复为存活"));
        }
        for endpoint in &report.evicted {
            self.diagnostics.log(|| format!("{endpoint} 已从候选移除"));
        }

        if report.has_changes() {
            info!(
                demoted = report.demoted.len(),
                promoted = report.promoted.len(),
                evicted = report.evicted.len(),
                still_failing = report.still_failing,
                duration_ms = report.duration_ms(),
                "代理池巡检完成"
            );
        } else {
            debug!(
                probed_alive = report.probed_alive,
                probed_candidates = report.probed_candidates,
                duration_ms = report.duration_ms(),
                "代理池巡检完成，无变化"
            );
        }
    }
}

/// 自愈代理池
///
/// 构造后立即启动后台巡检任务，多个任务共享时用 `Arc<ProxyPool>`。
/// 被 drop 时自动停止巡检。
pub struct ProxyPool {
    inner: Arc<PoolInner>,
    stop_tx: watch::Sender<bool>,
    sweep_interval: Duration,
}

impl ProxyPool {
    /// 创建代理池并启动巡检任务，必须在 tokio 运行时内调用
    ///
    /// # 参数
    /// * `options` - 构造选项
    ///
    /// # 返回
    /// * `Result<Self>` - 默认探测器构建失败时返回错误
    pub fn new(options: PoolOptions) -> Result<Self> {
        let max_consecutive_failures = if options.max_consecutive_failures < 1 {
            DEFAULT_MAX_CONSECUTIVE_FAILURES
        } else {
            options.max_consecutive_failures
        };
        let sweep_interval = if options.sweep_interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            options.sweep_interval
        };

        let prober: Arc<dyn Prober> = match options.prober {
            Some(prober) => prober,
            None => Arc::new(HttpProber::new(options.probe_timeout)?),
        };

        let inner = Arc::new(PoolInner {
            stores: RwLock::new(Stores::default()),
            prober,
            max_consecutive_failures,
            probe_permits: Semaphore::new(options.max_concurrent_probes.max(1)),
            diagnostics: Diagnostics {
                verbose: options.verbose,
                sink: options.log_sink,
            },
            on_sweep: options.on_sweep,
            sweep_guard: Mutex::new(()),
            sweeps_completed: AtomicU64::new(0),
            last_report: RwLock::new(None),
        });

        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(sweeper::run(Arc::clone(&inner), sweep_interval, stop_rx));

        info!(
            max_consecutive_failures,
            sweep_interval_ms = sweep_interval.as_millis() as u64,
            "代理池已创建"
        );

        Ok(Self {
            inner,
            stop_tx,
            sweep_interval,
        })
    }

    /// 添加一个代理，例如 `http://127.0.0.1:9001`
    ///
    /// 先在锁外探测一次，探测成功才放入存活列表。不做去重。
    pub async fn add(&self, raw_address: &str) -> std::result::Result<Url, PoolError> {
        let endpoint = parse_endpoint(raw_address)?;
        self.add_endpoint(endpoint).await
    }

    /// 添加一个已解析的代理
    pub async fn add_endpoint(&self, endpoint: Url) -> std::result::Result<Url, PoolError> {
        if !self.inner.probe_endpoint(&endpoint).await {
            debug!(endpoint = %endpoint, "添加代理失败: 探测不可用");
            return Err(PoolError::EndpointUnreachable {
                endpoint: endpoint.to_string(),
            });
        }

        let mut stores = self.inner.stores.write().await;
        stores.alive.push(endpoint.clone());
        debug!(endpoint = %endpoint, alive = stores.alive.len(), "已添加代理");

        Ok(endpoint)
    }

    /// 随机取一个存活代理
    pub async fn get(&self) -> std::result::Result<Url, PoolError> {
        let stores = self.inner.stores.read().await;
        let count = stores.alive.len();
        if count == 0 {
            return Err(PoolError::NoneAvailable);
        }

        let index = rand::thread_rng().gen_range(0..count);
        stores
            .alive
            .get(index)
            .cloned()
            .ok_or(PoolError::NoneAvailable)
    }

    /// 所有存活代理的快照
    pub async fn all(&self) -> Vec<Url> {
        self.inner.stores.read().await.alive.snapshot()
    }

    /// 停止后台巡检，可重复调用
    ///
    /// 不清空列表，get/all 继续可用。正在探测中的巡检不会被打断，
    /// 其结果仍会被应用。
    pub fn stop(&self) {
        let was_stopped = self.stop_tx.send_replace(true);
        if !was_stopped {
            info!("代理池巡检已停止");
        }
    }

    /// 巡检任务是否仍在运行
    pub fn is_running(&self) -> bool {
        !*self.stop_tx.borrow()
    }

    /// 立即执行一次巡检，与定时巡检串行
    pub async fn sweep_now(&self) -> SweepReport {
        self.inner.sweep().await
    }

    /// 存活代理数
    pub async fn alive_count(&self) -> usize {
        self.inner.stores.read().await.alive.len()
    }

    /// 候选代理数
    pub async fn candidate_count(&self) -> usize {
        self.inner.stores.read().await.candidates.len()
    }

    /// 候选代理及其连续失败次数
    pub async fn candidates(&self) -> Vec<(Url, u32)> {
        let stores = self.inner.stores.read().await;
        stores
            .candidates
            .iter()
            .map(|c| (c.endpoint.clone(), c.consecutive_failures))
            .collect()
    }

    /// 获取代理池状态
    pub async fn status(&self) -> PoolStatus {
        let (alive, candidates) = {
            let stores = self.inner.stores.read().await;
            (stores.alive.len(), stores.candidates.len())
        };

        PoolStatus {
            alive,
            candidates,
            is_running: self.is_running(),
            sweep_interval_ms: self.sweep_interval.as_millis() as u64,
            sweeps_completed: self.inner.sweeps_completed.load(Ordering::Relaxed),
            last_sweep: self.inner.last_report.read().await.clone(),
        }
    }
}

impl fmt::Debug for ProxyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyPool")
            .field("sweep_interval", &self.sweep_interval)
            .field("max_consecutive_failures", &self.inner.max_consecutive_failures)
            .field("is_running", &self.is_running())
            .finish()
    }
}

impl Drop for ProxyPool {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}
