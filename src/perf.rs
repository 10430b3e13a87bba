use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Once;
use std::time::{Duration, Instant};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static SLOW_REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static SLOW_REQUEST_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);
static PERF_ENABLED: AtomicBool = AtomicBool::new(true);
static INIT: Once = Once::new();

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// 读取环境变量开关（只在首次调用时读取）
///
/// - `FSC_PERF=0` 关闭请求统计日志
/// - `FSC_SLOW_REQUEST_MS=800` 配置慢请求阈值（毫秒）
fn ensure_init() {
    INIT.call_once(|| {
        let enabled = match std::env::var("FSC_PERF") {
            Ok(v) => is_true(&v),
            Err(_) => true,
        };
        PERF_ENABLED.store(enabled, Ordering::Relaxed);

        let slow_ms = std::env::var("FSC_SLOW_REQUEST_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(if cfg!(debug_assertions) { 1000 } else { 3000 });
        SLOW_REQUEST_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);
    });
}

/// 记录一次后端请求（由 HTTP 传输层在收到响应后调用）
pub fn record_request(method: &str, path: &str, duration: Duration) {
    ensure_init();
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_REQUEST_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        SLOW_REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            target: "slow_request",
            duration_ms = ms,
            method,
            path,
            "slow request"
        );
    }
}

/// 进程启动以来的请求总数
pub fn request_count() -> u64 {
    REQUEST_COUNT.load(Ordering::Relaxed)
}

/// 性能统计 Guard：记录 elapsed_ms + 期间发出的请求数 + 慢请求数
///
/// 计数为进程级,并发操作之间会互相计入
///
/// ```ignore
/// let _perf = formula_stock_checker::perf::PerfGuard::new("plan_submit");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    request_start: u64,
    slow_request_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        ensure_init();
        Self {
            op,
            start: Instant::now(),
            request_start: REQUEST_COUNT.load(Ordering::Relaxed),
            slow_request_start: SLOW_REQUEST_COUNT.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        if !PERF_ENABLED.load(Ordering::Relaxed) {
            return;
        }
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let request_count = REQUEST_COUNT
            .load(Ordering::Relaxed)
            .saturating_sub(self.request_start);
        let slow_request_count = SLOW_REQUEST_COUNT
            .load(Ordering::Relaxed)
            .saturating_sub(self.slow_request_start);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            request_count,
            slow_request_count,
            "done"
        );
    }
}
