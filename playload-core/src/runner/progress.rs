use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct LiveMetrics {
    /// Requests/sec observed during the last progress interval.
    pub rps_now: f64,
    pub iterations_per_sec_now: f64,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    pub checks_total: u64,
    pub checks_failed_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,

    /// Latency percentiles over the last progress interval (milliseconds).
    pub latency_p50_ms_now: Option<f64>,
    pub latency_p95_ms_now: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based).
    pub tick: u64,
    pub elapsed: Duration,
    pub interval: Duration,
    pub scenario: String,
    pub vus: u64,
    pub duration: Option<Duration>,
    pub metrics: LiveMetrics,
}

pub type ProgressFn = std::sync::Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;
