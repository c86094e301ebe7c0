use hdrhistogram::Histogram;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::http::{HttpResponse, HttpTransportErrorKind};

use super::config::ScenarioConfig;

#[derive(Debug, Default)]
struct CheckCounters {
    total: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub total: u64,
    pub failed: u64,
}

impl CheckSummary {
    pub fn passed(&self) -> u64 {
        self.total.saturating_sub(self.failed)
    }
}

/// What happened to one request, as seen by the stats.
#[derive(Debug, Clone, Copy)]
pub struct RequestOutcome {
    pub status: Option<u16>,
    /// If set, the request failed before a response was received.
    pub transport_error_kind: Option<HttpTransportErrorKind>,
    pub elapsed: Duration,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

impl RequestOutcome {
    pub fn from_response(res: &HttpResponse, elapsed: Duration) -> Self {
        Self {
            status: Some(res.status),
            transport_error_kind: None,
            elapsed,
            bytes_received: res.bytes_received,
            bytes_sent: res.bytes_sent,
        }
    }

    pub fn from_error(kind: HttpTransportErrorKind, elapsed: Duration, bytes_sent: u64) -> Self {
        Self {
            status: None,
            transport_error_kind: Some(kind),
            elapsed,
            bytes_received: 0,
            bytes_sent,
        }
    }

    /// Transport error or status >= 400.
    pub fn failed(&self) -> bool {
        self.transport_error_kind.is_some() || self.status.is_some_and(|s| s >= 400)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    /// All values in microseconds.
    pub min: f64,
    pub mean: f64,
    pub stdev: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub tags: Vec<(String, String)>,
    pub vus: u64,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    pub interrupted_iterations_total: u64,

    pub checks_total: u64,
    pub checks_failed_total: u64,
    pub checks: Vec<CheckSummary>,

    /// Failure breakdown keyed by `http_status:<code>` or `http_error:<kind>`.
    pub errors: BTreeMap<String, u64>,

    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,

    pub req_per_sec_avg: f64,
    pub req_per_sec_stdev: f64,
    pub req_per_sec_max: f64,

    pub latency: Option<LatencySummary>,
}

impl ScenarioSummary {
    pub fn error_rate(&self) -> f64 {
        if self.requests_total == 0 {
            return 0.0;
        }
        self.failed_requests_total as f64 / self.requests_total as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    pub interrupted_iterations_total: u64,
    pub checks_total: u64,
    pub checks_failed_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,
    /// Request-weighted mean latency across scenarios (microseconds).
    pub latency_mean: Option<f64>,
}

impl Totals {
    pub fn checks_passed_total(&self) -> u64 {
        self.checks_total.saturating_sub(self.checks_failed_total)
    }

    pub fn error_rate(&self) -> f64 {
        if self.requests_total == 0 {
            return 0.0;
        }
        self.failed_requests_total as f64 / self.requests_total as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_duration: Duration,
    pub scenarios: Vec<ScenarioSummary>,
}

impl RunSummary {
    pub fn totals(&self) -> Totals {
        let mut t = Totals::default();
        let mut latency_weighted = 0.0f64;
        let mut latency_count = 0u64;

        for s in &self.scenarios {
            t.requests_total = t.requests_total.saturating_add(s.requests_total);
            t.failed_requests_total = t
                .failed_requests_total
                .saturating_add(s.failed_requests_total);
            t.iterations_total = t.iterations_total.saturating_add(s.iterations_total);
            t.interrupted_iterations_total = t
                .interrupted_iterations_total
                .saturating_add(s.interrupted_iterations_total);
            t.checks_total = t.checks_total.saturating_add(s.checks_total);
            t.checks_failed_total = t.checks_failed_total.saturating_add(s.checks_failed_total);
            t.bytes_received_total = t.bytes_received_total.saturating_add(s.bytes_received_total);
            t.bytes_sent_total = t.bytes_sent_total.saturating_add(s.bytes_sent_total);

            if let Some(l) = &s.latency {
                latency_weighted += l.mean * l.count as f64;
                latency_count = latency_count.saturating_add(l.count);
            }
        }

        if latency_count > 0 {
            t.latency_mean = Some(latency_weighted / latency_count as f64);
        }
        t
    }

    pub fn checks_failed_total(&self) -> u64 {
        self.scenarios.iter().map(|s| s.checks_failed_total).sum()
    }

    pub fn rps(&self) -> f64 {
        let secs = self.run_duration.as_secs_f64().max(1e-9);
        self.totals().requests_total as f64 / secs
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RpsAgg {
    count: u64,
    mean: f64,
    m2: f64,
    max: f64,
}

impl RpsAgg {
    fn record(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }

        self.count = self.count.saturating_add(1);
        let delta = sample - self.mean;
        self.mean += delta / (self.count as f64);
        let delta2 = sample - self.mean;
        self.m2 += delta * delta2;
        self.max = self.max.max(sample);
    }

    fn summary(&self) -> (f64, f64, f64) {
        if self.count == 0 {
            return (0.0, 0.0, 0.0);
        }

        let stdev = if self.count >= 2 {
            (self.m2 / ((self.count - 1) as f64)).sqrt()
        } else {
            0.0
        };
        (self.mean, stdev, self.max)
    }
}

fn new_hist() -> Histogram<u64> {
    // Up to 10 minutes in microseconds, 3 significant figures.
    Histogram::<u64>::new_with_bounds(1, 600_000_000, 3)
        .unwrap_or_else(|err| panic!("failed to init histogram: {err}"))
}

/// Counters for one scenario. Shared by all of its VUs.
#[derive(Debug)]
pub struct ScenarioStats {
    config: ScenarioConfig,

    requests_total: AtomicU64,
    failed_requests_total: AtomicU64,
    iterations_total: AtomicU64,
    interrupted_iterations_total: AtomicU64,
    checks_total: AtomicU64,
    checks_failed: AtomicU64,
    checks_by_name: Mutex<BTreeMap<Arc<str>, Arc<CheckCounters>>>,
    errors: Mutex<BTreeMap<String, u64>>,
    bytes_received_total: AtomicU64,
    bytes_sent_total: AtomicU64,

    latency_us: Mutex<Histogram<u64>>,
    latency_us_window: Mutex<Histogram<u64>>,
    rps_samples: Mutex<RpsAgg>,
}

impl ScenarioStats {
    pub fn new(config: ScenarioConfig) -> Self {
        Self {
            config,
            requests_total: AtomicU64::new(0),
            failed_requests_total: AtomicU64::new(0),
            iterations_total: AtomicU64::new(0),
            interrupted_iterations_total: AtomicU64::new(0),
            checks_total: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
            checks_by_name: Mutex::new(BTreeMap::new()),
            errors: Mutex::new(BTreeMap::new()),
            bytes_received_total: AtomicU64::new(0),
            bytes_sent_total: AtomicU64::new(0),
            latency_us: Mutex::new(new_hist()),
            latency_us_window: Mutex::new(new_hist()),
            rps_samples: Mutex::new(RpsAgg::default()),
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn failed_requests_total(&self) -> u64 {
        self.failed_requests_total.load(Ordering::Relaxed)
    }

    pub fn iterations_total(&self) -> u64 {
        self.iterations_total.load(Ordering::Relaxed)
    }

    pub fn checks_total(&self) -> u64 {
        self.checks_total.load(Ordering::Relaxed)
    }

    pub fn checks_failed_total(&self) -> u64 {
        self.checks_failed.load(Ordering::Relaxed)
    }

    pub fn bytes_received_total(&self) -> u64 {
        self.bytes_received_total.load(Ordering::Relaxed)
    }

    pub fn bytes_sent_total(&self) -> u64 {
        self.bytes_sent_total.load(Ordering::Relaxed)
    }

    pub fn record_request(&self, req: &RequestOutcome) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        if req.failed() {
            self.failed_requests_total.fetch_add(1, Ordering::Relaxed);
            let key = match (req.transport_error_kind, req.status) {
                (Some(kind), _) => format!("http_error:{kind}"),
                (None, Some(status)) => format!("http_status:{status}"),
                (None, None) => "http_error:unknown".to_string(),
            };
            let mut errors = self
                .errors
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *errors.entry(key).or_insert(0) += 1;
        }

        if req.bytes_received != 0 {
            self.bytes_received_total
                .fetch_add(req.bytes_received, Ordering::Relaxed);
        }
        if req.bytes_sent != 0 {
            self.bytes_sent_total
                .fetch_add(req.bytes_sent, Ordering::Relaxed);
        }

        // Transport failures have no meaningful latency.
        if req.transport_error_kind.is_none() {
            self.record_latency(req.elapsed);
        }
    }

    pub fn record_check(&self, name: &str, ok: bool) {
        self.checks_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.checks_failed.fetch_add(1, Ordering::Relaxed);
        }

        let counters = {
            let mut map = self
                .checks_by_name
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match map.get(name) {
                Some(v) => v.clone(),
                None => {
                    let v = Arc::new(CheckCounters::default());
                    map.insert(Arc::from(name), v.clone());
                    v
                }
            }
        };

        counters.total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_iteration(&self) {
        self.iterations_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_interrupted_iteration(&self) {
        self.interrupted_iterations_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rps_sample(&self, rps_now: f64) {
        let mut agg = self
            .rps_samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        agg.record(rps_now);
    }

    fn record_latency(&self, elapsed: Duration) {
        let us = (elapsed.as_micros() as u64).max(1);

        {
            let mut h = self
                .latency_us
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = h.record(us);
        }
        {
            let mut h = self
                .latency_us_window
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = h.record(us);
        }
    }

    /// p50/p95 (ms) since the previous call; resets the window.
    pub fn take_latency_window_ms(&self) -> (Option<f64>, Option<f64>) {
        let mut h = self
            .latency_us_window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        #[allow(clippy::len_zero)]
        let out = if h.len() == 0 {
            (None, None)
        } else {
            let p50 = h.value_at_quantile(0.50) as f64 / 1000.0;
            let p95 = h.value_at_quantile(0.95) as f64 / 1000.0;
            (Some(p50), Some(p95))
        };

        h.reset();
        out
    }

    pub fn summarize(&self) -> ScenarioSummary {
        let checks = {
            let map = self
                .checks_by_name
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            map.iter()
                .map(|(name, c)| CheckSummary {
                    name: name.to_string(),
                    total: c.total.load(Ordering::Relaxed),
                    failed: c.failed.load(Ordering::Relaxed),
                })
                .collect()
        };

        let errors = self
            .errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        let latency = {
            let h = self
                .latency_us
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            #[allow(clippy::len_zero)]
            if h.len() == 0 {
                None
            } else {
                Some(LatencySummary {
                    count: h.len(),
                    min: h.min() as f64,
                    mean: h.mean(),
                    stdev: h.stdev(),
                    p50: h.value_at_quantile(0.50) as f64,
                    p75: h.value_at_quantile(0.75) as f64,
                    p90: h.value_at_quantile(0.90) as f64,
                    p95: h.value_at_quantile(0.95) as f64,
                    p99: h.value_at_quantile(0.99) as f64,
                    max: h.max() as f64,
                })
            }
        };

        let (req_per_sec_avg, req_per_sec_stdev, req_per_sec_max) = self
            .rps_samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .summary();

        ScenarioSummary {
            scenario: self.config.name.clone(),
            tags: self.config.tags.clone(),
            vus: self.config.vus,
            requests_total: self.requests_total(),
            failed_requests_total: self.failed_requests_total(),
            iterations_total: self.iterations_total(),
            interrupted_iterations_total: self.interrupted_iterations_total.load(Ordering::Relaxed),
            checks_total: self.checks_total(),
            checks_failed_total: self.checks_failed_total(),
            checks,
            errors,
            bytes_received_total: self.bytes_received_total(),
            bytes_sent_total: self.bytes_sent_total(),
            req_per_sec_avg,
            req_per_sec_stdev,
            req_per_sec_max,
            latency,
        }
    }
}

/// Stats for a whole run, one entry per scenario in configuration order.
#[derive(Debug, Default)]
pub struct RunStats {
    scenarios: Vec<Arc<ScenarioStats>>,
}

impl RunStats {
    pub fn new(scenarios: &[ScenarioConfig]) -> Self {
        Self {
            scenarios: scenarios
                .iter()
                .cloned()
                .map(|c| Arc::new(ScenarioStats::new(c)))
                .collect(),
        }
    }

    pub fn scenarios(&self) -> &[Arc<ScenarioStats>] {
        &self.scenarios
    }

    pub fn summarize(&self, run_duration: Duration) -> RunSummary {
        RunSummary {
            run_duration,
            scenarios: self.scenarios.iter().map(|s| s.summarize()).collect(),
        }
    }
}
