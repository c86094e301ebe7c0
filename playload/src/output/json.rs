use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use playload_core::PlayScenario;
use playload_core::report::ResultRecord;
use playload_core::runner::{LatencySummary, ProgressFn, ProgressUpdate, RunSummary, ScenarioConfig};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _scenarios: &[ScenarioConfig], _plays: &[PlayScenario]) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |u: ProgressUpdate| {
            emit_json_line(&build_progress_line(&u));
        }))
    }

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        emit_json_line(&build_summary_line(summary));
        Ok(())
    }

    fn print_record(&self, record: &ResultRecord, path: &Path) {
        emit_json_line(&JsonRecordLine {
            kind: "result",
            path: path.display().to_string(),
            record,
        });
    }

    fn print_history(&self, history: &BTreeMap<String, Vec<ResultRecord>>) -> anyhow::Result<()> {
        for (category, records) in history {
            emit_json_line(&JsonHistoryLine {
                kind: "history",
                category,
                records,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub scenario: String,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub interval_secs: f64,
    pub vus: u64,

    pub requests_per_sec: f64,
    pub iterations_per_sec: f64,

    pub total_requests: u64,
    pub failed_requests_total: u64,
    pub total_iterations: u64,
    pub checks_total: u64,
    pub checks_failed_total: u64,
    pub total_bytes_received: u64,
    pub total_bytes_sent: u64,

    pub latency_p50_ms: Option<f64>,
    pub latency_p95_ms: Option<f64>,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    let m = &u.metrics;
    JsonProgressLine {
        kind: "progress",
        scenario: u.scenario.clone(),
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs_f64(),
        interval_secs: u.interval.as_secs_f64(),
        vus: u.vus,

        requests_per_sec: m.rps_now,
        iterations_per_sec: m.iterations_per_sec_now,

        total_requests: m.requests_total,
        failed_requests_total: m.failed_requests_total,
        total_iterations: m.iterations_total,
        checks_total: m.checks_total,
        checks_failed_total: m.checks_failed_total,
        total_bytes_received: m.bytes_received_total,
        total_bytes_sent: m.bytes_sent_total,

        latency_p50_ms: m.latency_p50_ms_now,
        latency_p95_ms: m.latency_p95_ms_now,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub run_duration_secs: f64,
    pub scenarios: Vec<JsonScenarioSummary>,
    pub totals: JsonTotals,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonScenarioSummary {
    pub scenario: String,
    pub tags: BTreeMap<String, String>,
    pub vus: u64,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub error_rate: f64,
    pub iterations_total: u64,
    pub interrupted_iterations_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,

    pub checks_total: u64,
    pub checks_failed_total: u64,
    pub checks: BTreeMap<String, JsonCheck>,
    pub errors: BTreeMap<String, u64>,

    pub req_per_sec_avg: f64,
    pub req_per_sec_stdev: f64,
    pub req_per_sec_max: f64,

    pub latency: Option<JsonLatencySummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonCheck {
    pub passed: u64,
    pub failed: u64,
}

/// Microseconds.
#[derive(Debug, Serialize)]
pub(crate) struct JsonLatencySummary {
    pub count: u64,
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

impl From<&LatencySummary> for JsonLatencySummary {
    fn from(l: &LatencySummary) -> Self {
        Self {
            count: l.count,
            min: l.min,
            mean: l.mean,
            stdev: l.stdev,
            p50: l.p50,
            p75: l.p75,
            p90: l.p90,
            p95: l.p95,
            p99: l.p99,
            max: l.max,
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub(crate) struct JsonTotals {
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub error_rate: f64,
    pub iterations_total: u64,
    pub interrupted_iterations_total: u64,
    pub checks_total: u64,
    pub checks_passed_total: u64,
    pub checks_failed_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,
    pub latency_mean: Option<f64>,
    pub requests_per_sec: f64,
}

fn build_summary_line(summary: &RunSummary) -> JsonSummaryLine {
    let scenarios = summary
        .scenarios
        .iter()
        .map(|s| JsonScenarioSummary {
            scenario: s.scenario.clone(),
            tags: s.tags.iter().cloned().collect(),
            vus: s.vus,
            requests_total: s.requests_total,
            failed_requests_total: s.failed_requests_total,
            error_rate: s.error_rate(),
            iterations_total: s.iterations_total,
            interrupted_iterations_total: s.interrupted_iterations_total,
            bytes_received_total: s.bytes_received_total,
            bytes_sent_total: s.bytes_sent_total,
            checks_total: s.checks_total,
            checks_failed_total: s.checks_failed_total,
            checks: s
                .checks
                .iter()
                .map(|c| {
                    (
                        c.name.clone(),
                        JsonCheck {
                            passed: c.passed(),
                            failed: c.failed,
                        },
                    )
                })
                .collect(),
            errors: s.errors.clone(),
            req_per_sec_avg: s.req_per_sec_avg,
            req_per_sec_stdev: s.req_per_sec_stdev,
            req_per_sec_max: s.req_per_sec_max,
            latency: s.latency.as_ref().map(JsonLatencySummary::from),
        })
        .collect();

    let t = summary.totals();
    JsonSummaryLine {
        kind: "summary",
        run_duration_secs: summary.run_duration.as_secs_f64(),
        scenarios,
        totals: JsonTotals {
            requests_total: t.requests_total,
            failed_requests_total: t.failed_requests_total,
            error_rate: t.error_rate(),
            iterations_total: t.iterations_total,
            interrupted_iterations_total: t.interrupted_iterations_total,
            checks_total: t.checks_total,
            checks_passed_total: t.checks_passed_total(),
            checks_failed_total: t.checks_failed_total,
            bytes_received_total: t.bytes_received_total,
            bytes_sent_total: t.bytes_sent_total,
            latency_mean: t.latency_mean,
            requests_per_sec: summary.rps(),
        },
    }
}

#[derive(Debug, Serialize)]
struct JsonRecordLine<'a> {
    kind: &'static str,
    path: String,
    #[serde(flatten)]
    record: &'a ResultRecord,
}

#[derive(Debug, Serialize)]
struct JsonHistoryLine<'a> {
    kind: &'static str,
    category: &'a str,
    records: &'a [ResultRecord],
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
