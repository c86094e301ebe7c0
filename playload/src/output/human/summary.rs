use std::collections::BTreeMap;
use std::fmt::Write as _;

use playload_core::report::ResultRecord;
use playload_core::runner::{RunSummary, ScenarioSummary};

use super::format::*;

pub(crate) fn render(summary: &RunSummary) -> String {
    let mut out = String::new();

    if summary.scenarios.is_empty() {
        out.push_str("summary: no scenarios\n");
        return out;
    }

    out.push_str("summary\n");
    for s in &summary.scenarios {
        render_scenario(s, &mut out);
        out.push('\n');
    }

    let t = summary.totals();
    out.push_str("totals\n");
    writeln!(out, "  duration: {}", format_duration(summary.run_duration)).ok();
    writeln!(
        out,
        "  requests: {} (failed {}, {})",
        t.requests_total,
        t.failed_requests_total,
        format_percent(t.error_rate())
    )
    .ok();
    writeln!(
        out,
        "  iterations: {} (interrupted {})",
        t.iterations_total, t.interrupted_iterations_total
    )
    .ok();
    writeln!(
        out,
        "  checks: {} passed, {} failed",
        t.checks_passed_total(),
        t.checks_failed_total
    )
    .ok();
    if let Some(mean) = t.latency_mean {
        writeln!(out, "  latency: mean={}", format_micros(mean)).ok();
    }
    writeln!(
        out,
        "  bytes: recv {} sent {}",
        format_bytes(t.bytes_received_total),
        format_bytes(t.bytes_sent_total)
    )
    .ok();
    writeln!(out, "  rates: rps={}", format_rate(summary.rps())).ok();

    out
}

fn render_scenario(s: &ScenarioSummary, out: &mut String) {
    writeln!(out, "scenario: {}{}", s.scenario, format_tags_inline(&s.tags)).ok();
    writeln!(out, "  vus: {}", s.vus).ok();
    writeln!(
        out,
        "  requests: {} (failed {}, {})",
        s.requests_total,
        s.failed_requests_total,
        format_percent(s.error_rate())
    )
    .ok();
    writeln!(
        out,
        "  iterations: {} (interrupted {})",
        s.iterations_total, s.interrupted_iterations_total
    )
    .ok();

    writeln!(
        out,
        "  checks: {} passed, {} failed",
        s.checks_total.saturating_sub(s.checks_failed_total),
        s.checks_failed_total
    )
    .ok();
    for c in &s.checks {
        let mark = if c.failed == 0 { "ok" } else { "FAIL" };
        writeln!(
            out,
            "    {mark} {}: {} passed, {} failed",
            c.name,
            c.passed(),
            c.failed
        )
        .ok();
    }

    if !s.errors.is_empty() {
        out.push_str("  errors:\n");
        for (key, count) in &s.errors {
            writeln!(out, "    {key}: {count}").ok();
        }
    }

    match &s.latency {
        Some(l) => {
            writeln!(
                out,
                "  latency: p50={} p90={} p95={} p99={} mean={} max={} (n={})",
                format_micros(l.p50),
                format_micros(l.p90),
                format_micros(l.p95),
                format_micros(l.p99),
                format_micros(l.mean),
                format_micros(l.max),
                l.count
            )
            .ok();
        }
        None => out.push_str("  latency: n/a\n"),
    }

    writeln!(
        out,
        "  bytes: recv {} sent {}",
        format_bytes(s.bytes_received_total),
        format_bytes(s.bytes_sent_total)
    )
    .ok();
    writeln!(
        out,
        "  req/s: avg={} stdev={} max={}",
        format_rate(s.req_per_sec_avg),
        format_rate(s.req_per_sec_stdev),
        format_rate(s.req_per_sec_max)
    )
    .ok();
}

pub(crate) fn render_history(history: &BTreeMap<String, Vec<ResultRecord>>) -> String {
    let mut out = String::new();

    if history.is_empty() {
        out.push_str("history: no results\n");
        return out;
    }

    for (category, records) in history {
        writeln!(out, "category: {category}").ok();
        writeln!(
            out,
            "  {:<24}  {:>8}  {:>10}  {:>8}",
            "executed_at", "checks", "avg", "errors"
        )
        .ok();
        for r in records {
            writeln!(
                out,
                "  {:<24}  {:>8}  {:>10}  {:>8}",
                r.executed_at,
                r.request_count,
                format_micros(r.avg_response_time_secs * 1_000_000.0),
                format_percent(r.error_rate)
            )
            .ok();
        }
        out.push('\n');
    }

    out
}
