use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use playload_core::PlayScenario;
use playload_core::report::ResultRecord;
use playload_core::runner::{ProgressFn, ProgressUpdate, RunSummary, ScenarioConfig};

mod format;
mod progress;
mod summary;

use format::{format_duration, format_rate, format_tags_inline};
use progress::HumanProgress;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, scenarios: &[ScenarioConfig], plays: &[PlayScenario]) {
        for (s, play) in scenarios.iter().zip(plays) {
            let shape = match (s.iterations, s.duration) {
                (Some(i), Some(d)) => format!("iterations={i} duration={}", format_duration(d)),
                (Some(i), None) => format!("iterations={i}"),
                (None, Some(d)) => format!("duration={}", format_duration(d)),
                (None, None) => String::new(),
            };
            println!(
                "scenario: {}{} vus={} {shape} graceful_stop={}",
                s.name,
                format_tags_inline(&s.tags),
                s.vus,
                format_duration(s.graceful_stop)
            );
            println!(
                "  target: {} {} checks={} sleep={}",
                play.request.method,
                play.request.url,
                play.checks.len(),
                format_duration(play.sleep)
            );
        }
        if !scenarios.is_empty() {
            println!();
        }
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();
        Some(Arc::new(move |u: ProgressUpdate| {
            let message = progress_message(&u);
            progress.update(&u.scenario, u.duration, u.elapsed, message);
        }))
    }

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", summary::render(summary));
        Ok(())
    }

    fn print_record(&self, record: &ResultRecord, path: &Path) {
        println!();
        println!(
            "result: id={} category={} saved to {}",
            record.id,
            record.category,
            path.display()
        );
    }

    fn print_history(&self, history: &BTreeMap<String, Vec<ResultRecord>>) -> anyhow::Result<()> {
        print!("{}", summary::render_history(history));
        Ok(())
    }
}

fn progress_message(u: &ProgressUpdate) -> String {
    let m = &u.metrics;
    let mut msg = format!(
        "vus={} elapsed={} reqs={} rps={} failed={} checks_failed={}/{}",
        u.vus,
        format_duration(u.elapsed),
        m.requests_total,
        format_rate(m.rps_now),
        m.failed_requests_total,
        m.checks_failed_total,
        m.checks_total
    );
    if let Some(p95) = m.latency_p95_ms_now {
        msg.push_str(&format!(" p95={p95:.1}ms"));
    }
    msg
}
