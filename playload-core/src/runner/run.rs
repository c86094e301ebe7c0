use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use crate::http::HttpClient;

use super::config::ScenarioConfig;
use super::error::{Error, Result};
use super::gate::IterationGate;
use super::progress::{LiveMetrics, ProgressFn, ProgressUpdate};
use super::stats::{RunStats, RunSummary, ScenarioStats};
use super::vu::{IterationContext, StartSignal, VuContext, run_vu};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Run all scenarios concurrently and return the aggregated summary.
///
/// `iteration` is invoked once per VU iteration; `IterationContext::scenario_index` tells the
/// caller which scenario the VU belongs to.
pub async fn run_scenarios<F, Fut>(
    scenarios: Vec<ScenarioConfig>,
    client: Arc<HttpClient>,
    iteration: F,
    progress: Option<ProgressFn>,
) -> Result<RunSummary>
where
    F: Fn(IterationContext) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if scenarios.is_empty() {
        return Err(Error::NoScenarios);
    }

    let stats = Arc::new(RunStats::new(&scenarios));
    let start_signal = Arc::new(StartSignal::new());

    let mut gates: Vec<Arc<IterationGate>> = Vec::with_capacity(scenarios.len());
    let mut handles = Vec::new();
    let mut next_vu_id: u64 = 1;

    for (scenario_index, scenario) in scenarios.iter().enumerate() {
        let gate = Arc::new(IterationGate::new(scenario.iterations, scenario.duration));
        gates.push(gate.clone());

        let scenario_stats = stats.scenarios()[scenario_index].clone();

        tracing::info!(
            scenario = %scenario.name,
            vus = scenario.vus,
            iterations = ?scenario.iterations,
            duration = ?scenario.duration,
            "starting scenario"
        );

        for _ in 0..scenario.vus {
            let ctx = VuContext {
                vu_id: next_vu_id,
                scenario_index,
                client: client.clone(),
                stats: scenario_stats.clone(),
                gate: gate.clone(),
                start_signal: start_signal.clone(),
            };
            next_vu_id = next_vu_id.saturating_add(1);

            let iteration = iteration.clone();
            handles.push(tokio::spawn(run_vu(ctx, iteration)));
        }
    }

    let started = Instant::now();
    for gate in &gates {
        gate.start_at(started);
    }
    start_signal.start();

    let progress_handle = progress.map(|progress| {
        let stats = stats.clone();
        tokio::spawn(report_progress(stats, started, progress))
    });

    let mut join_err = None;
    for h in handles {
        if let Err(err) = h.await {
            join_err.get_or_insert(err);
        }
    }

    if let Some(h) = progress_handle {
        h.abort();
        let _ = h.await;
    }

    if let Some(err) = join_err {
        return Err(Error::Join(err));
    }

    let elapsed = started.elapsed();
    tracing::info!(elapsed = ?elapsed, "run finished");
    Ok(stats.summarize(elapsed))
}

#[derive(Debug, Default, Clone, Copy)]
struct LastTotals {
    requests_total: u64,
    iterations_total: u64,
}

async fn report_progress(stats: Arc<RunStats>, started: Instant, progress: ProgressFn) {
    let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    let mut last: Vec<LastTotals> = vec![LastTotals::default(); stats.scenarios().len()];
    let mut last_at = started;
    let mut tick: u64 = 0;

    loop {
        interval.tick().await;

        tick = tick.saturating_add(1);
        let now = Instant::now();
        let dt = now.duration_since(last_at);
        last_at = now;

        for (s, last) in stats.scenarios().iter().zip(last.iter_mut()) {
            let update = progress_update(s, last, tick, started.elapsed(), dt);
            (progress)(update);
        }
    }
}

fn progress_update(
    s: &ScenarioStats,
    last: &mut LastTotals,
    tick: u64,
    elapsed: Duration,
    dt: Duration,
) -> ProgressUpdate {
    let secs = dt.as_secs_f64().max(1e-9);

    let requests_total = s.requests_total();
    let rps_now = requests_total.saturating_sub(last.requests_total) as f64 / secs;
    last.requests_total = requests_total;
    s.record_rps_sample(rps_now);

    let iterations_total = s.iterations_total();
    let iterations_per_sec_now =
        iterations_total.saturating_sub(last.iterations_total) as f64 / secs;
    last.iterations_total = iterations_total;

    let (latency_p50_ms_now, latency_p95_ms_now) = s.take_latency_window_ms();

    let config = s.config();
    ProgressUpdate {
        tick,
        elapsed,
        interval: dt,
        scenario: config.name.clone(),
        vus: config.vus,
        duration: config.duration,
        metrics: LiveMetrics {
            rps_now,
            iterations_per_sec_now,
            requests_total,
            failed_requests_total: s.failed_requests_total(),
            iterations_total,
            checks_total: s.checks_total(),
            checks_failed_total: s.checks_failed_total(),
            bytes_received_total: s.bytes_received_total(),
            bytes_sent_total: s.bytes_sent_total(),
            latency_p50_ms_now,
            latency_p95_ms_now,
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    fn scenario(vus: u64, iterations: Option<u64>, duration: Option<Duration>) -> ScenarioConfig {
        ScenarioConfig {
            name: "play".to_string(),
            tags: Vec::new(),
            vus,
            iterations,
            duration,
            graceful_stop: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn shared_iterations_run_exactly_once_each() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();

        let summary = run_scenarios(
            vec![scenario(4, Some(10), None)],
            Arc::new(HttpClient::default()),
            move |_ctx| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 10);
        assert_eq!(summary.scenarios[0].iterations_total, 10);
        assert_eq!(summary.scenarios[0].interrupted_iterations_total, 0);
    }

    #[tokio::test]
    async fn every_vu_runs_at_least_once_in_duration_mode() {
        let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let summary = run_scenarios(
            vec![scenario(5, None, Some(Duration::from_millis(1)))],
            Arc::new(HttpClient::default()),
            move |ctx| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(ctx.vu_id);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            },
            None,
        )
        .await
        .unwrap();

        let mut vus = seen.lock().unwrap().clone();
        vus.sort_unstable();
        vus.dedup();
        assert_eq!(vus, vec![1, 2, 3, 4, 5]);
        assert!(summary.scenarios[0].iterations_total >= 5);
    }

    #[tokio::test]
    async fn iterations_past_graceful_stop_are_interrupted() {
        let summary = run_scenarios(
            vec![scenario(2, None, Some(Duration::from_millis(20)))],
            Arc::new(HttpClient::default()),
            |_ctx| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
            },
            None,
        )
        .await
        .unwrap();

        let s = &summary.scenarios[0];
        assert_eq!(s.iterations_total, 0);
        assert_eq!(s.interrupted_iterations_total, 2);
        assert!(summary.run_duration < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn failing_iterations_do_not_end_the_run_early() {
        let started = Instant::now();
        let summary = run_scenarios(
            vec![scenario(2, None, Some(Duration::from_millis(300)))],
            Arc::new(HttpClient::default()),
            |ctx| async move {
                ctx.stats.record_check("status is 200", false);
                tokio::time::sleep(Duration::from_millis(20)).await;
            },
            None,
        )
        .await
        .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(300));
        let s = &summary.scenarios[0];
        assert!(s.checks_failed_total >= 2);
        assert_eq!(s.checks_failed_total, s.checks_total);
    }

    #[tokio::test]
    async fn progress_reports_each_scenario() {
        let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        let progress: ProgressFn = Arc::new(move |u| sink.lock().unwrap().push(u));

        let mut second = scenario(1, None, Some(Duration::from_millis(1300)));
        second.name = "second".to_string();

        run_scenarios(
            vec![scenario(1, None, Some(Duration::from_millis(1300))), second],
            Arc::new(HttpClient::default()),
            |_ctx| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
            },
            Some(progress),
        )
        .await
        .unwrap();

        let updates = updates.lock().unwrap();
        assert!(updates.iter().any(|u| u.scenario == "play" && u.tick == 1));
        assert!(updates.iter().any(|u| u.scenario == "second" && u.tick == 1));
    }

    #[tokio::test]
    async fn empty_scenario_list_is_an_error() {
        let res = run_scenarios(
            Vec::new(),
            Arc::new(HttpClient::default()),
            |_ctx| async {},
            None,
        )
        .await;
        assert!(matches!(res, Err(Error::NoScenarios)));
    }
}
