use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::Notify;

use crate::http::HttpClient;

use super::gate::IterationGate;
use super::stats::ScenarioStats;

#[derive(Debug)]
pub(crate) struct StartSignal {
    started: AtomicBool,
    notify: Notify,
}

impl StartSignal {
    pub(crate) fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub(crate) fn start(&self) {
        self.started.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.started.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

/// Everything one iteration of a scenario needs.
#[derive(Debug, Clone)]
pub struct IterationContext {
    /// Global VU id (1-based, unique across scenarios).
    pub vu_id: u64,
    /// Index of the scenario in the run's scenario list.
    pub scenario_index: usize,
    /// 0-based iteration number of this VU.
    pub iteration: u64,
    pub client: Arc<HttpClient>,
    pub stats: Arc<ScenarioStats>,
}

#[derive(Debug, Clone)]
pub(crate) struct VuContext {
    pub(crate) vu_id: u64,
    pub(crate) scenario_index: usize,
    pub(crate) client: Arc<HttpClient>,
    pub(crate) stats: Arc<ScenarioStats>,
    pub(crate) gate: Arc<IterationGate>,
    pub(crate) start_signal: Arc<StartSignal>,
}

/// One virtual user: run iterations back to back until the gate closes.
///
/// In duration mode an iteration still running `graceful_stop` after the deadline is dropped
/// and counted as interrupted.
pub(crate) async fn run_vu<F, Fut>(ctx: VuContext, iteration: F)
where
    F: Fn(IterationContext) -> Fut,
    Fut: Future<Output = ()>,
{
    ctx.start_signal.wait().await;

    let graceful_stop = ctx.stats.config().graceful_stop;
    let hard_deadline = ctx
        .gate
        .deadline()
        .map(|d| tokio::time::Instant::from_std(d + graceful_stop));

    tracing::debug!(vu = ctx.vu_id, scenario = ctx.stats.name(), "vu started");

    let mut completed: u64 = 0;
    while ctx.gate.next(completed) {
        let fut = iteration(IterationContext {
            vu_id: ctx.vu_id,
            scenario_index: ctx.scenario_index,
            iteration: completed,
            client: ctx.client.clone(),
            stats: ctx.stats.clone(),
        });

        let started = Instant::now();
        let finished = match hard_deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut).await.is_ok(),
            None => {
                fut.await;
                true
            }
        };

        if !finished {
            ctx.stats.record_interrupted_iteration();
            tracing::warn!(
                vu = ctx.vu_id,
                scenario = ctx.stats.name(),
                running_for = ?started.elapsed(),
                "iteration interrupted after graceful stop"
            );
            break;
        }

        ctx.stats.record_iteration();
        completed = completed.saturating_add(1);
    }

    tracing::debug!(
        vu = ctx.vu_id,
        scenario = ctx.stats.name(),
        iterations = completed,
        "vu finished"
    );
}
