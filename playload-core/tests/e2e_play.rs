use std::sync::Arc;
use std::time::Duration;

use anyhow::ensure;
use playload_core::runner::{RunSummary, ScenarioConfig, run_scenarios};
use playload_core::{Check, CheckKind, HttpClient, PlayScenario, RequestTemplate};
use playload_testserver::{PATH_FAIL, PATH_HANG, PATH_SLOW, PLAY_BODY, TestServer};

fn config(vus: u64, iterations: Option<u64>, duration: Option<Duration>) -> ScenarioConfig {
    ScenarioConfig {
        name: "play".to_string(),
        tags: Vec::new(),
        vus,
        iterations,
        duration,
        graceful_stop: Duration::from_millis(200),
    }
}

async fn run_play(scenario: PlayScenario, config: ScenarioConfig) -> anyhow::Result<RunSummary> {
    let scenario = Arc::new(scenario);
    let summary = run_scenarios(
        vec![config],
        Arc::new(HttpClient::default()),
        move |ctx| {
            let scenario = scenario.clone();
            async move { scenario.iterate(ctx).await }
        },
        None,
    )
    .await?;
    Ok(summary)
}

#[tokio::test]
async fn healthy_target_passes_every_status_check() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let mut scenario = PlayScenario::new(server.base_url())?;
    scenario.sleep = Duration::ZERO;

    let summary = run_play(scenario, config(3, Some(12), None)).await?;
    let seen = server.stats().play_requests_total();
    server.shutdown().await;

    let s = &summary.scenarios[0];
    ensure!(seen == 12, "server saw {seen} play requests");
    ensure!(s.requests_total == 12);
    ensure!(s.failed_requests_total == 0);
    ensure!(s.checks_total == 12 && s.checks_failed_total == 0);
    ensure!(s.checks.len() == 1 && s.checks[0].name == "status is 200");
    ensure!(s.latency.as_ref().is_some_and(|l| l.count == 12));
    ensure!(s.bytes_sent_total > 0 && s.bytes_received_total > 0);
    Ok(())
}

#[tokio::test]
async fn every_request_is_a_post() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let mut scenario = PlayScenario::new(server.base_url())?;
    scenario.sleep = Duration::ZERO;

    run_play(scenario, config(2, Some(4), None)).await?;
    let total = server.stats().requests_total();
    let posts = server.stats().post_requests_total();
    server.shutdown().await;

    ensure!(total == 4 && posts == 4, "total={total} posts={posts}");
    Ok(())
}

#[tokio::test]
async fn sleep_paces_each_vu() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let mut scenario = PlayScenario::new(server.base_url())?;
    scenario.sleep = Duration::from_millis(200);

    let summary = run_play(scenario, config(2, None, Some(Duration::from_millis(500)))).await?;
    server.shutdown().await;

    // Each VU fits at most three request + 200ms sleep iterations into 500ms.
    let s = &summary.scenarios[0];
    ensure!(s.requests_total >= 2, "at least one request per VU");
    ensure!(s.requests_total <= 6, "requests_total={}", s.requests_total);
    ensure!(s.interrupted_iterations_total == 0);
    Ok(())
}

#[tokio::test]
async fn server_errors_fail_checks_without_stopping_the_run() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let mut scenario = PlayScenario::new(server.base_url())?;
    scenario.request = RequestTemplate::post(server.base_url(), PATH_FAIL)?;
    scenario.sleep = Duration::ZERO;

    let summary = run_play(scenario, config(2, Some(6), None)).await?;
    server.shutdown().await;

    let s = &summary.scenarios[0];
    ensure!(s.iterations_total == 6);
    ensure!(s.failed_requests_total == 6);
    ensure!(s.checks_failed_total == 6);
    ensure!(s.errors.get("http_status:500") == Some(&6), "errors={:?}", s.errors);
    ensure!(summary.checks_failed_total() == 6);
    Ok(())
}

#[tokio::test]
async fn failing_checks_run_for_the_full_duration() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let mut scenario = PlayScenario::new(server.base_url())?;
    scenario.request = RequestTemplate::post(server.base_url(), PATH_FAIL)?;
    scenario.sleep = Duration::from_millis(100);

    let duration = Duration::from_millis(600);
    let summary = run_play(scenario, config(2, None, Some(duration))).await?;
    server.shutdown().await;

    let s = &summary.scenarios[0];
    ensure!(
        summary.run_duration >= duration,
        "run ended early after {:?}",
        summary.run_duration
    );
    ensure!(s.iterations_total > s.vus, "iterations={}", s.iterations_total);
    ensure!(s.checks_failed_total == s.checks_total && s.checks_total == s.iterations_total);
    ensure!(s.interrupted_iterations_total == 0);
    Ok(())
}

#[tokio::test]
async fn unreachable_target_records_transport_errors() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let base_url = server.base_url().to_string();
    server.shutdown().await;

    let mut scenario = PlayScenario::new(&base_url)?;
    scenario.sleep = Duration::ZERO;

    let summary = run_play(scenario, config(1, Some(2), None)).await?;

    let s = &summary.scenarios[0];
    ensure!(s.requests_total == 2);
    ensure!(s.failed_requests_total == 2);
    ensure!(s.checks_failed_total == 2);
    ensure!(s.latency.is_none());
    ensure!(
        s.errors.keys().all(|k| k.starts_with("http_error:")),
        "errors={:?}",
        s.errors
    );
    Ok(())
}

#[tokio::test]
async fn body_check_reads_response_text() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let mut scenario = PlayScenario::new(server.base_url())?;
    scenario.request = RequestTemplate::post(server.base_url(), PATH_SLOW)?;
    scenario.sleep = Duration::ZERO;
    scenario.checks.push(Check::new(
        "body says played",
        CheckKind::BodyContains(PLAY_BODY.to_string()),
    ));
    scenario.checks.push(Check::new(
        "body says nope",
        CheckKind::BodyContains("nope".to_string()),
    ));

    let summary = run_play(scenario, config(1, Some(2), None)).await?;
    server.shutdown().await;

    let s = &summary.scenarios[0];
    ensure!(s.checks_total == 6);
    ensure!(s.checks_failed_total == 2);
    let nope = s.checks.iter().find(|c| c.name == "body says nope");
    ensure!(nope.is_some_and(|c| c.failed == 2));
    // Slow endpoint adds at least 50ms per request.
    ensure!(s.latency.as_ref().is_some_and(|l| l.min >= 50_000.0));
    Ok(())
}

#[tokio::test]
async fn hanging_requests_are_interrupted_after_graceful_stop() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let mut scenario = PlayScenario::new(server.base_url())?;
    scenario.request = RequestTemplate::post(server.base_url(), PATH_HANG)?;

    let summary = run_play(scenario, config(2, None, Some(Duration::from_millis(100)))).await?;
    // The hanging handlers are still open; dropping aborts the server task.
    drop(server);

    let s = &summary.scenarios[0];
    ensure!(s.interrupted_iterations_total == 2);
    ensure!(s.iterations_total == 0);
    ensure!(summary.run_duration < Duration::from_secs(5));
    Ok(())
}
