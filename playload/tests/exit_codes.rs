use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::Context as _;
use playload_testserver::TestServer;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn scenario(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/scenarios")
        .join(name)
}

fn playload() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_playload"));
    for var in [
        "PLAYLOAD_BASE_URL",
        "PLAYLOAD_VUS",
        "PLAYLOAD_DURATION",
        "PLAYLOAD_CATEGORY",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

async fn run_blocking(mut cmd: Command) -> anyhow::Result<Output> {
    tokio::task::spawn_blocking(move || cmd.output())
        .await
        .context("spawn_blocking join")?
        .context("run playload binary")
}

fn ensure_code(out: &Output, expected: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out.status) == expected,
        "expected exit code {expected}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

#[test]
fn invalid_duration_exits_30() -> anyhow::Result<()> {
    let out = playload()
        .args(["run", "--duration", "10x"])
        .output()
        .context("run playload binary")?;
    ensure_code(&out, 30)
}

#[test]
fn zero_vus_exits_30() -> anyhow::Result<()> {
    let out = playload()
        .args(["run", "--vus", "0", "--base-url", "http://127.0.0.1:9"])
        .output()
        .context("run playload binary")?;
    ensure_code(&out, 30)
}

#[test]
fn unsupported_base_url_exits_30() -> anyhow::Result<()> {
    let out = playload()
        .args(["run", "--iterations", "1", "--base-url", "ftp://localhost"])
        .output()
        .context("run playload binary")?;
    ensure_code(&out, 30)
}

#[test]
fn invalid_scenario_file_exits_30() -> anyhow::Result<()> {
    let out = playload()
        .arg("run")
        .arg("--scenario")
        .arg(scenario("invalid_check.yaml"))
        .output()
        .context("run playload binary")?;
    ensure_code(&out, 30)?;
    anyhow::ensure!(String::from_utf8_lossy(&out.stderr).contains("body_contains"));
    Ok(())
}

#[test]
fn missing_scenario_file_exits_30() -> anyhow::Result<()> {
    let out = playload()
        .args(["run", "--scenario", "./does-not-exist.yaml"])
        .output()
        .context("run playload binary")?;
    ensure_code(&out, 30)
}

#[test]
fn help_exits_0() -> anyhow::Result<()> {
    let out = playload()
        .arg("--help")
        .output()
        .context("run playload binary")?;
    ensure_code(&out, 0)
}

#[tokio::test]
async fn passing_checks_exit_0() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let mut cmd = playload();
    cmd.arg("run")
        .arg("--scenario")
        .arg(scenario("fast.yaml"))
        .args(["--iterations", "3", "--vus", "2", "--output", "json"])
        .args(["--base-url", server.base_url()]);
    let out = run_blocking(cmd).await?;

    let seen = server.stats().play_requests_total();
    server.shutdown().await;

    ensure_code(&out, 0)?;
    anyhow::ensure!(seen == 3, "server saw {seen} play requests");
    Ok(())
}

#[tokio::test]
async fn failed_checks_exit_10() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let mut cmd = playload();
    cmd.arg("run")
        .arg("--scenario")
        .arg(scenario("fail.yaml"))
        .args(["--iterations", "2", "--vus", "1", "--output", "json"])
        .args(["--base-url", server.base_url()]);
    let out = run_blocking(cmd).await?;

    server.shutdown().await;
    ensure_code(&out, 10)
}

#[tokio::test]
async fn unreachable_target_is_failed_checks_not_a_crash() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let base_url = server.base_url().to_string();
    server.shutdown().await;

    let mut cmd = playload();
    cmd.arg("run")
        .arg("--scenario")
        .arg(scenario("fast.yaml"))
        .args(["--iterations", "1", "--vus", "1", "--output", "json"])
        .args(["--base-url", &base_url]);
    let out = run_blocking(cmd).await?;

    ensure_code(&out, 10)
}

#[test]
fn history_with_zero_limit_exits_30() -> anyhow::Result<()> {
    let out = playload()
        .args(["history", "--results-file", "r.jsonl", "--limit", "0"])
        .output()
        .context("run playload binary")?;
    ensure_code(&out, 30)
}
