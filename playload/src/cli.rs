use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Shared by `--duration`, `PLAYLOAD_DURATION` and the scenario file.
/// A bare integer is seconds; anything else goes through humantime (`250ms`, `1m30s`).
pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s)
        .map_err(|err| format!("invalid duration '{s}': {err} (expected e.g. 30s, 250ms, 1m30s)"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bars on stderr, text summary on stdout.
    HumanReadable,
    /// Emit JSON progress and summary lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "playload",
    author,
    version,
    about = "Load test for the play endpoint",
    long_about = "playload drives virtual users against POST /backend/api/play.\n\nEach virtual user sends the request, checks `status is 200`, sleeps one second and repeats until the duration elapses. Defaults: 10 VUs for 30s against http://localhost.",
    after_help = "Examples:\n  playload run\n  playload run --base-url http://my-lb:8080 --vus 50 --duration 1m\n  playload run --scenario play.yaml --category docker --results-file results.jsonl\n  playload history --results-file results.jsonl --limit 5"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the load test
    #[command(
        long_about = "Run the play scenario with the configured number of virtual users.\n\nPrecedence: CLI flags > PLAYLOAD_* environment variables > scenario file > built-in defaults."
    )]
    Run(RunArgs),

    /// Show the most recent results per category
    History(HistoryArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Optional YAML scenario file (request, checks, sleep, tags, scenarios)
    #[arg(long, value_name = "FILE")]
    pub scenario: Option<PathBuf>,

    /// Number of virtual users
    #[arg(long, env = "PLAYLOAD_VUS")]
    pub vus: Option<u64>,

    /// Test duration (e.g. 30s, 250ms, 1m)
    #[arg(long, env = "PLAYLOAD_DURATION", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Total iterations shared across VUs (without --duration the run ends after these)
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Target base URL; the request path is appended to it
    #[arg(long, env = "PLAYLOAD_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Deployment category recorded with the result (e.g. docker, kubernetes)
    #[arg(long, env = "PLAYLOAD_CATEGORY")]
    pub category: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Append the run's result record (JSON line) to this file
    #[arg(long, value_name = "PATH")]
    pub results_file: Option<PathBuf>,

    /// Log filter (e.g. info, debug, playload_core=trace); falls back to RUST_LOG
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Results file written by `run --results-file`
    #[arg(long, value_name = "PATH")]
    pub results_file: PathBuf,

    /// Only show this category
    #[arg(long)]
    pub category: Option<String>,

    /// Records per category
    #[arg(long, default_value_t = playload_core::report::DEFAULT_HISTORY_LIMIT)]
    pub limit: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
