//! Result records: one line per run, grouped by category for comparison across deployments.

use std::collections::BTreeMap;
use std::io::{BufRead as _, BufReader, Write as _};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::runner::RunSummary;

pub const DEFAULT_CATEGORY: &str = "default";
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to access results file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid result record at {path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("failed to encode result record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: String,
    pub category: String,
    /// Number of checks that passed.
    pub request_count: u64,
    /// Mean request latency in seconds.
    pub avg_response_time_secs: f64,
    /// Failed requests / total requests (0..=1).
    pub error_rate: f64,
    /// RFC 3339, UTC.
    pub executed_at: String,
}

impl ResultRecord {
    pub fn from_summary(summary: &RunSummary, category: &str, executed_at: SystemTime) -> Self {
        let totals = summary.totals();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category: category.to_string(),
            request_count: totals.checks_passed_total(),
            avg_response_time_secs: totals.latency_mean.unwrap_or(0.0) / 1_000_000.0,
            error_rate: totals.error_rate(),
            executed_at: humantime::format_rfc3339_millis(executed_at).to_string(),
        }
    }
}

/// Append one record as a JSON line, creating the file (and parent dirs) if needed.
pub fn append_record(path: &Path, record: &ResultRecord) -> Result<()> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(&line).map_err(io_err)?;
    Ok(())
}

/// Read every record. A missing file is an empty history; blank lines are skipped.
pub fn read_records(path: &Path) -> Result<Vec<ResultRecord>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(Error::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut out = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        out.push(record);
    }
    Ok(out)
}

/// The `limit` most recent records per category, newest first.
pub fn recent_by_category(
    records: Vec<ResultRecord>,
    category: Option<&str>,
    limit: usize,
) -> BTreeMap<String, Vec<ResultRecord>> {
    let mut grouped: BTreeMap<String, Vec<ResultRecord>> = BTreeMap::new();
    for r in records {
        if category.is_some_and(|c| c != r.category) {
            continue;
        }
        grouped.entry(r.category.clone()).or_default().push(r);
    }

    for list in grouped.values_mut() {
        // RFC 3339 UTC timestamps order lexicographically. Stable sort keeps file order on ties.
        list.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
        list.truncate(limit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use super::*;
    use crate::runner::{LatencySummary, ScenarioSummary};

    fn record(category: &str, executed_at: &str) -> ResultRecord {
        ResultRecord {
            id: format!("{category}-{executed_at}"),
            category: category.to_string(),
            request_count: 1,
            avg_response_time_secs: 0.1,
            error_rate: 0.0,
            executed_at: executed_at.to_string(),
        }
    }

    fn summary() -> RunSummary {
        RunSummary {
            run_duration: Duration::from_secs(30),
            scenarios: vec![ScenarioSummary {
                scenario: "play".to_string(),
                tags: Vec::new(),
                vus: 10,
                requests_total: 300,
                failed_requests_total: 30,
                iterations_total: 300,
                interrupted_iterations_total: 0,
                checks_total: 300,
                checks_failed_total: 30,
                checks: Vec::new(),
                errors: BTreeMap::new(),
                bytes_received_total: 0,
                bytes_sent_total: 0,
                req_per_sec_avg: 0.0,
                req_per_sec_stdev: 0.0,
                req_per_sec_max: 0.0,
                latency: Some(LatencySummary {
                    count: 300,
                    min: 0.0,
                    mean: 12_920.0,
                    stdev: 0.0,
                    p50: 0.0,
                    p75: 0.0,
                    p90: 0.0,
                    p95: 0.0,
                    p99: 0.0,
                    max: 0.0,
                }),
            }],
        }
    }

    #[test]
    fn record_from_summary_uses_passed_checks_and_seconds() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let r = ResultRecord::from_summary(&summary(), "docker", at);

        assert_eq!(r.category, "docker");
        assert_eq!(r.request_count, 270);
        assert!((r.avg_response_time_secs - 0.01292).abs() < 1e-9);
        assert!((r.error_rate - 0.1).abs() < 1e-9);
        assert_eq!(r.executed_at, "2023-11-14T22:13:20.000Z");
        assert!(!r.id.is_empty());
    }

    #[test]
    fn append_then_read_keeps_order_and_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/results.jsonl");

        append_record(&path, &record("docker", "2024-01-01T00:00:00.000Z")).unwrap();
        append_record(&path, &record("kubernetes", "2024-01-01T00:01:00.000Z")).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"\n")
            .unwrap();

        let got = read_records(&path).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].category, "docker");
        assert_eq!(got[1].category, "kubernetes");
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_records(&dir.path().join("none.jsonl")).unwrap().is_empty());
    }

    #[test]
    fn corrupt_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        std::fs::write(&path, "{\"broken\": true}\n").unwrap();

        match read_records(&path) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn recent_by_category_keeps_newest_per_category() {
        let mut records = Vec::new();
        for minute in 0..7 {
            records.push(record("docker", &format!("2024-01-01T00:0{minute}:00.000Z")));
        }
        records.push(record("kubernetes", "2024-01-01T00:00:00.000Z"));

        let grouped = recent_by_category(records.clone(), None, 5);
        let docker = &grouped["docker"];
        assert_eq!(docker.len(), 5);
        assert_eq!(docker[0].executed_at, "2024-01-01T00:06:00.000Z");
        assert_eq!(docker[4].executed_at, "2024-01-01T00:02:00.000Z");
        assert_eq!(grouped["kubernetes"].len(), 1);

        let only_k8s = recent_by_category(records, Some("kubernetes"), 5);
        assert_eq!(only_k8s.keys().collect::<Vec<_>>(), vec!["kubernetes"]);
    }
}
