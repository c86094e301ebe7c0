use std::collections::HashSet;
use std::time::Duration;

use super::error::{Error, Result};

pub const DEFAULT_SCENARIO_NAME: &str = "play";
pub const DEFAULT_VUS: u64 = 10;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// Run-shape overrides coming from the command line. These win over everything else.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub iterations: Option<u64>,
    pub vus: Option<u64>,
    pub duration: Option<Duration>,
}

/// Top-level options (scenario file / environment), applied to every scenario unless overridden.
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    pub vus: Option<u64>,
    pub iterations: Option<u64>,
    pub duration: Option<Duration>,
    pub graceful_stop: Option<Duration>,
    pub scenarios: Vec<ScenarioOptions>,
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioOptions {
    pub name: String,
    pub tags: Vec<(String, String)>,
    pub vus: Option<u64>,
    pub iterations: Option<u64>,
    pub duration: Option<Duration>,
    pub graceful_stop: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub name: String,
    pub tags: Vec<(String, String)>,
    pub vus: u64,
    /// Shared iteration budget across all VUs of the scenario.
    pub iterations: Option<u64>,
    pub duration: Option<Duration>,
    pub graceful_stop: Duration,
}

/// Resolve the final scenario list. Precedence: CLI > scenario > top-level options > defaults.
///
/// Without any `scenarios`, a single default scenario is produced. When neither `iterations`
/// nor `duration` is configured anywhere, the scenario runs for [`DEFAULT_DURATION`].
pub fn scenarios_from_options(opts: ScriptOptions, cfg: RunConfig) -> Result<Vec<ScenarioConfig>> {
    let scenarios = if opts.scenarios.is_empty() {
        vec![ScenarioOptions {
            name: DEFAULT_SCENARIO_NAME.to_string(),
            ..ScenarioOptions::default()
        }]
    } else {
        opts.scenarios.clone()
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(scenarios.len());
    for s in scenarios {
        if !seen.insert(s.name.clone()) {
            return Err(Error::DuplicateScenario(s.name));
        }

        let vus = cfg.vus.or(s.vus).or(opts.vus).unwrap_or(DEFAULT_VUS);
        if vus == 0 {
            return Err(Error::InvalidVus);
        }

        let iterations = cfg.iterations.or(s.iterations).or(opts.iterations);
        if iterations == Some(0) {
            return Err(Error::InvalidIterations);
        }

        // An explicit CLI iteration count alone switches the run to iteration mode.
        let duration = match (cfg.duration, cfg.iterations) {
            (Some(d), _) => Some(d),
            (None, Some(_)) => None,
            (None, None) => s.duration.or(opts.duration),
        };
        let duration = match (duration, iterations) {
            (None, None) => Some(DEFAULT_DURATION),
            (d, _) => d,
        };
        if duration.is_some_and(|d| d.is_zero()) {
            return Err(Error::InvalidDuration);
        }

        let graceful_stop = s
            .graceful_stop
            .or(opts.graceful_stop)
            .unwrap_or(DEFAULT_GRACEFUL_STOP);

        out.push(ScenarioConfig {
            name: s.name,
            tags: s.tags,
            vus,
            iterations,
            duration,
            graceful_stop,
        });
    }

    Ok(out)
}
