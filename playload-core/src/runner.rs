mod config;
mod error;
mod gate;
mod progress;
mod run;
mod stats;
mod vu;

pub use config::{
    DEFAULT_DURATION, DEFAULT_GRACEFUL_STOP, DEFAULT_SCENARIO_NAME, DEFAULT_VUS, RunConfig,
    ScenarioConfig, ScenarioOptions, ScriptOptions, scenarios_from_options,
};
pub use error::{Error, Result};
pub use gate::IterationGate;
pub use progress::{LiveMetrics, ProgressFn, ProgressUpdate};
pub use run::run_scenarios;
pub use stats::{
    CheckSummary, LatencySummary, RequestOutcome, RunStats, RunSummary, ScenarioStats,
    ScenarioSummary, Totals,
};
pub use vu::IterationContext;
