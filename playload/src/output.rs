use std::collections::BTreeMap;
use std::path::Path;

use playload_core::report::ResultRecord;
use playload_core::runner::{ProgressFn, RunSummary, ScenarioConfig};
use playload_core::PlayScenario;

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, scenarios: &[ScenarioConfig], plays: &[PlayScenario]);
    fn progress(&self) -> Option<ProgressFn>;
    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()>;
    fn print_record(&self, record: &ResultRecord, path: &Path);
    fn print_history(&self, history: &BTreeMap<String, Vec<ResultRecord>>) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
