use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context as _;
use playload_core::report::{self, DEFAULT_CATEGORY, ResultRecord};
use playload_core::runner::{RunConfig, RunSummary, run_scenarios, scenarios_from_options};
use playload_core::{HttpClient, PlayScenario};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::{RunError, classify_runner_error};
use crate::scenario_file::{self, Overrides, ScenarioFile};

/// Scenario tag naming the deployment under test.
pub(crate) const CATEGORY_TAG: &str = "category";

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let file = match &args.scenario {
        Some(path) => scenario_file::load(path)
            .await
            .map_err(RunError::InvalidInput)?,
        None => ScenarioFile::default(),
    };

    let overrides = Overrides {
        base_url: args.base_url.clone(),
        category: args.category.clone(),
    };
    let plan = file
        .into_plan(&overrides)
        .map_err(RunError::InvalidInput)?;

    let scenarios =
        scenarios_from_options(plan.options, run_config(&args)).map_err(classify_runner_error)?;

    out.print_header(&scenarios, &plan.scenarios);
    for (cfg, play) in scenarios.iter().zip(&plan.scenarios) {
        tracing::info!(
            scenario = %cfg.name,
            method = %play.request.method,
            url = %play.request.url,
            sleep = ?play.sleep,
            "target"
        );
    }

    let plays: Arc<Vec<PlayScenario>> = Arc::new(plan.scenarios);
    let client = Arc::new(HttpClient::default());

    let summary = run_scenarios(
        scenarios,
        client,
        move |ctx| {
            let plays = plays.clone();
            async move {
                if let Some(play) = plays.get(ctx.scenario_index) {
                    play.iterate(ctx).await;
                }
            }
        },
        out.progress(),
    )
    .await
    .map_err(classify_runner_error)?;

    out.print_summary(&summary)
        .map_err(RunError::RuntimeError)?;

    if let Some(path) = &args.results_file {
        let category = record_category(&summary);
        let record = ResultRecord::from_summary(&summary, &category, SystemTime::now());
        report::append_record(path, &record)
            .with_context(|| format!("failed to save result record: {}", path.display()))
            .map_err(RunError::RuntimeError)?;
        tracing::info!(id = %record.id, category = %record.category, path = %path.display(), "result saved");
        out.print_record(&record, path);
    }

    Ok(ExitCode::from_checks(summary.checks_failed_total()))
}

fn run_config(args: &RunArgs) -> RunConfig {
    RunConfig {
        iterations: args.iterations,
        vus: args.vus,
        duration: args.duration,
    }
}

/// The first scenario's `category` tag, if any. The CLI/env category is already applied as a tag.
fn record_category(summary: &RunSummary) -> String {
    summary
        .scenarios
        .iter()
        .flat_map(|s| s.tags.iter())
        .find(|(k, _)| k == CATEGORY_TAG)
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}
