use anyhow::Context as _;
use playload_core::report::{self, Error as ReportError};

use crate::cli::HistoryArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub fn history(args: HistoryArgs) -> Result<ExitCode, RunError> {
    if args.limit == 0 {
        return Err(RunError::InvalidInput(anyhow::anyhow!(
            "--limit must be a positive integer"
        )));
    }

    let records = report::read_records(&args.results_file).map_err(|err| match err {
        ReportError::Parse { .. } => RunError::InvalidInput(anyhow::Error::new(err)),
        other => RunError::RuntimeError(
            anyhow::Error::new(other).context("failed to read results file"),
        ),
    })?;

    let grouped = report::recent_by_category(records, args.category.as_deref(), args.limit);
    tracing::debug!(categories = grouped.len(), "history loaded");

    output::formatter(args.output)
        .print_history(&grouped)
        .context("failed to print history")
        .map_err(RunError::RuntimeError)?;

    Ok(ExitCode::Success)
}
