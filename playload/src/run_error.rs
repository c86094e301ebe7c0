use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => e,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

/// Sort a core runner error into bad input vs. runtime failure.
pub(crate) fn classify_runner_error(err: playload_core::runner::Error) -> RunError {
    use playload_core::runner::Error;

    let kind = match &err {
        Error::InvalidVus
        | Error::InvalidIterations
        | Error::InvalidDuration
        | Error::DuplicateScenario(_)
        | Error::NoScenarios => RunError::InvalidInput,
        Error::Join(_) => RunError::RuntimeError,
    };
    kind(anyhow::Error::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_validation_errors_are_invalid_input() {
        let err = classify_runner_error(playload_core::runner::Error::InvalidVus);
        assert_eq!(err.exit_code(), ExitCode::InvalidInput);
        assert!(err.to_string().contains("vus"));
    }
}
