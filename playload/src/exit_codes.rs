#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// One or more checks failed. The run itself completed.
    ChecksFailed = 10,

    /// Invalid CLI/config/options (bad flags, invalid durations, unreadable scenario file, bad URL).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors writing results, task failures).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_checks(checks_failed: u64) -> Self {
        if checks_failed > 0 {
            Self::ChecksFailed
        } else {
            Self::Success
        }
    }
}
