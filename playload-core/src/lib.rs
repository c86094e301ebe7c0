#![forbid(unsafe_code)]

mod check;
mod http;
mod scenario;

pub mod report;
pub mod runner;

pub use crate::check::{Check, CheckKind, DEFAULT_CHECK_NAME};
pub use crate::http::{
    Error as HttpError, HttpClient, HttpRequest, HttpResponse, HttpTransportErrorKind,
    Result as HttpResult, estimate_http_request_bytes,
};
pub use crate::runner::{
    IterationContext, ProgressFn, ProgressUpdate, RunConfig, RunSummary, ScenarioConfig,
    ScenarioOptions, ScenarioSummary, ScriptOptions,
};
pub use crate::scenario::{
    DEFAULT_BASE_URL, DEFAULT_PATH, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SLEEP, PlayScenario,
    RequestTemplate, join_url,
};
