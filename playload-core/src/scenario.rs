//! The play scenario: one request, its checks, then think time.

use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::check::Check;
use crate::http::{self, HttpRequest, estimate_http_request_bytes};
use crate::runner::{IterationContext, RequestOutcome};

pub const DEFAULT_BASE_URL: &str = "http://localhost";
pub const DEFAULT_PATH: &str = "/backend/api/play";
pub const DEFAULT_SLEEP: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Request sent on every iteration.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub method: ::http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub timeout: Option<Duration>,
}

impl RequestTemplate {
    /// `POST {base_url}{path}` with an empty body.
    pub fn post(base_url: &str, path: &str) -> http::Result<Self> {
        let url = join_url(base_url, path)?;
        Ok(Self {
            method: ::http::Method::POST,
            url,
            headers: Vec::new(),
            body: Bytes::new(),
            timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        })
    }

    /// Replace the method (case-insensitive, e.g. `post`).
    pub fn with_method(mut self, method: &str) -> http::Result<Self> {
        self.method = ::http::Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| http::Error::InvalidMethod(method.to_string()))?;
        Ok(self)
    }

    /// Add a header, rejecting names or values that could never be sent.
    pub fn with_header(mut self, name: &str, value: &str) -> http::Result<Self> {
        ::http::header::HeaderName::from_bytes(name.as_bytes())?;
        ::http::header::HeaderValue::from_str(value)?;
        self.headers.push((name.to_string(), value.to_string()));
        Ok(self)
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn to_request(&self) -> HttpRequest {
        HttpRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            timeout: self.timeout,
        }
    }
}

/// Join a base URL and a path, validating the result.
///
/// A trailing slash on the base and a missing leading slash on the path are both tolerated.
pub fn join_url(base_url: &str, path: &str) -> http::Result<String> {
    let base = base_url.trim_end_matches('/');
    let joined = if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };

    let parsed =
        url::Url::parse(&joined).map_err(|_| http::Error::InvalidUrl(joined.clone()))?;
    if parsed.host_str().is_none() {
        return Err(http::Error::InvalidUrl(joined));
    }
    match parsed.scheme() {
        "http" | "https" => Ok(joined),
        _ => Err(http::Error::UnsupportedScheme(joined)),
    }
}

#[derive(Debug, Clone)]
pub struct PlayScenario {
    pub request: RequestTemplate,
    pub checks: Vec<Check>,
    /// Think time after each request.
    pub sleep: Duration,
}

impl PlayScenario {
    /// The default play scenario against `base_url`: `POST /backend/api/play`, `status is 200`, sleep 1s.
    pub fn new(base_url: &str) -> http::Result<Self> {
        Ok(Self {
            request: RequestTemplate::post(base_url, DEFAULT_PATH)?,
            checks: vec![Check::default()],
            sleep: DEFAULT_SLEEP,
        })
    }

    /// One iteration: send, await, check, sleep. Failures are recorded, never returned.
    pub async fn iterate(&self, ctx: IterationContext) {
        let req = self.request.to_request();
        let bytes_sent_estimate = estimate_http_request_bytes(&req).unwrap_or(0);

        let started = Instant::now();
        let res = ctx.client.request(req).await;
        let elapsed = started.elapsed();

        let response = match res {
            Ok(res) => {
                tracing::trace!(
                    vu = ctx.vu_id,
                    iteration = ctx.iteration,
                    status = res.status,
                    elapsed = ?elapsed,
                    "request completed"
                );
                ctx.stats
                    .record_request(&RequestOutcome::from_response(&res, elapsed));
                Some(res)
            }
            Err(err) => {
                tracing::debug!(
                    vu = ctx.vu_id,
                    iteration = ctx.iteration,
                    error = %err,
                    "request failed"
                );
                ctx.stats.record_request(&RequestOutcome::from_error(
                    err.transport_error_kind(),
                    elapsed,
                    bytes_sent_estimate,
                ));
                None
            }
        };

        for check in &self.checks {
            ctx.stats
                .record_check(&check.name, check.evaluate(response.as_ref()));
        }

        if !self.sleep.is_zero() {
            tokio::time::sleep(self.sleep).await;
        }
    }
}
