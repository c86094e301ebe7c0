//! Boolean assertions evaluated against a response.

use crate::http::HttpResponse;

/// Name of the check every play iteration runs by default.
pub const DEFAULT_CHECK_NAME: &str = "status is 200";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckKind {
    /// Response status equals the given code.
    Status(u16),
    /// Response body (as UTF-8) contains the given text.
    BodyContains(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub kind: CheckKind,
}

impl Check {
    pub fn new(name: impl Into<String>, kind: CheckKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// `status is <code>`
    pub fn status(code: u16) -> Self {
        Self::new(format!("status is {code}"), CheckKind::Status(code))
    }

    /// Evaluate against a response. A request that never produced a response fails every check.
    pub fn evaluate(&self, res: Option<&HttpResponse>) -> bool {
        let Some(res) = res else {
            return false;
        };

        match &self.kind {
            CheckKind::Status(code) => res.status == *code,
            CheckKind::BodyContains(needle) => res
                .body_utf8()
                .is_some_and(|body| body.contains(needle.as_str())),
        }
    }
}

impl Default for Check {
    fn default() -> Self {
        Self::status(200)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            body: Bytes::from_static(body.as_bytes()),
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    #[test]
    fn default_check_is_status_200() {
        let check = Check::default();
        assert_eq!(check.name, DEFAULT_CHECK_NAME);
        assert!(check.evaluate(Some(&response(200, ""))));
        assert!(!check.evaluate(Some(&response(500, ""))));
        assert!(!check.evaluate(Some(&response(201, ""))));
    }

    #[test]
    fn missing_response_fails() {
        assert!(!Check::default().evaluate(None));
        let body = Check::new("has ok", CheckKind::BodyContains("ok".to_string()));
        assert!(!body.evaluate(None));
    }

    #[test]
    fn body_contains_matches_substring() {
        let check = Check::new("has ok", CheckKind::BodyContains("ok".to_string()));
        assert!(check.evaluate(Some(&response(200, "{\"status\":\"ok\"}"))));
        assert!(!check.evaluate(Some(&response(200, "nope"))));
    }
}
