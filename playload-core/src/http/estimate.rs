use super::util::{check_scheme, has_header, host_header_value};
use super::{Error, HttpRequest, Result};

/// Estimate bytes sent for an HTTP request.
///
/// Best-effort HTTP/1.1 framing: request line + headers + CRLF + body.
/// Host/Content-Length are counted even when the caller did not set them, since the client adds them.
pub fn estimate_http_request_bytes(req: &HttpRequest) -> Result<u64> {
    estimate_http_request_bytes_parts(&req.method, &req.url, &req.headers, req.body.len() as u64)
}

pub(super) fn estimate_http_request_bytes_parts(
    method: &http::Method,
    url: &str,
    headers: &[(String, String)],
    body_len: u64,
) -> Result<u64> {
    let parsed = url::Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
    check_scheme(&parsed, url)?;

    let uri: hyper::Uri = url
        .parse()
        .map_err(|_| Error::InvalidUrl(url.to_string()))?;

    let mut bytes = request_line_bytes(method, &uri);

    for (k, v) in headers {
        bytes = bytes.saturating_add(header_bytes(k.as_bytes(), v.as_bytes()));
    }

    if !has_header(headers, "host")
        && let Some(host) = host_header_value(&parsed)
    {
        bytes = bytes.saturating_add(header_bytes(b"host", host.as_bytes()));
    }

    // POST/PUT always carry a Content-Length, even for an empty body.
    if needs_content_length(method, body_len) && !has_header(headers, "content-length") {
        let v = body_len.to_string();
        bytes = bytes.saturating_add(header_bytes(b"content-length", v.as_bytes()));
    }

    bytes = bytes.saturating_add(2);
    Ok(bytes.saturating_add(body_len))
}

pub(super) fn needs_content_length(method: &http::Method, body_len: u64) -> bool {
    body_len != 0 || matches!(*method, http::Method::POST | http::Method::PUT | http::Method::PATCH)
}

fn request_line_bytes(method: &http::Method, uri: &hyper::Uri) -> u64 {
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    // "METHOD SP path SP HTTP/1.1 CRLF"
    (method.as_str().len() as u64)
        .saturating_add(1)
        .saturating_add(path.len() as u64)
        .saturating_add(1)
        .saturating_add("HTTP/1.1".len() as u64)
        .saturating_add(2)
}

pub(super) fn response_head_bytes(
    version: http::Version,
    status: http::StatusCode,
    headers: &http::HeaderMap,
) -> u64 {
    let version_len = match version {
        http::Version::HTTP_2 => "HTTP/2".len(),
        http::Version::HTTP_3 => "HTTP/3".len(),
        _ => "HTTP/1.1".len(),
    } as u64;

    // "HTTP/1.1 SP 200 CRLF", reason phrase ignored.
    let mut bytes = version_len
        .saturating_add(1)
        .saturating_add(status.as_str().len() as u64)
        .saturating_add(2);

    for (name, value) in headers {
        bytes = bytes.saturating_add(header_bytes(name.as_str().as_bytes(), value.as_bytes()));
    }
    bytes.saturating_add(2)
}

fn header_bytes(name: &[u8], value: &[u8]) -> u64 {
    // "name: value\r\n"
    (name.len() as u64)
        .saturating_add(2)
        .saturating_add(value.len() as u64)
        .saturating_add(2)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use bytes::Bytes;

    use super::*;

    #[test]
    fn empty_post_counts_request_line_host_and_content_length() {
        let req = HttpRequest::post("http://localhost/backend/api/play", Bytes::new());
        let got = estimate_http_request_bytes(&req).unwrap();

        let expected = "POST /backend/api/play HTTP/1.1\r\n".len()
            + "host: localhost\r\n".len()
            + "content-length: 0\r\n".len()
            + 2;
        assert_eq!(got, expected as u64);
    }

    #[test]
    fn get_without_body_has_no_content_length() {
        let req = HttpRequest::new(http::Method::GET, "http://localhost:8080/");
        let got = estimate_http_request_bytes(&req).unwrap();

        let expected = "GET / HTTP/1.1\r\n".len() + "host: localhost:8080\r\n".len() + 2;
        assert_eq!(got, expected as u64);
    }

    #[test]
    fn rejects_non_http_scheme() {
        let req = HttpRequest::new(http::Method::GET, "ftp://localhost/file");
        assert!(matches!(
            estimate_http_request_bytes(&req),
            Err(Error::UnsupportedScheme(_))
        ));
    }
}
