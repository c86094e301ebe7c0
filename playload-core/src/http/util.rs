pub(super) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

pub(super) fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

pub(super) fn check_scheme(parsed: &url::Url, raw: &str) -> super::Result<()> {
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(super::Error::UnsupportedScheme(raw.to_string())),
    }
}
