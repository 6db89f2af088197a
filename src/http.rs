//! Blocking HTTP plumbing shared by the remote providers and backends.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;

/// Builds a blocking client with JSON content type and the given extra headers.
pub(crate) fn build_client(timeout: Duration, mut headers: HeaderMap) -> reqwest::Result<Client> {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
}

/// Rate limiting and server errors are worth retrying; other statuses are not.
pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Network-level failures (timeouts, refused connections, broken bodies).
pub(crate) fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

/// Reads an error response body for diagnostics.
pub(crate) fn error_body(resp: Response) -> String {
    resp.text()
        .unwrap_or_else(|_| "<body unavailable>".to_string())
}

/// Strips a trailing slash so paths can be appended with `format!`.
pub(crate) fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
