use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

pub const APP_USER_AGENT: &str = concat!("jarlink/", env!("CARGO_PKG_VERSION"));

/// Builds the shared HTTP client.
///
/// Both timeouts are mandatory: a repository that stops answering must fail
/// the attempt instead of blocking the whole batch.
pub fn build_http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
}
