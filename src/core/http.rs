use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

const APP_USER_AGENT: &str = concat!("Lodestone/", env!("CARGO_PKG_VERSION"));

/// Shared client. Identity encoding keeps `Content-Length` equal to the
/// number of bytes written to disk, which the fetcher relies on.
///
/// Only connection setup is bounded. A transfer runs until it completes or
/// the connection errors, however long the body takes.
pub fn build_http_client(connect_timeout_secs: u64) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(Duration::from_secs(connect_timeout_secs.max(1)))
        .build()
}

/// GET `url` and return the body as text, rejecting non-success statuses.
pub async fn fetch_text(client: &Client, url: &str) -> LauncherResult<String> {
    debug!("GET {}", url);
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LauncherError::DownloadFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

/// GET `url` and decode a JSON document.
pub async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> LauncherResult<T> {
    let body = fetch_text(client, url).await?;
    Ok(serde_json::from_str(&body)?)
}
