use std::time::Duration;

use anyhow::Context as _;
use serde::de::DeserializeOwned;

pub const USER_AGENT: &str = concat!("wpmigrate/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration, accept_invalid_certs: bool) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .context("build http client")
}

/// Reads a response body, failing with the status and a body excerpt on non-2xx.
pub async fn read_text(response: reqwest::Response, what: &str) -> anyhow::Result<String> {
    let status = response.status();
    let raw = response
        .text()
        .await
        .with_context(|| format!("read {what} response body"))?;
    if !status.is_success() {
        anyhow::bail!("{what} failed ({status}): {}", excerpt(&raw, 200));
    }
    Ok(raw)
}

pub async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> anyhow::Result<T> {
    let raw = read_text(response, what).await?;
    serde_json::from_str(&raw).with_context(|| format!("parse {what} response"))
}

pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}
