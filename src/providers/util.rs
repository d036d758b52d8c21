use anyhow::Context;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::debug;

use crate::core::UpstreamError;

/// Upper bound for one upstream call, connect through last body byte.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest upstream body accepted. Rate and symbol payloads are a few KiB.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Query parameters that carry credentials and must never be logged.
const SECRET_PARAMS: &[&str] = &["access_key", "apiKey"];

pub fn build_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("fxproxy/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

pub fn parse_base_url(base_url: &str) -> anyhow::Result<Url> {
    let url = Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("Invalid base URL: {base_url}");
    }
    Ok(url)
}

/// Appends `segment` as a single path segment (percent-encoded) and the
/// query parameters to `base`.
pub fn endpoint(base: &Url, segment: &str, params: &[(&str, &str)]) -> Result<Url, UpstreamError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| UpstreamError::LocalFailure(format!("Cannot build request URL from {base}")))?
        .pop_if_empty()
        .push(segment);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// Copy of `url` fit for logs.
pub fn redacted(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }
    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if SECRET_PARAMS.contains(&k.as_ref()) {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    clean.query_pairs_mut().clear().extend_pairs(pairs);
    clean.to_string()
}

/// Issues a GET and returns the decoded JSON body of a 2xx response.
///
/// Transport failures map to `Unreachable`, non-2xx statuses to `Rejected`
/// and undecodable bodies to `LocalFailure`.
pub async fn fetch_json(
    client: &reqwest::Client,
    url: Url,
    timeout: Duration,
) -> Result<Value, UpstreamError> {
    debug!(url = %redacted(&url), "Requesting upstream");

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    let status = response.status();
    let body = read_body(response, timeout).await?;
    debug!(%status, bytes = body.len(), "Received upstream response");

    if !status.is_success() {
        return Err(UpstreamError::Rejected(rejection_message(status, &body)));
    }

    serde_json::from_slice(&body).map_err(|e| {
        UpstreamError::LocalFailure(format!("Failed to parse upstream response: {e}"))
    })
}

/// Collects the body chunk by chunk, giving up once it outgrows
/// [`MAX_BODY_BYTES`].
async fn read_body(
    mut response: reqwest::Response,
    timeout: Duration,
) -> Result<Vec<u8>, UpstreamError> {
    let too_large = || {
        UpstreamError::LocalFailure(format!(
            "Upstream response exceeds {MAX_BODY_BYTES} bytes"
        ))
    };

    if response
        .content_length()
        .is_some_and(|len| len > MAX_BODY_BYTES as u64)
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| transport_error(e, timeout))?
    {
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    let reported = serde_json::from_slice::<Value>(body).ok().and_then(|v| {
        match v.get("error")? {
            Value::String(s) => Some(s.clone()),
            Value::Object(fault) => fault
                .get("type")
                .or_else(|| fault.get("info"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    });
    reported.unwrap_or_else(|| format!("Upstream responded with status {status}"))
}

pub fn transport_error(err: reqwest::Error, timeout: Duration) -> UpstreamError {
    let err = err.without_url();
    if err.is_timeout() {
        UpstreamError::Unreachable(format!("Timeout of {}ms exceeded", timeout.as_millis()))
    } else if err.is_builder() || err.is_decode() {
        UpstreamError::LocalFailure(describe(&err))
    } else {
        UpstreamError::Unreachable(describe(&err))
    }
}

/// Flattens an error and its sources into one line.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
