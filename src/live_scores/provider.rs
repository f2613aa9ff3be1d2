use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::db::models::{Match, Sport};

/// Trait that every per-sport match provider must implement.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    fn sport(&self) -> Sport;

    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Matches for the current window (today, or the provider's live feed).
    /// An error here fails the whole sport for this cycle.
    async fn fetch_current(&self, now: DateTime<Utc>) -> Result<Vec<Match>>;

    /// Whether the provider also serves the previous calendar day.
    fn has_previous_day(&self) -> bool {
        false
    }

    /// Completed matches from the previous calendar day.
    async fn fetch_previous_day(&self, _now: DateTime<Utc>) -> Result<Vec<Match>> {
        Ok(Vec::new())
    }

    /// Cap applied to the processed, ranked result for this sport.
    fn result_cap(&self) -> Option<usize> {
        None
    }

    /// Raw scorecard / box score for a provider-native id (prefix stripped).
    /// `Ok(None)` when the provider returned nothing for the id.
    async fn fetch_detail(&self, raw_id: &str) -> Result<Option<serde_json::Value>, FetchError>;
}

/// Transport-level failure, kept typed so the detail path can tell
/// quota exhaustion and not-found apart from everything else.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Http(StatusCode),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("provider error: {0}")]
    Provider(String),
}

/// True for the wording providers use when a plan's request quota is spent.
pub fn is_quota_message(message: &str) -> bool {
    let m = message.to_lowercase();
    ["limit", "exceeded", "blocking", "quota", "too many requests"]
        .iter()
        .any(|k| m.contains(k))
}

pub fn is_not_found_message(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("not found") || m.contains("err_id_not_found")
}

/// Classify a provider-reported error message.
pub fn provider_error(message: String) -> FetchError {
    if is_quota_message(&message) {
        FetchError::RateLimited(message)
    } else if is_not_found_message(&message) {
        FetchError::NotFound(message)
    } else {
        FetchError::Provider(message)
    }
}

/// GET a JSON document. Non-2xx statuses and bodies that are not JSON are errors;
/// the provider-specific discriminator is checked by the caller.
pub async fn get_json(
    http: &Client,
    url: Url,
    headers: &[(&str, &str)],
) -> Result<serde_json::Value, FetchError> {
    let mut req = http.get(url);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    let resp = req.send().await?;
    match resp.status() {
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(FetchError::RateLimited("HTTP 429".to_string()))
        }
        StatusCode::NOT_FOUND => return Err(FetchError::NotFound("HTTP 404".to_string())),
        status if !status.is_success() => return Err(FetchError::Http(status)),
        _ => {}
    }
    Ok(resp.json().await?)
}

/// Lenient unsigned number: accepts JSON numbers and numeric strings.
pub fn num(v: &serde_json::Value) -> Option<u32> {
    v.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Lenient string id: accepts strings and numbers.
pub fn id_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
