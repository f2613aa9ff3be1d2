//! Shared transport and field accessors for the API-Sports family
//! (basketball, football, hockey). All three speak the same envelope:
//! `{"errors": [...] | {...}, "results": n, "response": [...]}`.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::provider::{get_json, provider_error, FetchError};
use crate::db::models::parse_event_date;

pub const API_KEY_HEADER: &str = "x-apisports-key";

/// Calendar day a request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayWindow {
    Today,
    Yesterday,
}

impl DayWindow {
    /// `YYYY-MM-DD` in UTC.
    pub fn date_param(&self, now: DateTime<Utc>) -> String {
        let day = match self {
            DayWindow::Today => now,
            DayWindow::Yesterday => now - Duration::days(1),
        };
        day.format("%Y-%m-%d").to_string()
    }
}

pub struct ApiSportsClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl ApiSportsClient {
    pub fn new(api_key: Option<&str>, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiSportsClient {
            http,
            api_key: api_key.unwrap_or_default().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET `{base}/{endpoint}?query` and check the `errors` discriminator.
    pub async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = Url::parse_with_params(&format!("{}/{}", self.base_url, endpoint), query)
            .map_err(|e| FetchError::Provider(format!("bad URL for {}: {}", endpoint, e)))?;
        let raw = get_json(&self.http, url, &[(API_KEY_HEADER, self.api_key.as_str())]).await?;
        check_errors(&raw)?;
        Ok(raw)
    }
}

/// API-Sports reports failures as a non-empty `errors` array or object,
/// usually with HTTP 200.
pub fn check_errors(raw: &Value) -> Result<(), FetchError> {
    let messages: Vec<String> = match &raw["errors"] {
        Value::Array(items) => items.iter().map(value_text).collect(),
        Value::Object(fields) => fields
            .iter()
            .map(|(k, v)| format!("{}: {}", k, value_text(v)))
            .collect(),
        _ => Vec::new(),
    };
    if messages.is_empty() {
        Ok(())
    } else {
        Err(provider_error(messages.join("; ")))
    }
}

fn value_text(v: &Value) -> String {
    v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())
}

pub fn response_items(raw: &Value) -> &[Value] {
    raw["response"].as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// `status.long`, falling back to `status.short`.
pub fn status_text(status: &Value) -> Option<String> {
    status["long"]
        .as_str()
        .or_else(|| status["short"].as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Games that have not been (and may never be) played.
pub fn is_unplayed(status: &Value) -> bool {
    let text = status_text(status).unwrap_or_default().to_lowercase();
    let short = status["short"].as_str().unwrap_or_default();
    text.contains("scheduled")
        || text.contains("not started")
        || text.contains("postponed")
        || text.contains("cancelled")
        || short == "NS"
}

/// Home and away names, with placeholders for missing entries.
pub fn team_names(item: &Value) -> (String, String) {
    let name = |side: &str| {
        item["teams"][side]["name"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(if side == "home" { "Home" } else { "Away" })
            .to_string()
    };
    (name("home"), name("away"))
}

pub fn event_date(v: &Value) -> Option<DateTime<Utc>> {
    v.as_str().and_then(parse_event_date).or_else(|| {
        v.as_i64()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
    })
}
