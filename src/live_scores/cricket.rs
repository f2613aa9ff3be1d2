use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::provider::{get_json, id_string, num, provider_error, FetchError, MatchProvider};
use crate::db::models::{parse_event_date, Match, Sport, TeamScore};

pub const DEFAULT_BASE_URL: &str = "https://api.cricapi.com/v1";
pub const PAGE_SIZE: usize = 25;
pub const DEFAULT_PAGES: usize = 5;

const RESULT_CAP: usize = 100;

/// Current matches from CricAPI. Domestic fixtures tend to sit on later
/// pages, so several pages are fetched concurrently.
/// Docs: <https://cricketdata.org/how-to-use-cricket-data-api.aspx>
pub struct CricApi {
    http: Client,
    api_key: String,
    base_url: String,
    pages: usize,
}

impl CricApi {
    pub fn new(api_key: Option<&str>, base_url: Option<&str>, pages: usize) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CricApi {
            http,
            api_key: api_key.unwrap_or_default().to_string(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            pages: pages.max(1),
        })
    }

    async fn call(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let mut params = vec![("apikey", self.api_key.clone())];
        params.extend(query.iter().map(|(k, v)| (*k, v.clone())));
        let url = Url::parse_with_params(&format!("{}/{}", self.base_url, endpoint), &params)
            .map_err(|e| FetchError::Provider(format!("bad URL for {}: {}", endpoint, e)))?;
        let raw = get_json(&self.http, url, &[]).await?;
        check_status(&raw)?;
        Ok(raw)
    }

    async fn fetch_page(&self, offset: usize) -> Result<Vec<Value>, FetchError> {
        let raw = self
            .call("currentMatches", &[("offset", offset.to_string())])
            .await?;
        Ok(raw["data"].as_array().cloned().unwrap_or_default())
    }
}

/// CricAPI signals failure with `status != "success"` and a `reason`.
pub fn check_status(raw: &Value) -> Result<(), FetchError> {
    if raw["status"].as_str() == Some("success") {
        return Ok(());
    }
    let reason = raw["reason"]
        .as_str()
        .or_else(|| raw["message"].as_str())
        .or_else(|| raw["status"].as_str())
        .unwrap_or("unknown CricAPI error");
    Err(provider_error(reason.to_string()))
}

#[async_trait]
impl MatchProvider for CricApi {
    fn sport(&self) -> Sport {
        Sport::Cricket
    }

    fn name(&self) -> &str {
        "CricAPI"
    }

    async fn fetch_current(&self, _now: DateTime<Utc>) -> Result<Vec<Match>> {
        let pages = join_all((0..self.pages).map(|p| self.fetch_page(p * PAGE_SIZE))).await;

        let mut items = Vec::new();
        let mut failures = 0;
        for (page, result) in pages.into_iter().enumerate() {
            match result {
                Ok(data) => items.extend(data),
                Err(e) => {
                    failures += 1;
                    warn!("CricAPI page offset {} failed: {}", page * PAGE_SIZE, e);
                }
            }
        }
        if failures == self.pages {
            bail!("all {} CricAPI pages failed", self.pages);
        }

        let matches: Vec<Match> = items.iter().filter_map(map_cricket_match).collect();
        debug!("Fetched {} cricket matches", matches.len());
        Ok(matches)
    }

    fn result_cap(&self) -> Option<usize> {
        Some(RESULT_CAP)
    }

    async fn fetch_detail(&self, raw_id: &str) -> Result<Option<Value>, FetchError> {
        let raw = self.call("match_info", &[("id", raw_id.to_string())]).await?;
        Ok(Some(raw["data"].clone()).filter(|d| !d.is_null()))
    }
}

/// League label from the match title and series name.
pub fn normalize_league(name: &str, series: &str, has_series_id: bool) -> String {
    let n = name.to_lowercase();
    let s = series.to_lowercase();
    let label = if n.contains("ipl") || s.contains("ipl") {
        "IPL"
    } else if n.contains("icc") || n.contains("world cup") || s.contains("icc") {
        "ICC"
    } else if n.contains("t20i") || n.contains("t20 international") || n.contains("odi") || n.contains("test") {
        "International"
    } else if s.contains("ranji") {
        "Ranji Trophy"
    } else if s.contains("vijay hazare") {
        "Vijay Hazare"
    } else if s.contains("syed mushtaq") {
        "Syed Mushtaq Ali"
    } else if has_series_id {
        if series.trim().is_empty() {
            "Tournament"
        } else {
            return series.trim().to_string();
        }
    } else {
        "Cricket"
    };
    label.to_string()
}

/// One cricket score line from any of the shapes CricAPI and curated files use:
/// `{r, w, o, inning}` objects (numbers or numeric strings) or a `"120/3 (20)"` string.
pub fn score_line(v: &Value) -> Option<TeamScore> {
    match v {
        Value::String(s) => Some(TeamScore::cricket_from_summary(s, None)),
        Value::Object(_) => {
            let inning = v["inning"].as_str().map(str::to_string);
            if let Some(summary) = v["r"].as_str().filter(|r| r.contains('/') || r.contains('(')) {
                return Some(TeamScore::cricket_from_summary(summary, inning));
            }
            Some(TeamScore::Cricket {
                runs: num(&v["r"]),
                wickets: num(&v["w"]),
                overs: v["o"]
                    .as_f64()
                    .or_else(|| v["o"].as_str().and_then(|o| o.trim().parse().ok())),
                inning,
            })
        }
        _ => None,
    }
}

fn inning_of(line: &TeamScore) -> Option<&str> {
    match line {
        TeamScore::Cricket { inning, .. } => inning.as_deref(),
        _ => None,
    }
}

/// Pick, for each team, its latest inning line (matched by name). Falls back to
/// the first two lines in provider order when no inning names match.
pub fn align_to_teams(lines: Vec<TeamScore>, teams: Option<&[String; 2]>) -> Vec<TeamScore> {
    if let Some(teams) = teams {
        let aligned: Vec<Option<&TeamScore>> = teams
            .iter()
            .map(|team| {
                let team = team.to_lowercase();
                lines.iter().rev().find(|line| {
                    inning_of(line).is_some_and(|inn| inn.to_lowercase().starts_with(&team))
                })
            })
            .collect();
        if aligned.iter().any(Option::is_some) {
            return aligned
                .into_iter()
                .map(|line| {
                    line.cloned().unwrap_or(TeamScore::Cricket {
                        runs: None,
                        wickets: None,
                        overs: None,
                        inning: None,
                    })
                })
                .collect();
        }
    }
    lines.into_iter().take(2).collect()
}

fn map_cricket_match(ev: &Value) -> Option<Match> {
    let raw_id = id_string(&ev["id"])?;
    let teams: Option<[String; 2]> = ev["teams"].as_array().and_then(|t| match t.as_slice() {
        [home, away] => Some([home.as_str()?.to_string(), away.as_str()?.to_string()]),
        _ => None,
    });
    let name = ev["name"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .or_else(|| teams.as_ref().map(|[h, a]| format!("{} vs {}", h, a)))
        .unwrap_or_else(|| "Cricket match".to_string());
    let series = ev["series"].as_str().filter(|s| !s.trim().is_empty()).map(str::to_string);
    let series_id = id_string(&ev["series_id"]);

    let lines: Vec<TeamScore> = match &ev["score"] {
        Value::Array(items) => items.iter().filter_map(score_line).collect(),
        other => score_line(other).into_iter().collect(),
    };

    let date = ev["dateTimeGMT"]
        .as_str()
        .and_then(parse_event_date)
        .or_else(|| ev["date"].as_str().and_then(parse_event_date));

    Some(Match {
        id: Sport::Cricket.provider_id(&raw_id),
        sport: Sport::Cricket,
        league: normalize_league(&name, series.as_deref().unwrap_or_default(), series_id.is_some()),
        score: align_to_teams(lines, teams.as_ref()),
        name,
        teams,
        series,
        series_id,
        venue: ev["venue"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("TBD")
            .to_string(),
        date,
        status: ev["status"].as_str().unwrap_or_default().to_string(),
        match_started: ev["matchStarted"].as_bool(),
        match_ended: ev["matchEnded"].as_bool(),
        is_custom: false,
        state: Default::default(),
        sort_score: 0,
    })
}
