use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::api_sports::{event_date, response_items, status_text, team_names, ApiSportsClient, DayWindow};
use super::provider::{id_string, num, FetchError, MatchProvider};
use crate::db::models::{Match, Sport, TeamScore};

pub const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";

const RESULT_CAP: usize = 50;

/// Fixtures from API-Sports football, all leagues.
/// Docs: <https://www.api-football.com/documentation-v3>
pub struct ApiSportsFootball {
    client: ApiSportsClient,
}

impl ApiSportsFootball {
    pub fn new(api_key: Option<&str>, base_url: Option<&str>) -> Result<Self> {
        Ok(ApiSportsFootball {
            client: ApiSportsClient::new(api_key, base_url.unwrap_or(DEFAULT_BASE_URL))?,
        })
    }

    async fn fetch_day(&self, window: DayWindow, now: DateTime<Utc>) -> Result<Vec<Match>> {
        let date = window.date_param(now);
        debug!("Fetching football fixtures for {}", date);
        let raw = self
            .client
            .get("fixtures", &[("date", date)])
            .await
            .context("API-Sports football request failed")?;
        Ok(parse_fixtures(&raw, window))
    }
}

#[async_trait]
impl MatchProvider for ApiSportsFootball {
    fn sport(&self) -> Sport {
        Sport::Football
    }

    fn name(&self) -> &str {
        "API-Sports football"
    }

    async fn fetch_current(&self, now: DateTime<Utc>) -> Result<Vec<Match>> {
        self.fetch_day(DayWindow::Today, now).await
    }

    fn has_previous_day(&self) -> bool {
        true
    }

    async fn fetch_previous_day(&self, now: DateTime<Utc>) -> Result<Vec<Match>> {
        self.fetch_day(DayWindow::Yesterday, now).await
    }

    fn result_cap(&self) -> Option<usize> {
        Some(RESULT_CAP)
    }

    async fn fetch_detail(&self, raw_id: &str) -> Result<Option<Value>, FetchError> {
        let raw = self.client.get("fixtures", &[("id", raw_id.to_string())]).await?;
        Ok(response_items(&raw).first().cloned())
    }
}

/// Today: everything except cancelled/postponed. Yesterday: finished only.
pub fn parse_fixtures(raw: &Value, window: DayWindow) -> Vec<Match> {
    response_items(raw)
        .iter()
        .filter(|fx| {
            let status = fixture_status(fx).to_lowercase();
            match window {
                DayWindow::Today => !status.contains("cancelled") && !status.contains("postponed"),
                DayWindow::Yesterday => status.contains("finished") || status.contains("full time"),
            }
        })
        .filter_map(map_fixture)
        .collect()
}

fn fixture_status(fx: &Value) -> String {
    let status = &fx["fixture"]["status"];
    status_text(status)
        .or_else(|| num(&status["elapsed"]).map(|min| format!("{}'", min)))
        .unwrap_or_else(|| "Scheduled".to_string())
}

/// Short display names for the big leagues; anything else keeps the provider name.
pub fn normalize_league(name: &str, country: &str) -> String {
    let n = name.to_lowercase();
    let c = country.to_lowercase();
    let label = if n.contains("premier league") && c.contains("england") {
        "Premier League"
    } else if n.contains("la liga") {
        "La Liga"
    } else if n.contains("bundesliga") && !n.contains("women") {
        "Bundesliga"
    } else if n.contains("serie a") && c.contains("italy") {
        "Serie A"
    } else if n.contains("ligue 1") {
        "Ligue 1"
    } else if n.contains("uefa champions") {
        "Champions League"
    } else if name.trim().is_empty() {
        "Football"
    } else {
        return name.to_string();
    };
    label.to_string()
}

fn map_fixture(fx: &Value) -> Option<Match> {
    let raw_id = id_string(&fx["fixture"]["id"])?;
    let (home, away) = team_names(fx);
    let mut m = Match::new(Sport::Football, Sport::Football.provider_id(&raw_id), &home, &away);
    m.league = normalize_league(
        fx["league"]["name"].as_str().unwrap_or_default(),
        fx["league"]["country"].as_str().unwrap_or_default(),
    );
    m.status = fixture_status(fx);
    m.date = event_date(&fx["fixture"]["date"]).or_else(|| event_date(&fx["fixture"]["timestamp"]));
    if let Some(venue) = fx["fixture"]["venue"]["name"].as_str() {
        m.venue = venue.to_string();
    }
    let goals = &fx["goals"];
    if goals.is_object() {
        let halftime = &fx["score"]["halftime"];
        m.score = vec![
            TeamScore::Football {
                team: home,
                goals: num(&goals["home"]),
                halftime: num(&halftime["home"]),
            },
            TeamScore::Football {
                team: away,
                goals: num(&goals["away"]),
                halftime: num(&halftime["away"]),
            },
        ];
    }
    Some(m)
}
