use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::api_sports::{
    event_date, is_unplayed, response_items, status_text, team_names, ApiSportsClient, DayWindow,
};
use super::provider::{id_string, num, FetchError, MatchProvider};
use crate::db::models::{Match, Sport, TeamScore};

pub const DEFAULT_BASE_URL: &str = "https://v1.hockey.api-sports.io";

const TODAY_CAP: usize = 30;
const YESTERDAY_CAP: usize = 10;

/// Games from API-Sports hockey, restricted to the major competitions.
pub struct ApiSportsHockey {
    client: ApiSportsClient,
}

impl ApiSportsHockey {
    pub fn new(api_key: Option<&str>, base_url: Option<&str>) -> Result<Self> {
        Ok(ApiSportsHockey {
            client: ApiSportsClient::new(api_key, base_url.unwrap_or(DEFAULT_BASE_URL))?,
        })
    }

    async fn fetch_day(&self, window: DayWindow, now: DateTime<Utc>) -> Result<Vec<Match>> {
        let date = window.date_param(now);
        debug!("Fetching hockey games for {}", date);
        let raw = self
            .client
            .get("games", &[("date", date)])
            .await
            .context("API-Sports hockey request failed")?;
        Ok(parse_games(&raw, window))
    }
}

#[async_trait]
impl MatchProvider for ApiSportsHockey {
    fn sport(&self) -> Sport {
        Sport::Hockey
    }

    fn name(&self) -> &str {
        "API-Sports hockey"
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

    async fn fetch_detail(&self, raw_id: &str) -> Result<Option<Value>, FetchError> {
        let raw = self.client.get("games", &[("id", raw_id.to_string())]).await?;
        Ok(response_items(&raw).first().cloned())
    }
}

fn league_text(game: &Value) -> String {
    game["league"]["name"]
        .as_str()
        .or_else(|| game["league"]["type"].as_str())
        .unwrap_or_default()
        .to_lowercase()
}

fn is_major_league(league: &str) -> bool {
    league.contains("fih")
        || league.contains("nhl")
        || (league.contains("hockey india") && league.contains("women"))
}

pub fn normalize_league(league: &str) -> &'static str {
    let l = league.to_lowercase();
    if l.contains("fih") || l.contains("pro league") || (l.contains("hockey") && l.contains("pro")) {
        "FIH Hockey Pro League"
    } else if l.contains("india") && l.contains("women") && l.contains("hockey") {
        "Hockey India League (Women)"
    } else {
        "NHL"
    }
}

/// Today: live games or major leagues. Yesterday: major leagues only.
pub fn parse_games(raw: &Value, window: DayWindow) -> Vec<Match> {
    let cap = match window {
        DayWindow::Today => TODAY_CAP,
        DayWindow::Yesterday => YESTERDAY_CAP,
    };
    response_items(raw)
        .iter()
        .filter(|game| !is_unplayed(&game["status"]))
        .filter(|game| {
            let major = is_major_league(&league_text(game));
            match window {
                DayWindow::Today => {
                    let status = status_text(&game["status"]).unwrap_or_default().to_lowercase();
                    major || status.contains("live") || status.contains("in progress")
                }
                DayWindow::Yesterday => major,
            }
        })
        .filter_map(|game| map_game(game, window))
        .take(cap)
        .collect()
}

/// Period lines come either as `"h-a"` strings under `periods` or as
/// `{home, away}` objects under `scores.period_N`.
fn period_goals(game: &Value, index: usize) -> (Option<u32>, Option<u32>) {
    const NAMES: [&str; 4] = ["first", "second", "third", "overtime"];
    if let Some((h, a)) = game["periods"][NAMES[index]]
        .as_str()
        .and_then(|s| s.split_once('-'))
    {
        return (h.trim().parse().ok(), a.trim().parse().ok());
    }
    let obj = &game["scores"][format!("period_{}", index + 1)];
    (num(&obj["home"]), num(&obj["away"]))
}

fn map_game(game: &Value, window: DayWindow) -> Option<Match> {
    let raw_id = id_string(&game["id"])?;
    let (home, away) = team_names(game);
    let mut m = Match::new(Sport::Hockey, Sport::Hockey.provider_id(&raw_id), &home, &away);
    m.league = normalize_league(&league_text(game)).to_string();
    m.status = status_text(&game["status"]).unwrap_or_else(|| match window {
        DayWindow::Today => "Live".to_string(),
        DayWindow::Yesterday => "Finished".to_string(),
    });
    m.date = event_date(&game["date"]).or_else(|| event_date(&game["timestamp"]));
    if let Some(venue) = game["venue"]["name"].as_str() {
        m.venue = venue.to_string();
    }
    let scores = &game["scores"];
    if scores.is_object() {
        let periods: Vec<(Option<u32>, Option<u32>)> = (0..4).map(|i| period_goals(game, i)).collect();
        m.score = vec![
            TeamScore::Hockey {
                team: home,
                goals: num(&scores["home"]),
                period1: periods[0].0,
                period2: periods[1].0,
                period3: periods[2].0,
                period4: periods[3].0,
            },
            TeamScore::Hockey {
                team: away,
                goals: num(&scores["away"]),
                period1: periods[0].1,
                period2: periods[1].1,
                period3: periods[2].1,
                period4: periods[3].1,
            },
        ];
    }
    Some(m)
}
