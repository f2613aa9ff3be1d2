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

pub const DEFAULT_BASE_URL: &str = "https://v1.basketball.api-sports.io";
pub const NBA_LEAGUE_ID: u32 = 12;

const TODAY_CAP: usize = 30;
const YESTERDAY_CAP: usize = 10;

/// NBA games from API-Sports basketball.
/// Docs: <https://api-sports.io/documentation/basketball/v1>
pub struct ApiSportsBasketball {
    client: ApiSportsClient,
    league_id: u32,
}

impl ApiSportsBasketball {
    pub fn new(api_key: Option<&str>, base_url: Option<&str>, league_id: u32) -> Result<Self> {
        Ok(ApiSportsBasketball {
            client: ApiSportsClient::new(api_key, base_url.unwrap_or(DEFAULT_BASE_URL))?,
            league_id,
        })
    }

    async fn fetch_day(&self, window: DayWindow, now: DateTime<Utc>) -> Result<Vec<Match>> {
        let date = window.date_param(now);
        debug!("Fetching basketball games for {}", date);
        let raw = self
            .client
            .get(
                "games",
                &[("league", self.league_id.to_string()), ("date", date)],
            )
            .await
            .context("API-Sports basketball request failed")?;
        Ok(parse_games(&raw, window))
    }
}

#[async_trait]
impl MatchProvider for ApiSportsBasketball {
    fn sport(&self) -> Sport {
        Sport::Basketball
    }

    fn name(&self) -> &str {
        "API-Sports basketball"
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

/// Played games only; everything on this endpoint is NBA.
pub fn parse_games(raw: &Value, window: DayWindow) -> Vec<Match> {
    let cap = match window {
        DayWindow::Today => TODAY_CAP,
        DayWindow::Yesterday => YESTERDAY_CAP,
    };
    response_items(raw)
        .iter()
        .filter(|game| !is_unplayed(&game["status"]))
        .filter_map(|game| map_game(game, window))
        .take(cap)
        .collect()
}

fn map_game(game: &Value, window: DayWindow) -> Option<Match> {
    let raw_id = id_string(&game["id"])?;
    let (home, away) = team_names(game);
    let mut m = Match::new(Sport::Basketball, Sport::Basketball.provider_id(&raw_id), &home, &away);
    m.league = "NBA".to_string();
    m.status = status_text(&game["status"]).unwrap_or_else(|| match window {
        DayWindow::Today => "Live".to_string(),
        DayWindow::Yesterday => "Finished".to_string(),
    });
    m.date = event_date(&game["date"]).or_else(|| event_date(&game["timestamp"]));
    if let Some(venue) = game["venue"]["name"].as_str().or_else(|| game["venue"].as_str()) {
        m.venue = venue.to_string();
    }
    let scores = &game["scores"];
    if scores.is_object() {
        m.score = vec![
            quarter_line(&home, &scores["home"]),
            quarter_line(&away, &scores["away"]),
        ];
    }
    Some(m)
}

fn quarter_line(team: &str, side: &Value) -> TeamScore {
    TeamScore::Basketball {
        team: team.to_string(),
        points: num(&side["total"]),
        q1: num(&side["quarter_1"]),
        q2: num(&side["quarter_2"]),
        q3: num(&side["quarter_3"]),
        q4: num(&side["quarter_4"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "errors": [],
            "response": [
                {
                    "id": 500,
                    "date": "2024-03-01T00:30:00+00:00",
                    "status": {"long": "Game Finished", "short": "FT"},
                    "teams": {"home": {"name": "Lakers"}, "away": {"name": "Celtics"}},
                    "scores": {
                        "home": {"quarter_1": 30, "quarter_2": 25, "quarter_3": 28, "quarter_4": 27, "total": 110},
                        "away": {"quarter_1": 20, "quarter_2": 30, "quarter_3": 25, "quarter_4": 29, "total": 104}
                    }
                },
                {
                    "id": 501,
                    "status": {"long": "Not Started", "short": "NS"},
                    "teams": {"home": {"name": "Heat"}, "away": {"name": "Knicks"}},
                    "scores": {"home": {"total": null}, "away": {"total": null}}
                },
                {
                    "status": {"long": "Quarter 2", "short": "Q2"},
                    "teams": {"home": {"name": "No"}, "away": {"name": "Id"}}
                }
            ]
        })
    }

    #[test]
    fn test_parse_games_maps_and_filters() {
        let games = parse_games(&sample(), DayWindow::Today);
        assert_eq!(games.len(), 1);
        let g = &games[0];
        assert_eq!(g.id, "bb-500");
        assert_eq!(g.league, "NBA");
        assert_eq!(g.status, "Game Finished");
        assert_eq!(g.date, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap()));
        match &g.score[0] {
            TeamScore::Basketball { team, points, q4, .. } => {
                assert_eq!(team, "Lakers");
                assert_eq!(*points, Some(110));
                assert_eq!(*q4, Some(27));
            }
            other => panic!("unexpected score {:?}", other),
        }
    }

    #[test]
    fn test_missing_response_is_empty() {
        assert!(parse_games(&json!({"errors": []}), DayWindow::Yesterday).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_current_requests_league_and_date() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/games")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("league".into(), "12".into()),
                mockito::Matcher::UrlEncoded("date".into(), "2024-03-01".into()),
            ]))
            .with_status(200)
            .with_body(sample().to_string())
            .create_async()
            .await;

        let provider =
            ApiSportsBasketball::new(Some("key"), Some(&server.url()), NBA_LEAGUE_ID).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let games = provider.fetch_current(now).await.unwrap();
        assert_eq!(games.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_fails_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/games")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;
        let provider =
            ApiSportsBasketball::new(Some("key"), Some(&server.url()), NBA_LEAGUE_ID).unwrap();
        assert!(provider.fetch_current(Utc::now()).await.is_err());
    }
}
