//! Operator-curated matches.
//!
//! Loaded once per process from a JSON list. Curated matches always carry
//! `is_custom = true`, which puts them above everything a provider returns.
//! When an entry has innings detail, its scorecard is written to the cache's
//! detail slot so lookups never hit the network.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::cricket::{align_to_teams, score_line};
use super::provider::num;
use crate::cache::ResilientCache;
use crate::db::models::{parse_event_date, DetailSource, Match, MatchDetail, Sport, TeamScore};

/// Series id given to curated cricket matches.
pub const CURATED_SERIES_ID: &str = "custom-series";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratedEntry {
    pub match_id: String,
    #[serde(default)]
    pub match_name: Option<String>,
    /// Missing means cricket.
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub details: Option<CuratedDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CuratedDetails {
    #[serde(default)]
    pub innings: Vec<CuratedInning>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CuratedInning {
    #[serde(default)]
    pub team: Option<String>,
    /// Free-form line such as `"389"` or `"540/8 dec"`.
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub r: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub w: Option<u32>,
    #[serde(default, deserialize_with = "lenient_overs")]
    pub o: Option<f64>,
    #[serde(default)]
    pub inning: Option<String>,
    #[serde(default)]
    pub batting: Vec<Value>,
    #[serde(default)]
    pub bowling: Vec<Value>,
}

/// Runs and wickets arrive as numbers or numeric strings.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(num(&Value::deserialize(deserializer)?))
}

fn lenient_overs<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(v
        .as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
}

/// Read curated entries; no path means none.
pub fn load(path: Option<&str>) -> Result<Vec<CuratedEntry>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read curated matches from {}", path))?;
    let entries = parse_entries(&raw)
        .with_context(|| format!("Failed to parse curated matches in {}", path))?;
    info!("Loaded {} curated matches from {}", entries.len(), path);
    Ok(entries)
}

/// The document must be a JSON list; entries that do not fit are skipped.
pub fn parse_entries(raw: &str) -> Result<Vec<CuratedEntry>> {
    let items: Vec<Value> = serde_json::from_str(raw)?;
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<CuratedEntry>(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping malformed curated entry #{}: {}", idx, e);
                None
            }
        })
        .collect())
}

/// Turn curated entries into matches and seed detail slots for those with innings.
pub fn inject(entries: &[CuratedEntry], cache: &ResilientCache) -> Vec<Match> {
    entries
        .iter()
        .filter_map(|entry| {
            let sport = match entry.sport.as_deref() {
                None => Sport::Cricket,
                Some(label) => match Sport::from_label(label) {
                    Some(sport) => sport,
                    None => {
                        warn!("Skipping curated match {}: unknown sport {:?}", entry.match_id, label);
                        return None;
                    }
                },
            };
            if let Some(detail) = scorecard(entry) {
                cache.put_detail(&detail);
            }
            Some(to_match(entry, sport))
        })
        .collect()
}

fn scorecard(entry: &CuratedEntry) -> Option<MatchDetail> {
    let innings = &entry.details.as_ref()?.innings;
    if innings.is_empty() {
        return None;
    }
    let data: Vec<Value> = innings
        .iter()
        .enumerate()
        .map(|(idx, inn)| {
            json!({
                "team": inn.team,
                "batting": inn.batting,
                "bowling": inn.bowling,
                "inning": inn.inning.clone().unwrap_or_else(|| format!("Inning {}", idx + 1)),
            })
        })
        .collect();
    Some(MatchDetail {
        match_id: entry.match_id.clone(),
        source: DetailSource::Custom,
        data: json!({ "status": "success", "data": data }),
        fetched_at: Utc::now(),
    })
}

fn to_match(entry: &CuratedEntry, sport: Sport) -> Match {
    let teams: Option<[String; 2]> = match entry.teams.as_slice() {
        [home, away] => Some([home.clone(), away.clone()]),
        _ => None,
    };
    let name = entry
        .match_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| teams.as_ref().map(|[h, a]| format!("{} vs {}", h, a)))
        .unwrap_or_else(|| entry.match_id.clone());
    let mut status = entry.status.clone();
    if sport == Sport::Basketball && status.eq_ignore_ascii_case("completed") {
        status = "Finished".to_string();
    }

    let score = match sport {
        Sport::Cricket => cricket_score(entry, teams.as_ref()),
        _ => team_sport_score(sport, entry.score.as_ref(), teams.as_ref()),
    };

    Match {
        id: entry.match_id.clone(),
        sport,
        name,
        league: entry
            .league
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| sport.default_league().to_string()),
        series: None,
        series_id: (sport == Sport::Cricket).then(|| CURATED_SERIES_ID.to_string()),
        venue: entry.venue.clone().unwrap_or_else(|| "TBD".to_string()),
        date: entry.date.as_deref().and_then(parse_event_date),
        status,
        match_started: None,
        match_ended: None,
        score,
        is_custom: true,
        state: Default::default(),
        sort_score: 0,
        teams,
    }
}

/// Latest matching inning per team; a team with no inning scores zero.
fn cricket_score(entry: &CuratedEntry, teams: Option<&[String; 2]>) -> Vec<TeamScore> {
    let innings = entry
        .details
        .as_ref()
        .map(|d| d.innings.as_slice())
        .unwrap_or_default();
    match teams {
        Some(teams) if !innings.is_empty() => teams
            .iter()
            .map(|team| {
                let team_lc = team.to_lowercase();
                innings
                    .iter()
                    .rev()
                    .find(|inn| {
                        inn.team.as_deref().is_some_and(|t| {
                            let t = t.to_lowercase();
                            !t.is_empty() && (t == team_lc || team_lc.contains(&t))
                        })
                    })
                    .map(inning_line)
                    .unwrap_or_else(TeamScore::cricket_zero)
            })
            .collect(),
        _ => {
            let lines: Vec<TeamScore> = match &entry.score {
                Some(Value::Array(items)) => items.iter().filter_map(score_line).collect(),
                Some(other) => score_line(other).into_iter().collect(),
                None => Vec::new(),
            };
            align_to_teams(lines, teams)
        }
    }
}

fn inning_line(inn: &CuratedInning) -> TeamScore {
    let inning = inn.inning.clone();
    match inn.score.as_deref() {
        Some(summary) => match TeamScore::cricket_from_summary(summary, inning) {
            TeamScore::Cricket {
                runs,
                wickets,
                overs,
                inning,
            } => TeamScore::Cricket {
                runs: runs.or(inn.r),
                wickets: wickets.or(inn.w),
                overs: overs.or(inn.o),
                inning,
            },
            other => other,
        },
        None => TeamScore::Cricket {
            runs: Some(inn.r.unwrap_or(0)),
            wickets: inn.w,
            overs: inn.o,
            inning,
        },
    }
}

/// `{home, away}` totals plus per-segment `{h, a}` lists; absent totals are zero.
fn team_sport_score(sport: Sport, score: Option<&Value>, teams: Option<&[String; 2]>) -> Vec<TeamScore> {
    let Some(score) = score else {
        return Vec::new();
    };
    let (home, away) = match teams {
        Some([h, a]) => (h.clone(), a.clone()),
        None => ("Home".to_string(), "Away".to_string()),
    };
    let segment = |list: &str, idx: usize, side: &str| -> Option<u32> {
        num(&score[list][idx][side]).or_else(|| num(&score[format!("q{}", idx + 1)][side]))
    };
    let total = |side: &str| num(&score[side]).or(Some(0));

    match sport {
        Sport::Basketball => vec![
            TeamScore::Basketball {
                team: home,
                points: total("home"),
                q1: segment("quarters", 0, "h"),
                q2: segment("quarters", 1, "h"),
                q3: segment("quarters", 2, "h"),
                q4: segment("quarters", 3, "h"),
            },
            TeamScore::Basketball {
                team: away,
                points: total("away"),
                q1: segment("quarters", 0, "a"),
                q2: segment("quarters", 1, "a"),
                q3: segment("quarters", 2, "a"),
                q4: segment("quarters", 3, "a"),
            },
        ],
        Sport::Football => vec![
            TeamScore::Football {
                team: home,
                goals: total("home"),
                halftime: num(&score["halftime"]["h"]),
            },
            TeamScore::Football {
                team: away,
                goals: total("away"),
                halftime: num(&score["halftime"]["a"]),
            },
        ],
        Sport::Hockey => vec![
            TeamScore::Hockey {
                team: home,
                goals: total("home"),
                period1: segment("periods", 0, "h"),
                period2: segment("periods", 1, "h"),
                period3: segment("periods", 2, "h"),
                period4: segment("periods", 3, "h"),
            },
            TeamScore::Hockey {
                team: away,
                goals: total("away"),
                period1: segment("periods", 0, "a"),
                period2: segment("periods", 1, "a"),
                period3: segment("periods", 2, "a"),
                period4: segment("periods", 3, "a"),
            },
        ],
        Sport::Cricket => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::sync::Arc;

    fn cache() -> ResilientCache {
        ResilientCache::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn entries(json: &str) -> Vec<CuratedEntry> {
        parse_entries(json).unwrap()
    }

    const TEST_MATCH: &str = r#"[{
        "matchId": "custom-ind-eng-1",
        "matchName": "India vs England, 1st Test",
        "teams": ["India", "England"],
        "status": "India won by an innings and 64 runs",
        "venue": "Dharamsala",
        "date": "2024-03-09T04:00:00Z",
        "league": "International",
        "details": {"innings": [
            {"team": "England", "score": "218", "inning": "England 1st Innings", "batting": [{"name": "Crawley", "r": 79}]},
            {"team": "India", "score": "477", "inning": "India 1st Innings"},
            {"team": "England", "score": "195", "o": 48.1, "inning": "England 2nd Innings"}
        ]}
    }]"#;

    #[test]
    fn test_cricket_uses_latest_inning_per_team() {
        let cache = cache();
        let matches = inject(&entries(TEST_MATCH), &cache);
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert!(m.is_custom);
        assert_eq!(m.sport, Sport::Cricket);
        assert_eq!(m.series_id.as_deref(), Some(CURATED_SERIES_ID));
        assert_eq!(
            m.score,
            vec![
                TeamScore::Cricket {
                    runs: Some(477),
                    wickets: None,
                    overs: None,
                    inning: Some("India 1st Innings".into())
                },
                TeamScore::Cricket {
                    runs: Some(195),
                    wickets: None,
                    overs: Some(48.1),
                    inning: Some("England 2nd Innings".into())
                },
            ]
        );
    }

    #[test]
    fn test_detail_slot_is_seeded() {
        let cache = cache();
        inject(&entries(TEST_MATCH), &cache);
        let detail = cache.get_detail("custom-ind-eng-1").unwrap();
        assert_eq!(detail.source, DetailSource::Custom);
        assert_eq!(detail.data["status"], "success");
        assert_eq!(detail.data["data"][0]["batting"][0]["name"], "Crawley");
        assert_eq!(detail.data["data"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_unmatched_team_scores_zero() {
        let json = r#"[{
            "matchId": "custom-2",
            "teams": ["Mumbai", "Delhi"],
            "status": "Mumbai batting",
            "details": {"innings": [{"team": "Mumbai", "score": "120/3 (20)"}]}
        }]"#;
        let matches = inject(&entries(json), &cache());
        assert_eq!(matches[0].name, "Mumbai vs Delhi");
        assert_eq!(matches[0].score[1], TeamScore::cricket_zero());
    }

    #[test]
    fn test_basketball_entry() {
        let json = r#"[{
            "matchId": "custom-bb-1",
            "sport": "Basketball",
            "teams": ["Lakers", "Celtics"],
            "status": "Completed",
            "score": {"home": 101, "away": 99, "quarters": [{"h": 25, "a": 20}, {"h": 30, "a": 29}]}
        }]"#;
        let matches = inject(&entries(json), &cache());
        let m = &matches[0];
        assert_eq!(m.status, "Finished");
        assert_eq!(m.league, "NBA");
        assert!(m.series_id.is_none());
        assert_eq!(
            m.score[1],
            TeamScore::Basketball {
                team: "Celtics".into(),
                points: Some(99),
                q1: Some(20),
                q2: Some(29),
                q3: None,
                q4: None
            }
        );
    }

    #[test]
    fn test_unknown_sport_is_skipped() {
        let json = r#"[{"matchId": "custom-x", "sport": "curling", "teams": ["A", "B"]}]"#;
        assert!(inject(&entries(json), &cache()).is_empty());
    }

    #[test]
    fn test_malformed_entry_does_not_drop_the_rest() {
        let json = r#"[
            {"matchId": "good-1", "teams": ["India", "Pakistan"], "status": "Live"},
            {"matchId": "bad-2", "teams": ["Kenya", "Oman"], "status": null}
        ]"#;
        let parsed = entries(json);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].match_id, "good-1");
        assert!(parse_entries(r#"{"matchId": "not-a-list"}"#).is_err());
    }

    #[test]
    fn test_inning_numbers_accept_strings() {
        let json = r#"[{
            "matchId": "custom-3",
            "teams": ["India", "England"],
            "status": "England batting",
            "details": {"innings": [
                {"team": "India", "r": "389", "w": "10", "o": "96.2"},
                {"team": "England", "r": 120, "w": 3}
            ]}
        }]"#;
        let matches = inject(&entries(json), &cache());
        assert_eq!(
            matches[0].score[0],
            TeamScore::Cricket {
                runs: Some(389),
                wickets: Some(10),
                overs: Some(96.2),
                inning: None
            }
        );
        assert_eq!(
            matches[0].score[1],
            TeamScore::Cricket {
                runs: Some(120),
                wickets: Some(3),
                overs: None,
                inning: None
            }
        );
    }
}
