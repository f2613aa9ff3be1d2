use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::classifier::{is_blank, is_recent_result};
use super::keywords::KeywordTables;
use crate::db::models::{Match, PlayState, Sport};

pub const LEAGUE_RECENT_CAP: usize = 10;
pub const SPORT_RECENT_CAP: usize = 5;
pub const OVERALL_RECENT_CAP: usize = 6;
pub const SEARCH_LIMIT: usize = 6;

// ── League catalog ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueEntry {
    pub name: String,
    pub sport: Sport,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueCatalog {
    pub leagues: Vec<LeagueEntry>,
}

impl Default for LeagueCatalog {
    fn default() -> Self {
        let entries: [(Sport, &str, &[&str]); 4] = [
            (
                Sport::Football,
                "⚽",
                &["Premier League", "La Liga", "AFC Women's Super League", "Frauen-Bundesliga"],
            ),
            (
                Sport::Basketball,
                "🏀",
                &["NBA", "Euro League", "NCAA College Basketball"],
            ),
            (
                Sport::Hockey,
                "🏒",
                &["FIH Hockey Pro League", "Hockey India League (Women)"],
            ),
            (Sport::Cricket, "🏏", &["IPL", "ICC"]),
        ];
        let leagues = entries
            .iter()
            .flat_map(|(sport, icon, names)| {
                names.iter().map(move |name| LeagueEntry {
                    name: name.to_string(),
                    sport: *sport,
                    icon: icon.to_string(),
                })
            })
            .collect();
        LeagueCatalog { leagues }
    }
}

impl LeagueCatalog {
    /// Load a catalog from a JSON file, or the built-in one when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(LeagueCatalog::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read league catalog from {}", path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse league catalog in {}", path))
    }
}

impl LeagueEntry {
    /// Loose membership test. Providers spell league names inconsistently
    /// ("NBA" vs "National Basketball Association - NBA", "LaLiga").
    pub fn matches(&self, m: &Match) -> bool {
        if m.sport != self.sport {
            return false;
        }
        let name = self.name.to_lowercase();
        let squashed: String = name.split_whitespace().collect();
        let league = m.league_label().to_lowercase();
        let title = m.name.to_lowercase();
        let series = m.series.as_deref().unwrap_or_default().to_lowercase();

        league.contains(&name)
            || league.contains(&squashed)
            || title.contains(&name)
            || (!series.is_empty() && series.contains(&name))
            || name
                .split_whitespace()
                .filter(|token| token.chars().count() >= 3)
                .any(|token| league.contains(token) || title.contains(token))
    }
}

// ── Organized view ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct SportBuckets {
    pub live: Vec<Match>,
    pub recent: Vec<Match>,
    pub all: Vec<Match>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeagueBuckets {
    pub sport: Sport,
    pub icon: String,
    pub live: Vec<Match>,
    pub recent: Vec<Match>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Organized {
    pub per_sport: BTreeMap<Sport, SportBuckets>,
    pub per_league: BTreeMap<String, LeagueBuckets>,
    pub live: Vec<Match>,
    pub recent: Vec<Match>,
}

impl Organized {
    /// Trim every recent list to `cap` entries for display.
    pub fn cap_recent(mut self, cap: usize) -> Self {
        self.recent.truncate(cap);
        for buckets in self.per_league.values_mut() {
            buckets.recent.truncate(cap);
        }
        for buckets in self.per_sport.values_mut() {
            buckets.recent.truncate(cap);
        }
        self
    }
}

fn is_live(m: &Match) -> bool {
    m.state == PlayState::Live && !is_blank(m)
}

/// Recent results: date desc, scored before unscored at the same instant, then id.
fn sort_recent(matches: &mut [Match]) {
    matches.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.has_score().cmp(&a.has_score()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Bucket an already classified and ranked stream.
pub fn organize(
    sorted: &[Match],
    catalog: &LeagueCatalog,
    tables: &KeywordTables,
    now: DateTime<Utc>,
) -> Organized {
    let live: Vec<Match> = sorted.iter().filter(|m| is_live(m)).cloned().collect();
    let mut recent: Vec<Match> = sorted
        .iter()
        .filter(|m| is_recent_result(m, now, tables))
        .cloned()
        .collect();
    sort_recent(&mut recent);

    let per_sport = Sport::ALL
        .iter()
        .map(|sport| {
            let in_sport = |m: &&Match| m.sport == *sport;
            let buckets = SportBuckets {
                live: live.iter().filter(in_sport).cloned().collect(),
                recent: recent
                    .iter()
                    .filter(in_sport)
                    .take(SPORT_RECENT_CAP)
                    .cloned()
                    .collect(),
                all: sorted.iter().filter(in_sport).cloned().collect(),
            };
            (*sport, buckets)
        })
        .collect();

    let mut per_league = BTreeMap::new();
    for entry in &catalog.leagues {
        let league_live: Vec<Match> = live.iter().filter(|m| entry.matches(m)).cloned().collect();
        let league_recent: Vec<Match> = recent
            .iter()
            .filter(|m| entry.matches(m))
            .take(LEAGUE_RECENT_CAP)
            .cloned()
            .collect();
        if league_live.is_empty() && league_recent.is_empty() {
            continue;
        }
        per_league.insert(
            entry.name.clone(),
            LeagueBuckets {
                sport: entry.sport,
                icon: entry.icon.clone(),
                live: league_live,
                recent: league_recent,
            },
        );
    }

    recent.truncate(OVERALL_RECENT_CAP);
    Organized {
        per_sport,
        per_league,
        live,
        recent,
    }
}

/// Live-only search over name, teams, status, venue and league.
pub fn search(matches: &[Match], query: &str) -> Vec<Match> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    matches
        .iter()
        .filter(|m| is_live(m) && m.has_score())
        .filter(|m| {
            let teams = m
                .teams
                .as_ref()
                .map(|[home, away]| format!("{} {}", home, away))
                .unwrap_or_default();
            [m.name.as_str(), teams.as_str(), m.status.as_str(), m.venue.as_str(), m.league.as_str()]
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
        })
        .take(SEARCH_LIMIT)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TeamScore;
    use crate::engine::{classifier::classify, ranking::rank};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 18, 0, 0).unwrap()
    }

    fn prepared(mut matches: Vec<Match>) -> Vec<Match> {
        let tables = KeywordTables::default();
        for m in matches.iter_mut() {
            m.state = classify(m, now(), &tables);
        }
        rank(&mut matches, &tables);
        matches
    }

    fn basketball(id: &str, status: &str, points: Option<u32>) -> Match {
        let mut m = Match::new(Sport::Basketball, id, "Lakers", "Celtics");
        m.status = status.into();
        m.date = Some(now() - Duration::hours(1));
        m.score = vec![TeamScore::Basketball {
            team: "Lakers".into(),
            points,
            q1: None,
            q2: None,
            q3: None,
            q4: None,
        }];
        m
    }

    #[test]
    fn test_league_membership_strategies() {
        let nba = LeagueEntry {
            name: "NBA".into(),
            sport: Sport::Basketball,
            icon: "🏀".into(),
        };
        let mut m = Match::new(Sport::Basketball, "bb-1", "Lakers", "Celtics");
        m.league = "National Basketball Association - NBA".into();
        assert!(nba.matches(&m));

        let laliga = LeagueEntry {
            name: "La Liga".into(),
            sport: Sport::Football,
            icon: "⚽".into(),
        };
        let mut f = Match::new(Sport::Football, "fb-1", "Real Madrid", "Girona");
        f.league = "LaLiga".into();
        assert!(laliga.matches(&f));

        let mut wrong_sport = Match::new(Sport::Hockey, "hk-1", "A", "B");
        wrong_sport.league = "NBA".into();
        assert!(!nba.matches(&wrong_sport));
    }

    #[test]
    fn test_each_match_lands_in_one_league_bucket() {
        let matches = prepared(vec![
            basketball("bb-1", "Q3", Some(80)),
            basketball("bb-2", "Game Finished", Some(110)),
            basketball("bb-3", "NS", None),
        ]);
        let organized = organize(&matches, &LeagueCatalog::default(), &KeywordTables::default(), now());

        let nba = &organized.per_league["NBA"];
        let live: Vec<&str> = nba.live.iter().map(|m| m.id.as_str()).collect();
        let recent: Vec<&str> = nba.recent.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(live, vec!["bb-1"]);
        assert_eq!(recent, vec!["bb-2"]);
        assert_eq!(organized.per_sport[&Sport::Basketball].all.len(), 3);
    }

    #[test]
    fn test_empty_leagues_are_omitted() {
        let matches = prepared(vec![basketball("bb-1", "Q3", Some(80))]);
        let organized = organize(&matches, &LeagueCatalog::default(), &KeywordTables::default(), now());
        assert!(organized.per_league.contains_key("NBA"));
        assert!(!organized.per_league.contains_key("IPL"));
        assert!(!organized.per_league.contains_key("Premier League"));
    }

    #[test]
    fn test_recent_caps() {
        let matches = prepared(
            (0..12)
                .map(|i| {
                    let mut m = basketball(&format!("bb-{:02}", i), "Game Finished", Some(100 + i));
                    m.date = Some(now() - Duration::hours(i as i64 + 1));
                    m
                })
                .collect(),
        );
        let organized = organize(&matches, &LeagueCatalog::default(), &KeywordTables::default(), now());
        assert_eq!(organized.per_league["NBA"].recent.len(), LEAGUE_RECENT_CAP);
        assert_eq!(organized.per_sport[&Sport::Basketball].recent.len(), SPORT_RECENT_CAP);
        assert_eq!(organized.recent.len(), OVERALL_RECENT_CAP);
        assert_eq!(organized.recent[0].id, "bb-00");

        let display = organized.cap_recent(5);
        assert_eq!(display.per_league["NBA"].recent.len(), 5);
    }

    #[test]
    fn test_search_only_returns_scored_live_matches() {
        let matches = prepared(vec![
            basketball("bb-1", "Q3", Some(80)),
            basketball("bb-2", "Game Finished", Some(110)),
            basketball("bb-3", "Q1", None),
        ]);
        let hits = search(&matches, "lakers");
        let ids: Vec<&str> = hits.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["bb-1"]);
        assert!(search(&matches, "   ").is_empty());
    }
}
