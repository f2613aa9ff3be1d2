use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sports served by the aggregator. Each maps to exactly one upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Cricket,
    Basketball,
    Football,
    Hockey,
}

impl Sport {
    pub const ALL: [Sport; 4] = [
        Sport::Cricket,
        Sport::Basketball,
        Sport::Football,
        Sport::Hockey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Cricket => "cricket",
            Sport::Basketball => "basketball",
            Sport::Football => "football",
            Sport::Hockey => "hockey",
        }
    }

    /// Prefix used for provider match ids, e.g. `bb-1042`.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Sport::Cricket => "cr",
            Sport::Basketball => "bb",
            Sport::Football => "fb",
            Sport::Hockey => "hk",
        }
    }

    /// League label used when a provider gives no usable league name.
    pub fn default_league(&self) -> &'static str {
        match self {
            Sport::Cricket => "Cricket",
            Sport::Basketball => "NBA",
            Sport::Football => "Football",
            Sport::Hockey => "NHL",
        }
    }

    /// Case-insensitive parse of "cricket", "Basketball", ...
    pub fn from_label(label: &str) -> Option<Sport> {
        let label = label.trim().to_lowercase();
        Sport::ALL.into_iter().find(|s| s.as_str() == label)
    }

    /// Recover the sport from a provider-prefixed match id.
    pub fn from_match_id(id: &str) -> Option<Sport> {
        let (prefix, rest) = id.split_once('-')?;
        if rest.is_empty() {
            return None;
        }
        Sport::ALL.into_iter().find(|s| s.id_prefix() == prefix)
    }

    pub fn provider_id(&self, raw_id: &str) -> String {
        format!("{}-{}", self.id_prefix(), raw_id)
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Play state assigned by the classifier for one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Scheduled,
    Live,
    Completed,
    #[default]
    Indeterminate,
}

/// Per-team score. Field names follow each provider family's conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TeamScore {
    Cricket {
        #[serde(rename = "r")]
        runs: Option<u32>,
        #[serde(rename = "w")]
        wickets: Option<u32>,
        #[serde(rename = "o")]
        overs: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inning: Option<String>,
    },
    Basketball {
        team: String,
        points: Option<u32>,
        q1: Option<u32>,
        q2: Option<u32>,
        q3: Option<u32>,
        q4: Option<u32>,
    },
    Football {
        team: String,
        goals: Option<u32>,
        halftime: Option<u32>,
    },
    Hockey {
        team: String,
        goals: Option<u32>,
        period1: Option<u32>,
        period2: Option<u32>,
        period3: Option<u32>,
        period4: Option<u32>,
    },
}

impl TeamScore {
    /// A zeroed cricket line, used when a curated team has no inning data.
    pub fn cricket_zero() -> Self {
        TeamScore::Cricket {
            runs: Some(0),
            wickets: Some(0),
            overs: Some(0.0),
            inning: None,
        }
    }

    /// Parse a free-form cricket line such as `"120/3 (20)"` or `"540/8 dec"`.
    pub fn cricket_from_summary(summary: &str, inning: Option<String>) -> Self {
        let summary = summary.trim();
        let (head, overs) = match summary.split_once('(') {
            Some((h, rest)) => (
                h.trim(),
                rest.trim_end_matches(')').trim().parse::<f64>().ok(),
            ),
            None => (summary, None),
        };
        let mut parts = head.split('/');
        let runs = parts
            .next()
            .and_then(|r| r.trim().parse::<u32>().ok());
        let wickets = parts
            .next()
            .and_then(|w| w.split_whitespace().next())
            .and_then(|w| w.parse::<u32>().ok());
        TeamScore::Cricket {
            runs,
            wickets,
            overs,
            inning,
        }
    }

    /// True when the line carries the headline number (runs, points or goals).
    pub fn has_value(&self) -> bool {
        match self {
            TeamScore::Cricket { runs, .. } => runs.is_some(),
            TeamScore::Basketball { points, .. } => points.is_some(),
            TeamScore::Football { goals, .. } | TeamScore::Hockey { goals, .. } => {
                goals.is_some()
            }
        }
    }
}

/// The canonical match record every provider is normalized into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub sport: Sport,
    pub name: String,
    /// Home first. Never a single entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<[String; 2]>,
    #[serde(default)]
    pub league: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(default = "default_venue")]
    pub venue: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_started: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_ended: Option<bool>,
    #[serde(default)]
    pub score: Vec<TeamScore>,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub state: PlayState,
    /// Ranking score for the current cycle only.
    #[serde(skip)]
    pub sort_score: i64,
}

fn default_venue() -> String {
    "TBD".to_string()
}

impl Match {
    /// A bare match between two teams with sport defaults filled in.
    pub fn new(sport: Sport, id: impl Into<String>, home: &str, away: &str) -> Self {
        Match {
            id: id.into(),
            sport,
            name: format!("{} vs {}", home, away),
            teams: Some([home.to_string(), away.to_string()]),
            league: sport.default_league().to_string(),
            series: None,
            series_id: None,
            venue: default_venue(),
            date: None,
            status: String::new(),
            match_started: None,
            match_ended: None,
            score: Vec::new(),
            is_custom: false,
            state: PlayState::Indeterminate,
            sort_score: 0,
        }
    }

    /// True if at least one team line carries a score.
    pub fn has_score(&self) -> bool {
        self.score.iter().any(TeamScore::has_value)
    }

    pub fn league_label(&self) -> &str {
        if self.league.trim().is_empty() {
            self.sport.default_league()
        } else {
            &self.league
        }
    }

    pub fn status_lower(&self) -> String {
        self.status.trim().to_lowercase()
    }
}

/// Parse the timestamp shapes the providers emit. Naive values are taken as UTC.
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Where a cached match detail came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailSource {
    Custom,
    Provider,
}

/// Full scorecard / box score for one match. The payload stays schema-light.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDetail {
    pub match_id: String,
    pub source: DetailSource,
    pub data: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

/// Result of one fan-out cycle, grouped by sport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SportsMatches {
    pub cricket: Vec<Match>,
    pub basketball: Vec<Match>,
    pub football: Vec<Match>,
    pub hockey: Vec<Match>,
    pub all: Vec<Match>,
}

impl SportsMatches {
    /// Build from per-sport results; `all` concatenates in sport order.
    pub fn from_parts(parts: Vec<(Sport, Vec<Match>)>) -> Self {
        let mut out = SportsMatches::default();
        for (sport, matches) in parts {
            *out.slot_mut(sport) = matches;
        }
        out.all = Sport::ALL
            .iter()
            .flat_map(|s| out.for_sport(*s).iter().cloned())
            .collect();
        out
    }

    pub fn for_sport(&self, sport: Sport) -> &[Match] {
        match sport {
            Sport::Cricket => &self.cricket,
            Sport::Basketball => &self.basketball,
            Sport::Football => &self.football,
            Sport::Hockey => &self.hockey,
        }
    }

    fn slot_mut(&mut self, sport: Sport) -> &mut Vec<Match> {
        match sport {
            Sport::Cricket => &mut self.cricket,
            Sport::Basketball => &mut self.basketball,
            Sport::Football => &mut self.football,
            Sport::Hockey => &mut self.hockey,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    #[test]
    fn test_sport_from_match_id() {
        assert_eq!(Sport::from_match_id("bb-1042"), Some(Sport::Basketball));
        assert_eq!(Sport::from_match_id("fb-8831"), Some(Sport::Football));
        assert_eq!(Sport::from_match_id("custom-ind-aus"), None);
        assert_eq!(Sport::from_match_id("hk-"), None);
    }

    #[test]
    fn test_cricket_summary_parsing() {
        match TeamScore::cricket_from_summary("120/3 (20)", None) {
            TeamScore::Cricket { runs, wickets, overs, .. } => {
                assert_eq!(runs, Some(120));
                assert_eq!(wickets, Some(3));
                assert_relative_eq!(overs.unwrap(), 20.0);
            }
            other => panic!("unexpected score {:?}", other),
        }
        match TeamScore::cricket_from_summary("540/8 dec", None) {
            TeamScore::Cricket { runs, wickets, overs, .. } => {
                assert_eq!(runs, Some(540));
                assert_eq!(wickets, Some(8));
                assert!(overs.is_none());
            }
            other => panic!("unexpected score {:?}", other),
        }
    }

    #[test]
    fn test_parse_event_date_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_event_date("2024-03-01T09:30:00+00:00"), Some(expected));
        assert_eq!(parse_event_date("2024-03-01T09:30:00"), Some(expected));
        assert_eq!(
            parse_event_date("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_event_date("not a date"), None);
    }

    #[test]
    fn test_sort_score_is_never_serialized() {
        let mut m = Match::new(Sport::Football, "fb-1", "Arsenal", "Chelsea");
        m.sort_score = 1500;
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("sort_score").is_none());
        let back: Match = serde_json::from_value(json).unwrap();
        assert_eq!(back.sort_score, 0);
    }

    #[test]
    fn test_score_serializes_with_provider_field_names() {
        let s = TeamScore::cricket_from_summary("99/2", None);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["kind"], "cricket");
        assert_eq!(json["r"], 99);
        assert_eq!(json["w"], 2);
    }

    #[test]
    fn test_from_parts_builds_all_in_sport_order() {
        let parts = vec![
            (Sport::Hockey, vec![Match::new(Sport::Hockey, "hk-1", "A", "B")]),
            (Sport::Cricket, vec![Match::new(Sport::Cricket, "cr-1", "C", "D")]),
        ];
        let all = SportsMatches::from_parts(parts);
        let ids: Vec<&str> = all.all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["cr-1", "hk-1"]);
    }
}
