//! Status and competition vocabularies used by the classifier and scorer.
//!
//! Providers word their statuses differently ("Match Finished", "FT",
//! "Team A won by 5 wkts", "Q3", "Bad light stopped play"), so the tables are
//! plain data: the defaults below can be overridden by a JSON file passed via
//! `--keywords-path` without touching the rule code. Fields missing from the
//! file keep their defaults.
//!
//! Two kinds of entries exist:
//! - **phrases** are matched as substrings of the lowercased status;
//! - **codes** are matched against whole status tokens, so a short code like
//!   `ft` does not fire inside "left" or "after".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::models::Sport;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTables {
    /// The match is over and a result stands.
    pub finished: Vec<String>,
    pub finished_codes: Vec<String>,
    /// The match will not be played as scheduled. Never live, never a result.
    pub void: Vec<String>,
    pub void_codes: Vec<String>,
    /// Provider explicitly says play has not begun.
    pub not_started: Vec<String>,
    pub not_started_codes: Vec<String>,
    /// Play is under way (including interruptions such as rain or breaks).
    pub live: Vec<String>,
    pub live_codes: Vec<String>,
    /// Wording that marks a definitive result, for the ranking bonus.
    pub result: Vec<String>,
    /// Major competitions per sport, matched against name, series and league.
    pub major: BTreeMap<Sport, Vec<String>>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for KeywordTables {
    fn default() -> Self {
        let mut major = BTreeMap::new();
        major.insert(
            Sport::Cricket,
            owned(&[
                "ipl", "indian premier league", "icc", "world cup", "champions trophy",
                "championship", "t20i", "t20 international", "odi", "test", "test match",
                "asia cup", "european cricket", "cpl", "bbl", "psl", "bilateral",
                "international", "tri-series", "women", "ranji", "vijay hazare",
                "syed mushtaq", "duleep", "deodhar", "irani", "india a", "india b", "tnpl",
                "maharaja", "trophy",
            ]),
        );
        major.insert(
            Sport::Football,
            owned(&[
                "premier league", "la liga", "bundesliga", "serie a", "ligue 1",
                "champions league", "europa league", "fa cup", "euro", "world cup",
            ]),
        );
        major.insert(
            Sport::Basketball,
            owned(&["nba", "euroleague", "euro league", "ncaa"]),
        );
        major.insert(
            Sport::Hockey,
            owned(&["nhl", "fih", "pro league", "hockey india"]),
        );

        KeywordTables {
            finished: owned(&[
                "finished", "completed", "ended", "final", "result", "won by", "lost by",
                "tied", "drawn", "abandoned", "full time", "full-time", "closed",
                "after over time", "after overtime", "after penalties", "after extra time",
            ]),
            finished_codes: owned(&["ft", "aet", "pen", "aot", "ap", "awd", "wo", "abd"]),
            void: owned(&["postponed", "cancelled", "canceled", "suspended"]),
            void_codes: owned(&["pst", "post", "canc", "susp"]),
            not_started: owned(&["scheduled", "not started", "time to be defined", "match starts"]),
            not_started_codes: owned(&["ns", "tbd"]),
            live: owned(&[
                "live", "in progress", "in play", "ongoing", "started", "playing",
                "innings", "inning", "batting", "bowling", "opt to", "elected to",
                "chosen to", "toss", "stumps", "break", "delay", "rain", "bad light",
                "quarter", "period", "first half", "second half", "halftime", "half time",
                "overtime", "over time", "extra time",
                "penalty shootout", "1st", "2nd", "3rd", "4th",
            ]),
            live_codes: owned(&[
                "q1", "q2", "q3", "q4", "ot", "bt", "ht", "1h", "2h", "et", "p", "p1", "p2",
                "p3", "pt", "int",
            ]),
            result: owned(&[
                "finished", "completed", "ended", "result", "won by", "lost by", "full time",
            ]),
            major,
        }
    }
}

impl KeywordTables {
    /// Load overrides from a JSON file, or the built-in tables when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(KeywordTables::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword tables from {}", path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse keyword tables in {}", path))
    }

    /// `status` must already be lowercased.
    pub fn is_finished(&self, status: &str) -> bool {
        contains_any(status, &self.finished) || has_code(status, &self.finished_codes)
    }

    pub fn is_void(&self, status: &str) -> bool {
        contains_any(status, &self.void) || has_code(status, &self.void_codes)
    }

    pub fn is_not_started(&self, status: &str) -> bool {
        contains_any(status, &self.not_started) || has_code(status, &self.not_started_codes)
    }

    pub fn is_live_text(&self, status: &str) -> bool {
        contains_any(status, &self.live) || has_code(status, &self.live_codes)
    }

    pub fn has_result_keyword(&self, status: &str) -> bool {
        contains_any(status, &self.result) || has_code(status, &self.finished_codes)
    }

    /// `text` is any lowercased mix of name, series and league.
    pub fn is_major(&self, sport: Sport, text: &str) -> bool {
        self.major
            .get(&sport)
            .is_some_and(|keywords| contains_any(text, keywords))
    }
}

fn contains_any(text: &str, phrases: &[String]) -> bool {
    phrases
        .iter()
        .any(|p| !p.is_empty() && text.contains(p.as_str()))
}

fn has_code(text: &str, codes: &[String]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .any(|token| codes.iter().any(|c| c == token))
}
