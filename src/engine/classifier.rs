//! Play-state classification.
//!
//! Rules are evaluated in order and the first one that applies wins. The
//! order encodes precedence: a terminal status beats everything, explicit
//! provider flags beat keyword guesses, and a start time in the future beats
//! live-sounding wording such as "toss" or "1st Test".

use chrono::{DateTime, Duration, Utc};

use super::keywords::KeywordTables;
use crate::db::models::{Match, PlayState};

/// A start time this far ahead means the match has not begun, whatever the status says.
pub const FUTURE_GRACE_MINUTES: i64 = 5;

/// Indeterminate matches older than this are not shown as recent results.
pub const RECENT_WINDOW_DAYS: i64 = 30;

struct Facts<'a> {
    m: &'a Match,
    status: String,
    now: DateTime<Utc>,
    tables: &'a KeywordTables,
}

type Rule = fn(&Facts) -> Option<PlayState>;

const RULES: [(&str, Rule); 5] = [
    ("terminal status", terminal_status),
    ("provider flags", provider_flags),
    ("not-started status", not_started_status),
    ("future start time", future_start),
    ("live wording", live_wording),
];

/// Assign a play state for this cycle.
pub fn classify(m: &Match, now: DateTime<Utc>, tables: &KeywordTables) -> PlayState {
    let facts = Facts {
        m,
        status: m.status_lower(),
        now,
        tables,
    };
    RULES
        .iter()
        .find_map(|(_, rule)| rule(&facts))
        .unwrap_or(PlayState::Indeterminate)
}

fn terminal_status(f: &Facts) -> Option<PlayState> {
    if f.tables.is_void(&f.status) {
        return Some(PlayState::Indeterminate);
    }
    f.tables
        .is_finished(&f.status)
        .then_some(PlayState::Completed)
}

fn provider_flags(f: &Facts) -> Option<PlayState> {
    match (f.m.match_started, f.m.match_ended) {
        (_, Some(true)) => Some(PlayState::Completed),
        (Some(true), Some(false)) if !f.tables.is_not_started(&f.status) => Some(PlayState::Live),
        (Some(false), _) => Some(PlayState::Scheduled),
        _ => None,
    }
}

fn not_started_status(f: &Facts) -> Option<PlayState> {
    f.tables
        .is_not_started(&f.status)
        .then_some(PlayState::Scheduled)
}

fn future_start(f: &Facts) -> Option<PlayState> {
    let date = f.m.date?;
    (date > f.now + Duration::minutes(FUTURE_GRACE_MINUTES)).then_some(PlayState::Scheduled)
}

fn live_wording(f: &Facts) -> Option<PlayState> {
    f.tables
        .is_live_text(&f.status)
        .then_some(PlayState::Live)
}

/// A blank match (no status, no score) never lands in a live or recent bucket.
pub fn is_blank(m: &Match) -> bool {
    m.status.trim().is_empty() && !m.has_score()
}

/// Whether an already-classified match belongs in the recent-results buckets.
pub fn is_recent_result(m: &Match, now: DateTime<Utc>, tables: &KeywordTables) -> bool {
    if is_blank(m) {
        return false;
    }
    match m.state {
        PlayState::Completed => true,
        PlayState::Indeterminate => {
            if tables.is_void(&m.status_lower()) || !m.has_score() {
                return false;
            }
            match m.date {
                None => true,
                Some(date) => date <= now && now - date <= Duration::days(RECENT_WINDOW_DAYS),
            }
        }
        PlayState::Live | PlayState::Scheduled => false,
    }
}
