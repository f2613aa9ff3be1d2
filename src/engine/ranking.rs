use std::collections::HashMap;

use super::keywords::KeywordTables;
use crate::db::models::{Match, PlayState};

pub const CURATED_BONUS: i64 = 2000;
pub const LIVE_BONUS: i64 = 1000;
pub const MAJOR_COMPETITION_BONUS: i64 = 500;
pub const SERIES_BONUS: i64 = 100;
pub const RESULT_BONUS: i64 = 50;

/// Collapse duplicate ids. The last occurrence wins but keeps the position
/// of the first, so the output never contains the same id twice.
pub fn dedupe(matches: Vec<Match>) -> Vec<Match> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(matches.len());
    let mut out: Vec<Match> = Vec::with_capacity(matches.len());
    for m in matches {
        match slots.get(&m.id) {
            Some(&idx) => out[idx] = m,
            None => {
                slots.insert(m.id.clone(), out.len());
                out.push(m);
            }
        }
    }
    out
}

/// Priority of a classified match. Bonuses are additive.
pub fn score(m: &Match, tables: &KeywordTables) -> i64 {
    let mut total = 0;
    if m.is_custom {
        total += CURATED_BONUS;
    }
    if m.state == PlayState::Live {
        total += LIVE_BONUS;
    }
    let text = format!(
        "{} {} {}",
        m.name,
        m.series.as_deref().unwrap_or_default(),
        m.league
    )
    .to_lowercase();
    if tables.is_major(m.sport, &text) {
        total += MAJOR_COMPETITION_BONUS;
    }
    if m.series_id.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        total += SERIES_BONUS;
    }
    if m.state == PlayState::Completed && tables.has_result_keyword(&m.status_lower()) {
        total += RESULT_BONUS;
    }
    total
}

/// Score every match and sort: score desc, date desc (undated last), id asc.
pub fn rank(matches: &mut [Match], tables: &KeywordTables) {
    for m in matches.iter_mut() {
        m.sort_score = score(m, tables);
    }
    matches.sort_by(|a, b| {
        b.sort_score
            .cmp(&a.sort_score)
            .then_with(|| b.date.cmp(&a.date))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Sport;
    use chrono::{TimeZone, Utc};

    fn ids(matches: &[Match]) -> Vec<&str> {
        matches.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_dedupe_last_wins_first_position() {
        let mut a2 = Match::new(Sport::Basketball, "bb-1", "Lakers", "Celtics");
        a2.status = "Q4".into();
        let input = vec![
            Match::new(Sport::Basketball, "bb-1", "Lakers", "Celtics"),
            Match::new(Sport::Basketball, "bb-2", "Heat", "Knicks"),
            a2,
        ];
        let out = dedupe(input);
        assert_eq!(ids(&out), vec!["bb-1", "bb-2"]);
        assert_eq!(out[0].status, "Q4");
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let input = vec![
            Match::new(Sport::Hockey, "hk-3", "A", "B"),
            Match::new(Sport::Hockey, "hk-1", "C", "D"),
            Match::new(Sport::Hockey, "hk-3", "A", "B"),
        ];
        let once = dedupe(input);
        let twice = dedupe(once.clone());
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_curated_live_major_ordering() {
        let tables = KeywordTables::default();

        let mut curated = Match::new(Sport::Cricket, "custom-1", "Club XI", "Village XI");
        curated.is_custom = true;
        curated.state = PlayState::Completed;

        let mut live_major = Match::new(Sport::Football, "fb-1", "Arsenal", "Chelsea");
        live_major.league = "Premier League".into();
        live_major.state = PlayState::Live;

        let mut live_minor = Match::new(Sport::Football, "fb-2", "Ajax", "PSV");
        live_minor.league = "Eredivisie".into();
        live_minor.state = PlayState::Live;

        let mut done_major = Match::new(Sport::Football, "fb-3", "Spurs", "Everton");
        done_major.league = "Premier League".into();
        done_major.status = "Match Finished".into();
        done_major.state = PlayState::Completed;

        assert_eq!(score(&curated, &tables), 2000);
        assert_eq!(score(&live_major, &tables), 1500);
        assert_eq!(score(&live_minor, &tables), 1000);
        assert_eq!(score(&done_major, &tables), 550);

        let mut all = vec![done_major, live_minor, curated, live_major];
        rank(&mut all, &tables);
        assert_eq!(ids(&all), vec!["custom-1", "fb-1", "fb-2", "fb-3"]);
    }

    #[test]
    fn test_sort_tie_breaks_are_deterministic() {
        let tables = KeywordTables::default();
        let mut dated_old = Match::new(Sport::Hockey, "hk-b", "A", "B");
        dated_old.date = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut dated_new = Match::new(Sport::Hockey, "hk-c", "A", "B");
        dated_new.date = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let undated_z = Match::new(Sport::Hockey, "hk-z", "A", "B");
        let undated_a = Match::new(Sport::Hockey, "hk-a", "A", "B");

        let mut first = vec![undated_z.clone(), dated_old.clone(), undated_a.clone(), dated_new.clone()];
        let mut second = vec![dated_new, undated_a, dated_old, undated_z];
        rank(&mut first, &tables);
        rank(&mut second, &tables);

        assert_eq!(ids(&first), vec!["hk-c", "hk-b", "hk-a", "hk-z"]);
        assert_eq!(ids(&first), ids(&second));
    }
}
