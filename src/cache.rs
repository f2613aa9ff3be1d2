//! Resilient per-sport cache.
//!
//! Three kinds of entries live in the key-value store:
//!
//! - `recent:<sport>`: the top completed matches of the last good cycle.
//!   Served verbatim when a provider fails or returns nothing.
//! - `snapshot:<sport>`: the full processed result of the last good cycle.
//!   Only used to skip upstream calls for [`SNAPSHOT_TTL_SECS`].
//! - `detail:<id>`: scorecards of completed or curated matches. Never expire.
//!
//! Yesterday's provider results are held in memory for the life of the
//! process, so background refreshes do not refetch them.
//!
//! A store failure or an undecodable entry is logged and treated as a miss.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::db::models::{Match, MatchDetail, PlayState, Sport};
use crate::db::KeyValueStore;

/// Completed matches kept per sport as the outage fallback.
pub const FALLBACK_SIZE: usize = 5;

pub const SNAPSHOT_TTL_SECS: i64 = 120;

#[derive(Clone)]
pub struct ResilientCache {
    store: Arc<dyn KeyValueStore>,
    snapshot_ttl: Duration,
    yesterday: Arc<RwLock<HashMap<Sport, Vec<Match>>>>,
}

fn recent_key(sport: Sport) -> String {
    format!("recent:{}", sport)
}

fn snapshot_key(sport: Sport) -> String {
    format!("snapshot:{}", sport)
}

fn detail_key(match_id: &str) -> String {
    format!("detail:{}", match_id)
}

impl ResilientCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        ResilientCache {
            store,
            snapshot_ttl: Duration::seconds(SNAPSHOT_TTL_SECS),
            yesterday: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    // ── Fallback ─────────────────────────────────────────────────────

    /// Last known-good completed matches for a sport.
    pub fn get(&self, sport: Sport) -> Option<Vec<Match>> {
        self.read_json(&recent_key(sport)).map(|(matches, _)| matches)
    }

    /// Persist the top completed matches of a processed, sorted cycle.
    /// A cycle with no completed matches leaves the previous fallback alone.
    pub fn put(&self, sport: Sport, matches: &[Match]) {
        let completed: Vec<&Match> = matches
            .iter()
            .filter(|m| m.state == PlayState::Completed)
            .take(FALLBACK_SIZE)
            .collect();
        if completed.is_empty() {
            return;
        }
        self.write_json(&recent_key(sport), &completed, Utc::now());
    }

    // ── Short-lived snapshot ─────────────────────────────────────────

    pub fn get_snapshot(&self, sport: Sport, now: DateTime<Utc>) -> Option<Vec<Match>> {
        let (matches, updated_at) = self.read_json::<Vec<Match>>(&snapshot_key(sport))?;
        if now - updated_at > self.snapshot_ttl {
            debug!("Snapshot for {} expired", sport);
            return None;
        }
        Some(matches)
    }

    pub fn put_snapshot(&self, sport: Sport, matches: &[Match], now: DateTime<Utc>) {
        self.write_json(&snapshot_key(sport), &matches, now);
    }

    // ── Match details ────────────────────────────────────────────────

    pub fn get_detail(&self, match_id: &str) -> Option<MatchDetail> {
        self.read_json(&detail_key(match_id)).map(|(detail, _)| detail)
    }

    pub fn put_detail(&self, detail: &MatchDetail) {
        self.write_json(&detail_key(&detail.match_id), detail, detail.fetched_at);
    }

    // ── Yesterday (memory only) ──────────────────────────────────────

    pub async fn yesterday(&self, sport: Sport) -> Option<Vec<Match>> {
        self.yesterday.read().await.get(&sport).cloned()
    }

    pub async fn store_yesterday(&self, sport: Sport, matches: Vec<Match>) {
        self.yesterday.write().await.insert(sport, matches);
    }

    // ── Store access ─────────────────────────────────────────────────

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<(T, DateTime<Utc>)> {
        let stored = match self.store.get(key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {:#}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&stored.value) {
            Ok(value) => Some((value, stored.updated_at)),
            Err(e) => {
                warn!("Discarding malformed cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, updated_at: DateTime<Utc>) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode cache entry {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.put(key, &encoded, updated_at) {
            warn!("Cache write failed for {}: {:#}", key, e);
        }
    }
}
