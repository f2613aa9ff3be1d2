pub mod api_sports;
pub mod basketball;
pub mod cricket;
pub mod curated;
pub mod detail;
pub mod football;
pub mod hockey;
pub mod provider;

pub use detail::DetailError;
pub use provider::MatchProvider;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ResilientCache;
use crate::db::models::{Match, PlayState, Sport, SportsMatches};
use crate::engine::{classify, dedupe, rank, KeywordTables};

/// The most recently published cycle result.
#[derive(Clone, Default)]
pub struct Published {
    pub cycle: u64,
    pub completed_at: Option<DateTime<Utc>>,
    pub matches: Arc<SportsMatches>,
}

/// Fans out to every sport provider, runs the processing pipeline and
/// publishes results, newest cycle wins.
pub struct Aggregator {
    providers: Vec<Arc<dyn MatchProvider>>,
    cache: Arc<ResilientCache>,
    curated: Vec<Match>,
    tables: Arc<KeywordTables>,
    provider_timeout: Duration,
    cycle_seq: AtomicU64,
    published: RwLock<Published>,
}

impl Aggregator {
    pub fn new(
        providers: Vec<Arc<dyn MatchProvider>>,
        cache: Arc<ResilientCache>,
        curated: Vec<Match>,
        tables: Arc<KeywordTables>,
        provider_timeout: Duration,
    ) -> Self {
        Aggregator {
            providers,
            cache,
            curated,
            tables,
            provider_timeout,
            cycle_seq: AtomicU64::new(0),
            published: RwLock::new(Published::default()),
        }
    }

    pub fn cache(&self) -> &ResilientCache {
        &self.cache
    }

    pub fn tables(&self) -> &KeywordTables {
        &self.tables
    }

    pub fn provider_for(&self, sport: Sport) -> Option<Arc<dyn MatchProvider>> {
        self.providers.iter().find(|p| p.sport() == sport).cloned()
    }

    // ── Fan-out ──────────────────────────────────────────────────────

    /// Fetch and process every sport concurrently. A failing sport falls
    /// back to its cached results and never affects the others.
    pub async fn fetch_all_sports_matches(&self, is_refresh: bool) -> SportsMatches {
        let now = Utc::now();
        let branches = Sport::ALL.iter().map(|sport| async move {
            let matches = self.fetch_sport(*sport, is_refresh, now).await;
            (*sport, matches)
        });
        let parts = futures_util::future::join_all(branches).await;
        SportsMatches::from_parts(parts)
    }

    async fn fetch_sport(&self, sport: Sport, is_refresh: bool, now: DateTime<Utc>) -> Vec<Match> {
        // Only background refreshes may short-circuit on the snapshot.
        if is_refresh {
            if let Some(snapshot) = self.cache.get_snapshot(sport, now) {
                debug!("Serving {} from short-term snapshot ({} matches)", sport, snapshot.len());
                return snapshot;
            }
        }

        let Some(provider) = self.provider_for(sport) else {
            return self.process(sport, Vec::new(), None, now);
        };

        let fetched =
            tokio::time::timeout(self.provider_timeout, self.fetch_windows(&provider, is_refresh, now))
                .await;
        let raw = match fetched {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!("Provider '{}' failed: {:#}", provider.name(), e);
                return self.fallback(sport, now);
            }
            Err(_) => {
                warn!(
                    "Provider '{}' timed out after {:?}",
                    provider.name(),
                    self.provider_timeout
                );
                return self.fallback(sport, now);
            }
        };

        let processed = self.process(sport, raw, provider.result_cap(), now);
        if processed.is_empty() {
            info!("No {} matches this cycle, serving cached results", sport);
            return self.fallback(sport, now);
        }
        self.cache.put(sport, &processed);
        self.cache.put_snapshot(sport, &processed, now);
        processed
    }

    /// Today's window is mandatory; yesterday's is fetched only when there is
    /// no cached copy or this is not a background refresh.
    async fn fetch_windows(
        &self,
        provider: &Arc<dyn MatchProvider>,
        is_refresh: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Match>> {
        let sport = provider.sport();
        let cached_yesterday = self.cache.yesterday(sport).await;
        let want_yesterday =
            provider.has_previous_day() && (!is_refresh || cached_yesterday.is_none());

        let (current, previous) = tokio::join!(provider.fetch_current(now), async {
            if want_yesterday {
                Some(provider.fetch_previous_day(now).await)
            } else {
                None
            }
        });

        let mut matches = current?;
        match previous {
            Some(Ok(fresh)) => {
                if !fresh.is_empty() {
                    self.cache.store_yesterday(sport, fresh.clone()).await;
                }
                matches.extend(fresh);
            }
            Some(Err(e)) => {
                warn!("Provider '{}' previous-day fetch failed: {:#}", provider.name(), e);
                matches.extend(cached_yesterday.unwrap_or_default());
            }
            None => matches.extend(cached_yesterday.unwrap_or_default()),
        }
        Ok(matches)
    }

    /// Curated matches for the sport, then the cached results they do not shadow.
    fn fallback(&self, sport: Sport, now: DateTime<Utc>) -> Vec<Match> {
        let mut matches = self.process(sport, Vec::new(), None, now);
        let cached = self.cache.get(sport).unwrap_or_default();
        matches.extend(
            cached
                .into_iter()
                .filter(|c| !self.curated.iter().any(|m| m.id == c.id)),
        );
        matches
    }

    /// Curated merge, dedupe, classify, rank, then keep matches worth showing.
    pub fn process(
        &self,
        sport: Sport,
        raw: Vec<Match>,
        cap: Option<usize>,
        now: DateTime<Utc>,
    ) -> Vec<Match> {
        let mut all: Vec<Match> = self
            .curated
            .iter()
            .filter(|m| m.sport == sport)
            .cloned()
            .collect();
        all.extend(raw);

        let mut all = dedupe(all);
        for m in all.iter_mut() {
            m.state = classify(m, now, &self.tables);
        }
        rank(&mut all, &self.tables);
        all.retain(|m| m.has_score() || m.state == PlayState::Live);
        if let Some(cap) = cap {
            all.truncate(cap);
        }
        all
    }

    // ── Cycles ───────────────────────────────────────────────────────

    /// Reserve the next cycle id.
    pub fn begin_cycle(&self) -> u64 {
        self.cycle_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run a reserved cycle to completion and try to publish it.
    pub async fn complete_cycle(&self, cycle: u64, is_refresh: bool) -> bool {
        let matches = self.fetch_all_sports_matches(is_refresh).await;
        info!(
            "Cycle {} fetched {} matches (cricket={}, basketball={}, football={}, hockey={})",
            cycle,
            matches.all.len(),
            matches.cricket.len(),
            matches.basketball.len(),
            matches.football.len(),
            matches.hockey.len()
        );
        self.publish(cycle, matches).await
    }

    pub async fn run_cycle(&self, is_refresh: bool) -> u64 {
        let cycle = self.begin_cycle();
        self.complete_cycle(cycle, is_refresh).await;
        cycle
    }

    /// Replace the published result unless a newer cycle already landed.
    pub async fn publish(&self, cycle: u64, matches: SportsMatches) -> bool {
        let mut published = self.published.write().await;
        if cycle <= published.cycle {
            debug!(
                "Discarding stale cycle {} (cycle {} already published)",
                cycle, published.cycle
            );
            return false;
        }
        *published = Published {
            cycle,
            completed_at: Some(Utc::now()),
            matches: Arc::new(matches),
        };
        true
    }

    pub async fn latest(&self) -> Published {
        self.published.read().await.clone()
    }
}

/// Spawns the background poller. The first tick fires immediately and does a
/// full load; later ticks are background refreshes.
pub fn start_poller(aggregator: Arc<Aggregator>, poll_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let names: Vec<&str> = aggregator.providers.iter().map(|p| p.name()).collect();
        info!(
            "Match poller started ({} providers: {:?}, interval={:?})",
            names.len(),
            names,
            poll_interval
        );

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut is_refresh = false;
        loop {
            interval.tick().await;
            aggregator.run_cycle(is_refresh).await;
            is_refresh = true;
        }
    })
}
