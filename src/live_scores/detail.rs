use chrono::Utc;
use tracing::{debug, warn};

use super::provider::FetchError;
use super::Aggregator;
use crate::db::models::{DetailSource, MatchDetail, Sport};

/// Failures surfaced by the match-detail lookup.
#[derive(Debug, thiserror::Error)]
pub enum DetailError {
    #[error("API daily limit exceeded ({0}). Please try again tomorrow or upgrade your API plan.")]
    QuotaExceeded(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Transport(String),
}

impl Aggregator {
    /// Scorecard / box score for one match.
    ///
    /// The cache is consulted first, so curated matches and completed matches
    /// already looked up never touch the network. A fresh provider result is
    /// cached only when `known_status` says the match is over.
    pub async fn fetch_match_detail(
        &self,
        match_id: &str,
        known_status: Option<&str>,
    ) -> Result<Option<MatchDetail>, DetailError> {
        if let Some(detail) = self.cache.get_detail(match_id) {
            debug!("Detail for {} served from cache", match_id);
            return Ok(Some(detail));
        }

        let Some(sport) = Sport::from_match_id(match_id) else {
            debug!("No provider owns match id {}", match_id);
            return Ok(None);
        };
        let Some(provider) = self.provider_for(sport) else {
            return Ok(None);
        };
        let raw_id = &match_id[sport.id_prefix().len() + 1..];

        let data = match provider.fetch_detail(raw_id).await {
            Ok(Some(data)) => data,
            Ok(None) | Err(FetchError::NotFound(_)) => return Ok(None),
            Err(FetchError::RateLimited(msg)) => {
                warn!("{} quota exhausted fetching {}: {}", provider.name(), match_id, msg);
                return Err(DetailError::QuotaExceeded(msg));
            }
            Err(FetchError::Transport(e)) => return Err(DetailError::Transport(e.to_string())),
            Err(other) => return Err(DetailError::Provider(other.to_string())),
        };

        let detail = MatchDetail {
            match_id: match_id.to_string(),
            source: DetailSource::Provider,
            data,
            fetched_at: Utc::now(),
        };
        let finished = known_status
            .map(|s| self.tables.is_finished(&s.trim().to_lowercase()))
            .unwrap_or(false);
        if finished {
            self.cache.put_detail(&detail);
        }
        Ok(Some(detail))
    }
}
