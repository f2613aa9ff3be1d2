use clap::Parser;

use crate::live_scores::{basketball, cricket, football, hockey};

/// Multi-sport live score aggregator
#[derive(Parser, Debug, Clone)]
#[command(name = "multisport-scores", version, about)]
pub struct Config {
    /// JSON API listen address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8080")]
    pub api_addr: String,

    /// SQLite cache path (":memory:" keeps the cache in memory)
    #[arg(long, env = "CACHE_PATH", default_value = "multisport-cache.db")]
    pub cache_path: String,

    /// CricAPI base URL
    #[arg(long, env = "CRICKET_API_URL", default_value = cricket::DEFAULT_BASE_URL)]
    pub cricket_api_url: String,

    /// CricAPI key
    #[arg(long, env = "CRICKET_API_KEY")]
    pub cricket_api_key: Option<String>,

    /// Number of CricAPI `currentMatches` pages fetched per cycle (25 matches each)
    #[arg(long, env = "CRICKET_PAGES", default_value_t = cricket::DEFAULT_PAGES)]
    pub cricket_pages: usize,

    /// API-Sports key, shared by basketball, football and hockey
    #[arg(long, env = "API_SPORTS_KEY")]
    pub api_sports_key: Option<String>,

    /// API-Sports basketball base URL
    #[arg(long, env = "BASKETBALL_API_URL", default_value = basketball::DEFAULT_BASE_URL)]
    pub basketball_api_url: String,

    /// API-Sports basketball league id (12 = NBA)
    #[arg(long, env = "BASKETBALL_LEAGUE_ID", default_value_t = basketball::NBA_LEAGUE_ID)]
    pub basketball_league_id: u32,

    /// API-Sports football base URL
    #[arg(long, env = "FOOTBALL_API_URL", default_value = football::DEFAULT_BASE_URL)]
    pub football_api_url: String,

    /// API-Sports hockey base URL
    #[arg(long, env = "HOCKEY_API_URL", default_value = hockey::DEFAULT_BASE_URL)]
    pub hockey_api_url: String,

    /// Full fetch cycle interval in seconds
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "300")]
    pub poll_interval_secs: u64,

    /// Per-provider timeout in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "15")]
    pub provider_timeout_secs: u64,

    /// JSON file with operator-curated matches
    #[arg(long, env = "CUSTOM_MATCHES_PATH")]
    pub custom_matches_path: Option<String>,

    /// JSON file overriding the status/competition keyword tables
    #[arg(long, env = "KEYWORDS_PATH")]
    pub keywords_path: Option<String>,

    /// JSON file overriding the league catalog
    #[arg(long, env = "LEAGUE_CATALOG_PATH")]
    pub league_catalog_path: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_secs < 10 {
            anyhow::bail!("poll_interval_secs must be at least 10");
        }
        if self.provider_timeout_secs == 0 {
            anyhow::bail!("provider_timeout_secs must be positive");
        }
        if self.provider_timeout_secs >= self.poll_interval_secs {
            anyhow::bail!("provider_timeout_secs must be shorter than poll_interval_secs");
        }
        if !(1..=20).contains(&self.cricket_pages) {
            anyhow::bail!("cricket_pages must be between 1 and 20");
        }
        Ok(())
    }
}
