use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod api;
mod cache;
mod config;
mod db;
mod engine;
mod live_scores;

use api::AppState;
use cache::ResilientCache;
use config::Config;
use db::Database;
use engine::{KeywordTables, LeagueCatalog};
use live_scores::basketball::ApiSportsBasketball;
use live_scores::cricket::CricApi;
use live_scores::football::ApiSportsFootball;
use live_scores::hockey::ApiSportsHockey;
use live_scores::{curated, start_poller, Aggregator, MatchProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open cache store
    let db = if config.cache_path == ":memory:" {
        Database::open_in_memory()?
    } else {
        Database::open(&config.cache_path)?
    };
    info!("Cache store opened: {}", config.cache_path);
    let cache = Arc::new(ResilientCache::new(Arc::new(db.clone())));

    let tables = Arc::new(KeywordTables::load(config.keywords_path.as_deref())?);
    let catalog = Arc::new(LeagueCatalog::load(config.league_catalog_path.as_deref())?);

    let entries = curated::load(config.custom_matches_path.as_deref())?;
    let curated_matches = curated::inject(&entries, &cache);

    if config.cricket_api_key.is_none() {
        warn!("CRICKET_API_KEY not set; cricket will be served from cache only");
    }
    if config.api_sports_key.is_none() {
        warn!("API_SPORTS_KEY not set; basketball, football and hockey will be served from cache only");
    }

    let providers: Vec<Arc<dyn MatchProvider>> = vec![
        Arc::new(CricApi::new(
            config.cricket_api_key.as_deref(),
            Some(&config.cricket_api_url),
            config.cricket_pages,
        )?),
        Arc::new(ApiSportsBasketball::new(
            config.api_sports_key.as_deref(),
            Some(&config.basketball_api_url),
            config.basketball_league_id,
        )?),
        Arc::new(ApiSportsFootball::new(
            config.api_sports_key.as_deref(),
            Some(&config.football_api_url),
        )?),
        Arc::new(ApiSportsHockey::new(
            config.api_sports_key.as_deref(),
            Some(&config.hockey_api_url),
        )?),
    ];
    info!("Configured {} match provider(s)", providers.len());

    let aggregator = Arc::new(Aggregator::new(
        providers,
        cache,
        curated_matches,
        tables,
        Duration::from_secs(config.provider_timeout_secs),
    ));

    start_poller(
        Arc::clone(&aggregator),
        Duration::from_secs(config.poll_interval_secs),
    );

    let app = api::router(AppState {
        aggregator,
        catalog,
        db,
    });
    let addr: SocketAddr = config.api_addr.parse()?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run API server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
