use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::db::Database;
use crate::engine::{organize, search, LeagueCatalog};
use crate::live_scores::{Aggregator, DetailError};

/// Recent lists in the overview are trimmed to this many entries.
pub const DISPLAY_RECENT_CAP: usize = 5;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub catalog: Arc<LeagueCatalog>,
    pub db: Database,
}

/// Build the Axum router for the JSON API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/matches", get(matches_handler))
        .route("/api/overview", get(overview_handler))
        .route("/api/search", get(search_handler))
        .route("/api/matches/:id/detail", get(detail_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/api/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /api/matches
async fn matches_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let latest = state.aggregator.latest().await;
    Json(json!({
        "cycle": latest.cycle,
        "completed_at": latest.completed_at,
        "matches": &*latest.matches,
    }))
}

/// GET /api/overview
async fn overview_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let latest = state.aggregator.latest().await;
    let organized = organize(
        &latest.matches.all,
        &state.catalog,
        state.aggregator.tables(),
        Utc::now(),
    )
    .cap_recent(DISPLAY_RECENT_CAP);
    Json(json!({
        "cycle": latest.cycle,
        "per_sport": organized.per_sport,
        "per_league": organized.per_league,
        "live": organized.live,
        "recent": organized.recent,
    }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// GET /api/search?q=lakers
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let latest = state.aggregator.latest().await;
    Json(search(&latest.matches.all, &params.q))
}

#[derive(Debug, Deserialize)]
struct DetailParams {
    status: Option<String>,
}

/// GET /api/matches/:id/detail?status=Match%20Finished
async fn detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<DetailParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state
        .aggregator
        .fetch_match_detail(&id, params.status.as_deref())
        .await
    {
        Ok(Some(detail)) => Ok(Json(detail)),
        Ok(None) => Err((StatusCode::NOT_FOUND, format!("no detail for match {}", id))),
        Err(e @ DetailError::QuotaExceeded(_)) => Err((StatusCode::TOO_MANY_REQUESTS, e.to_string())),
        Err(e) => {
            warn!("Detail lookup for {} failed: {}", id, e);
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

/// POST /api/refresh
async fn refresh_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cycle = state.aggregator.begin_cycle();
    info!("Manual refresh requested, starting cycle {}", cycle);
    let aggregator = Arc::clone(&state.aggregator);
    tokio::spawn(async move {
        aggregator.complete_cycle(cycle, false).await;
    });
    (StatusCode::ACCEPTED, Json(json!({ "cycle": cycle })))
}

/// GET /api/health
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let latest = state.aggregator.latest().await;
    let entries = state
        .db
        .entry_count()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(json!({
        "status": "ok",
        "cycle": latest.cycle,
        "completed_at": latest.completed_at,
        "cache_entries": entries,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResilientCache;
    use crate::db::models::{Match, Sport, SportsMatches, TeamScore};
    use crate::engine::KeywordTables;
    use crate::live_scores::curated;
    use std::time::Duration;

    async fn serve(aggregator: Arc<Aggregator>, db: Database) -> String {
        let app = router(AppState {
            aggregator,
            catalog: Arc::new(LeagueCatalog::default()),
            db,
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn aggregator(db: &Database, curated: Vec<Match>) -> Arc<Aggregator> {
        Arc::new(Aggregator::new(
            Vec::new(),
            Arc::new(ResilientCache::new(Arc::new(db.clone()))),
            curated,
            Arc::new(KeywordTables::default()),
            Duration::from_secs(1),
        ))
    }

    fn live_game(id: &str) -> Match {
        let mut m = Match::new(Sport::Basketball, id, "Lakers", "Celtics");
        m.status = "Q3".into();
        m.state = crate::db::models::PlayState::Live;
        m.score = vec![TeamScore::Basketball {
            team: "Lakers".into(),
            points: Some(70),
            q1: None,
            q2: None,
            q3: None,
            q4: None,
        }];
        m
    }

    #[tokio::test]
    async fn test_matches_search_and_overview() {
        let db = Database::open_in_memory().unwrap();
        let agg = aggregator(&db, Vec::new());
        agg.publish(
            1,
            SportsMatches::from_parts(vec![(Sport::Basketball, vec![live_game("bb-1")])]),
        )
        .await;
        let base = serve(agg, db).await;
        let http = reqwest::Client::new();

        let body: serde_json::Value = http
            .get(format!("{}/api/matches", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["cycle"], 1);
        assert_eq!(body["matches"]["basketball"][0]["id"], "bb-1");

        let hits: serde_json::Value = http
            .get(format!("{}/api/search?q=celtics", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(hits.as_array().unwrap().len(), 1);

        let overview: serde_json::Value = http
            .get(format!("{}/api/overview", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(overview["per_league"]["NBA"]["live"][0]["id"], "bb-1");
    }

    #[tokio::test]
    async fn test_detail_status_codes() {
        let db = Database::open_in_memory().unwrap();
        let agg = aggregator(&db, Vec::new());
        let entries: Vec<curated::CuratedEntry> = serde_json::from_str(
            r#"[{"matchId": "custom-1", "teams": ["A", "B"],
                 "details": {"innings": [{"team": "A", "score": "10/1"}]}}]"#,
        )
        .unwrap();
        curated::inject(&entries, agg.cache());
        let base = serve(agg, db).await;
        let http = reqwest::Client::new();

        let found = http
            .get(format!("{}/api/matches/custom-1/detail", base))
            .send()
            .await
            .unwrap();
        assert_eq!(found.status(), reqwest::StatusCode::OK);

        let missing = http
            .get(format!("{}/api/matches/zz-9/detail", base))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refresh_is_accepted() {
        let db = Database::open_in_memory().unwrap();
        let agg = aggregator(&db, Vec::new());
        let base = serve(agg, db).await;

        let resp = reqwest::Client::new()
            .post(format!("{}/api/refresh", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["cycle"], 1);
    }
}
