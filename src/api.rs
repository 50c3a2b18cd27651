//! HTTP surface: routing, validation, and the rate-limit tiers.
//!
//! Thin by design. Everything interesting happens in `scraping::overview`;
//! handlers map wire parameters onto [`SearchOptions`], resolve the site
//! profile, and hand the rest to the scraper.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::config;
use crate::core::types::{BatchRequest, BatchResponse, OverviewParams};
use crate::core::AppState;
use crate::features::rate_limit::{enforce, RateLimiter};
use crate::scraping::overview::site::{default_profile, find_profile, SiteProfile};

/// Build the full router, including the rate-limit tiers. The router must
/// be served with `into_make_service_with_connect_info::<SocketAddr>` so
/// the limiters can see client addresses.
pub fn build_router(state: AppState) -> Router {
    let scrape_routes = Router::new()
        .route("/api/ai-overview", get(get_ai_overview))
        .route_layer(middleware::from_fn_with_state(
            RateLimiter::scraping(),
            enforce,
        ));

    let batch_routes = Router::new()
        .route("/api/ai-overview/batch", post(batch_ai_overview))
        .route_layer(middleware::from_fn_with_state(RateLimiter::batch(), enforce));

    Router::new()
        .route("/", get(service_info))
        .route("/api/health", get(health))
        .merge(scrape_routes)
        .merge(batch_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            RateLimiter::general(),
            enforce,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn resolve_site(name: Option<&str>) -> Result<&'static SiteProfile, Response> {
    match name {
        None => Ok(default_profile()),
        Some(n) => find_profile(n).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("Unknown site {:?}", n),
                    "supported_sites": ["google", "bing"],
                })),
            )
                .into_response()
        }),
    }
}

async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "service": "AI Overview API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "API for scraping AI Overview results from search engines",
        "endpoints": {
            "health": "GET /api/health",
            "aiOverview": "GET /api/ai-overview?q=your+query&gl=US&hl=en",
            "batchAiOverview": "POST /api/ai-overview/batch",
        },
        "documentation": {
            "singleQuery": {
                "method": "GET",
                "endpoint": "/api/ai-overview",
                "parameters": {
                    "q": "Search query (required)",
                    "gl": "Geographic location (optional, default: US)",
                    "hl": "Language (optional, default: en)",
                    "num": "Number of results (optional, default: 10)",
                    "start": "Starting position (optional, default: 0)",
                    "pws": "Personalized web search (optional, default: 0)",
                    "site": "Site profile (optional, default: google)",
                },
                "example": "/api/ai-overview?q=seo+agency&gl=US&hl=en&num=10",
            },
            "batchQuery": {
                "method": "POST",
                "endpoint": "/api/ai-overview/batch",
                "body": {
                    "queries": ["query1", "query2"],
                    "options": { "gl": "US", "hl": "en" },
                    "delay_ms": 3000,
                },
                "note": format!("Maximum {} queries per batch request", config::max_batch_size()),
            },
        },
        "rateLimits": {
            "general": "100 requests per 15 minutes",
            "scraping": "20 requests per 15 minutes",
            "batch": "5 requests per hour",
        },
        "timestamp": Utc::now(),
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "status": "OK",
        "service": "AI Overview API",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime_secs(),
        "timestamp": Utc::now(),
    }))
}

async fn get_ai_overview(
    State(state): State<AppState>,
    Query(params): Query<OverviewParams>,
) -> Response {
    let query = match params.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Query parameter \"q\" is required",
                    "example": "/api/ai-overview?q=seo+agency&gl=US&hl=en",
                })),
            )
                .into_response();
        }
    };

    let site = match resolve_site(params.site.as_deref()) {
        Ok(site) => site,
        Err(response) => return response,
    };

    info!("Processing AI Overview request for: {:?}", query);
    let outcome = state.scraper.scrape_one(&query, &params.options(), site).await;

    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome)).into_response()
}

async fn batch_ai_overview(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Response {
    if request.queries.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": "Array of queries is required",
                "example": {
                    "queries": ["seo agency", "digital marketing"],
                    "options": { "gl": "US", "hl": "en" },
                    "delay_ms": 3000,
                },
            })),
        )
            .into_response();
    }

    let max = config::max_batch_size();
    if request.queries.len() > max {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": format!("Maximum {} queries allowed per batch request", max),
            })),
        )
            .into_response();
    }

    let site = match resolve_site(request.site.as_deref()) {
        Ok(site) => site,
        Err(response) => return response,
    };

    let delay = request
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or(state.scraper.policy().inter_query);

    info!(
        "Processing batch AI Overview request for {} queries",
        request.queries.len()
    );
    let results = state
        .scraper
        .scrape_batch(&request.queries, &request.options, site, delay)
        .await;

    Json(BatchResponse {
        success: true,
        total_queries: results.len(),
        results,
        timestamp: Utc::now(),
    })
    .into_response()
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "error": "Endpoint not found",
            "availableEndpoints": [
                "GET /",
                "GET /api/health",
                "GET /api/ai-overview",
                "POST /api/ai-overview/batch",
            ],
        })),
    )
        .into_response()
}
