//! HTTP server: routing, shared state and the background bulk refresh.

pub mod error;
pub mod handlers;

use crate::cache::TtlCell;
use crate::nav::service::NavDataService;
use crate::providers::mfapi::MfApiProvider;
use crate::providers::nse::NseProvider;
use crate::providers::yahoo::YahooProvider;
use crate::quote::Quote;
use crate::resolver::QuoteResolver;
use anyhow::{Context, Result};
use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// TTL for the shared bulk ETF listing.
pub const BULK_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
/// Interval of the background task that keeps the bulk listing warm.
const REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone)]
pub struct AppState {
    pub nav: Arc<NavDataService>,
    pub resolver: Arc<QuoteResolver>,
    pub yahoo: Arc<YahooProvider>,
    pub nse: Arc<NseProvider>,
    pub mfapi: Arc<MfApiProvider>,
    pub bulk_cache: Arc<TtlCell<Vec<Quote>>>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/etfs", get(handlers::list_etfs))
        .route("/api/etfs/live", get(handlers::live_etfs))
        .route("/api/etfs/top-liquid", get(handlers::top_liquid))
        .route("/api/etfs-by-category", get(handlers::etfs_by_category))
        .route("/api/etf", get(handlers::get_etf))
        .route("/api/etf-ma/{symbol}", get(handlers::get_etf_ma))
        .route("/api/etf-categories", get(handlers::etf_categories))
        .route(
            "/api/etf-category/{category_key}",
            get(handlers::etf_category),
        )
        .route("/api/etf-category-keys", get(handlers::etf_category_keys))
        .route("/api/fetch-navs", post(handlers::fetch_navs))
        .route("/api/nav", get(handlers::get_nav))
        .layer(cors)
        .with_state(state)
}

/// Keeps the bulk ETF listing warm so `/api/etfs` and
/// `/api/etfs/top-liquid` rarely pay the fan-out cost in-request. A
/// failed cycle leaves the previous value in place.
pub fn spawn_bulk_refresh(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        loop {
            ticker.tick().await;
            let symbols = crate::categories::all_symbols();
            info!("Refreshing bulk ETF cache ({} symbols)", symbols.len());
            let quotes = state.resolver.resolve_many(&symbols).await;
            if quotes.iter().all(|q| q.current_price.is_missing()) {
                error!("Bulk refresh produced no data, keeping previous cache");
                continue;
            }
            state.bulk_cache.replace(quotes).await;
        }
    });
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    spawn_bulk_refresh(state.clone());

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;
    Ok(())
}
