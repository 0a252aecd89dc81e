//! Request handlers for the dashboard API.

use crate::analytics::{MA_WINDOWS, cross_signal, moving_average};
use crate::categories::{default_categories, find_spec};
use crate::quote::Quote;
use crate::server::AppState;
use crate::server::error::ApiError;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Deserialize)]
pub struct EtfsQuery {
    pub category: Option<String>,
}

/// `GET /api/etfs` — the bulk curated listing, or one category's symbols
/// when `?category=` is given. The bulk path is served from the shared
/// TTL cache; the category path always resolves fresh.
pub async fn list_etfs(
    State(state): State<AppState>,
    Query(query): Query<EtfsQuery>,
) -> Result<Json<Vec<Quote>>, ApiError> {
    if let Some(key) = query.category {
        let spec = find_spec(&key)
            .ok_or_else(|| ApiError::not_found(format!("Unknown category: {key}")))?;
        let symbols: Vec<String> = spec.symbols.iter().map(|s| s.to_string()).collect();
        return Ok(Json(state.resolver.resolve_many_merged(&symbols).await));
    }

    if let Some(quotes) = state.bulk_cache.get().await {
        return Ok(Json(quotes));
    }

    let symbols = crate::categories::all_symbols();
    info!("Bulk ETF cache cold, resolving {} symbols", symbols.len());
    let quotes = state.resolver.resolve_many(&symbols).await;
    state.bulk_cache.replace(quotes.clone()).await;
    Ok(Json(quotes))
}

#[derive(Deserialize)]
pub struct EtfQuery {
    pub symbol: Option<String>,
}

/// `GET /api/etf?symbol=` — single symbol through the full fallback chain.
pub async fn get_etf(
    State(state): State<AppState>,
    Query(query): Query<EtfQuery>,
) -> Result<Json<Quote>, ApiError> {
    let symbol = query
        .symbol
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required query parameter: symbol"))?;
    Ok(Json(state.resolver.resolve(&symbol).await))
}

#[derive(Deserialize)]
pub struct MaQuery {
    /// Comma-separated window override, e.g. `windows=50,200`.
    pub windows: Option<String>,
}

/// `GET /api/etf-ma/{symbol}` — moving averages over the requested
/// windows plus the golden/death cross signal.
pub async fn get_etf_ma(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<MaQuery>,
) -> Result<Json<Value>, ApiError> {
    let windows: Vec<usize> = match query.windows {
        Some(spec) => {
            let parsed: Result<Vec<usize>, _> =
                spec.split(',').map(|w| w.trim().parse::<usize>()).collect();
            parsed.map_err(|_| ApiError::bad_request(format!("Invalid windows: {spec}")))?
        }
        None => MA_WINDOWS.to_vec(),
    };
    if windows.is_empty() || windows.contains(&0) {
        return Err(ApiError::bad_request("Windows must be positive integers"));
    }

    let closes = state
        .yahoo
        .fetch_daily_closes(&symbol)
        .await
        .map_err(|e| ApiError::not_found(format!("No historical data for {symbol}: {e}")))?;

    let largest = windows.iter().copied().max().unwrap_or(0);
    if closes.len() < largest {
        return Err(ApiError::not_found(format!(
            "Insufficient history for {symbol}: need {largest} closes, have {}",
            closes.len()
        )));
    }

    let averages: BTreeMap<String, Option<f64>> = windows
        .iter()
        .map(|w| (format!("ma{w}"), moving_average(&closes, *w)))
        .collect();
    let signal = cross_signal(
        moving_average(&closes, 50),
        moving_average(&closes, 200),
    );

    Ok(Json(json!({
        "symbol": symbol,
        "movingAverages": averages,
        "crossSignal": signal,
    })))
}

/// `GET /api/etfs-by-category` — a grouped overview: the first six
/// categories with curated symbols, top five symbols each, merged quotes.
pub async fn etfs_by_category(State(state): State<AppState>) -> Json<Value> {
    let mut grouped = serde_json::Map::new();
    for spec in default_categories()
        .iter()
        .filter(|spec| !spec.symbols.is_empty())
        .take(6)
    {
        let symbols: Vec<String> = spec.symbols.iter().take(5).map(|s| s.to_string()).collect();
        let quotes = state.resolver.resolve_many_merged(&symbols).await;
        grouped.insert(
            spec.key.to_string(),
            json!({ "label": spec.label, "etfs": quotes }),
        );
    }
    Json(Value::Object(grouped))
}

/// `GET /api/etfs/top-liquid` — the ten most liquid ETFs out of the bulk
/// cache. Stale data is acceptable here; no data at all is a 503.
pub async fn top_liquid(State(state): State<AppState>) -> Result<Json<Vec<Quote>>, ApiError> {
    let mut quotes = state.bulk_cache.get_stale().await.ok_or_else(|| {
        ApiError::service_unavailable("ETF data not loaded yet, try again shortly")
    })?;

    quotes.sort_by(|a, b| {
        let la = a.liquidity.as_number().unwrap_or(f64::MIN);
        let lb = b.liquidity.as_number().unwrap_or(f64::MIN);
        lb.partial_cmp(&la).unwrap_or(std::cmp::Ordering::Equal)
    });
    quotes.truncate(10);
    Ok(Json(quotes))
}

/// `GET /api/etf-categories` — category metadata plus fund counts from
/// today's NAV snapshot.
pub async fn etf_categories(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let categories = state.nav.ensure().await?;
    let listing: BTreeMap<String, Value> = categories
        .iter()
        .map(|(key, category)| {
            (
                key.clone(),
                json!({
                    "label": category.label,
                    "description": category.description,
                    "fundCount": category.funds.len(),
                }),
            )
        })
        .collect();
    Ok(Json(json!(listing)))
}

/// `GET /api/etf-category/{categoryKey}` — one category's full fund list.
pub async fn etf_category(
    State(state): State<AppState>,
    Path(category_key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let category = state
        .nav
        .category(&category_key)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Unknown category: {category_key}")))?;
    Ok(Json(json!({ "key": category_key, "category": category })))
}

/// `GET /api/etf-category-keys` — sorted list of category keys present in
/// today's snapshot.
pub async fn etf_category_keys(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let infos = state.nav.categories().await?;
    let keys: Vec<String> = infos.into_iter().map(|info| info.key).collect();
    Ok(Json(json!(keys)))
}

/// `POST /api/fetch-navs` — explicit refresh of today's NAV snapshot.
pub async fn fetch_navs(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let path = state.nav.refresh_and_save().await?;
    Ok(Json(json!({
        "message": "NAV data refreshed",
        "file": path.display().to_string(),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavQuery {
    pub scheme_id: Option<String>,
}

/// `GET /api/nav?schemeId=` — latest NAV for one scheme via the
/// NAV-history proxy.
pub async fn get_nav(
    State(state): State<AppState>,
    Query(query): Query<NavQuery>,
) -> Result<Json<Value>, ApiError> {
    let scheme_id = query
        .scheme_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required query parameter: schemeId"))?;
    let nav = state
        .mfapi
        .fetch_latest_nav(&scheme_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No NAV data for scheme: {scheme_id}")))?;
    Ok(Json(json!(nav)))
}

/// `GET /api/etfs/live` — raw passthrough of NSE's live ETF listing.
/// Anti-bot blocks surface as 429, malformed payloads as 502.
pub async fn live_etfs(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let data = state.nse.fetch_live_etfs().await?;
    Ok(Json(data))
}
