pub mod analytics;
pub mod cache;
pub mod categories;
pub mod config;
pub mod log;
pub mod nav;
pub mod providers;
pub mod quote;
pub mod resolver;
pub mod retry;
pub mod server;

use crate::cache::TtlCell;
use crate::config::AppConfig;
use crate::nav::service::NavDataService;
use crate::providers::amfi::AmfiProvider;
use crate::providers::mfapi::MfApiProvider;
use crate::providers::nse::NseProvider;
use crate::providers::sheets::SheetsProvider;
use crate::providers::yahoo::YahooProvider;
use crate::resolver::{QuoteResolver, QuoteSource};
use crate::server::AppState;
use anyhow::Result;
use std::sync::Arc;

/// Wires the providers from config and builds the shared state.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let defaults = crate::config::ProvidersConfig::default();

    let amfi_url = config
        .providers
        .amfi
        .as_ref()
        .or(defaults.amfi.as_ref())
        .map(|c| c.base_url.clone())
        .unwrap_or_default();
    let nse_url = config
        .providers
        .nse
        .as_ref()
        .or(defaults.nse.as_ref())
        .map(|c| c.base_url.clone())
        .unwrap_or_default();
    let yahoo_url = config
        .providers
        .yahoo
        .as_ref()
        .or(defaults.yahoo.as_ref())
        .map(|c| c.base_url.clone())
        .unwrap_or_default();
    let mfapi_url = config
        .providers
        .mfapi
        .as_ref()
        .or(defaults.mfapi.as_ref())
        .map(|c| c.base_url.clone())
        .unwrap_or_default();

    let amfi = Arc::new(AmfiProvider::new(&amfi_url)?);
    let nse = Arc::new(NseProvider::new(&nse_url)?);
    let yahoo = Arc::new(YahooProvider::new(&yahoo_url)?);
    let mfapi = Arc::new(MfApiProvider::new(&mfapi_url)?);

    let mut sources: Vec<Arc<dyn QuoteSource>> = vec![nse.clone(), yahoo.clone()];
    // The tertiary sheet tier only exists when a sheet URL is configured
    if let Some(sheets) = &config.providers.sheets {
        sources.push(Arc::new(SheetsProvider::new(&sheets.url)?));
    }

    let nav = Arc::new(NavDataService::new(config.nav_data_dir()?, amfi));

    Ok(AppState {
        nav,
        resolver: Arc::new(QuoteResolver::new(sources)),
        yahoo,
        nse,
        mfapi,
        bulk_cache: Arc::new(TtlCell::new(server::BULK_CACHE_TTL)),
    })
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
}

/// Runs the HTTP server until it terminates.
pub async fn run_server(config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let state = build_state(&config)?;
    server::serve(state, config.server.port).await
}

/// One-shot NAV refresh for cron-style usage.
pub async fn run_fetch_navs(config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let state = build_state(&config)?;
    let path = state.nav.refresh_and_save().await?;
    tracing::info!("NAV snapshot written to {}", path.display());
    Ok(())
}
