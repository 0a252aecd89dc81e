//! Yahoo Finance chart provider: the secondary quote tier and the source
//! of historical closes for the moving-average endpoint.
//!
//! Indian ETF symbols rarely match their Yahoo tickers. A static alias map
//! covers the known renames; symbols without an entry fall back to the
//! NSE-suffixed `SYMBOL.NS` form.

use crate::analytics::{long_term_averages, short_term_averages};
use crate::cache::Cache;
use crate::quote::{Field, FallbackSource, Quote, Recommendation, format_change, liquidity_score};
use crate::resolver::QuoteSource;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

const QUOTE_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

pub struct YahooProvider {
    base_url: String,
    client: reqwest::Client,
    aliases: HashMap<String, Vec<String>>,
    chart_cache: Cache<String, ChartData>,
}

/// Normalized chart payload for one Yahoo ticker.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub price: f64,
    pub previous_close: Option<f64>,
    pub short_name: Option<String>,
    /// Daily closes, oldest to newest, gaps removed.
    pub closes: Vec<f64>,
    pub avg_volume: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Vec<ChartItem>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
    #[serde(alias = "chartPreviousClose")]
    previous_close: Option<f64>,
    #[serde(alias = "shortName")]
    short_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<QuoteBars>,
}

#[derive(Deserialize, Debug)]
struct QuoteBars {
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

impl YahooProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("etfdash/1.0")
            .build()?;
        Ok(YahooProvider {
            base_url: base_url.to_string(),
            client,
            aliases: default_aliases(),
            chart_cache: Cache::new(),
        })
    }

    /// Yahoo tickers to try for a dashboard symbol, in order.
    fn candidates(&self, symbol: &str) -> Vec<String> {
        match self.aliases.get(symbol) {
            Some(list) => list.clone(),
            None => vec![format!("{symbol}.NS")],
        }
    }

    async fn fetch_chart(&self, ticker: &str, range: &str) -> Result<ChartData> {
        let cache_key = format!("{ticker}:{range}");
        if let Some(cached) = self.chart_cache.get(&cache_key).await {
            return Ok(cached);
        }

        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range={}",
            self.base_url, ticker, range
        );
        debug!("Requesting chart data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for ticker: {}", e, ticker))?;

        let data = response.json::<YahooChartResponse>().await?;
        let item = data
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No chart data found for ticker: {}", ticker))?;

        let bars = item
            .indicators
            .as_ref()
            .and_then(|inds| inds.quote.first());
        let closes: Vec<f64> = bars
            .and_then(|q| q.close.as_ref())
            .map(|closes| closes.iter().filter_map(|c| *c).collect())
            .unwrap_or_default();
        let avg_volume = bars.and_then(|q| q.volume.as_ref()).and_then(|volumes| {
            let present: Vec<f64> = volumes.iter().filter_map(|v| *v).collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            }
        });

        let chart = ChartData {
            price: item.meta.regular_market_price,
            previous_close: item.meta.previous_close,
            short_name: item.meta.short_name,
            closes,
            avg_volume,
        };

        self.chart_cache
            .put(cache_key, chart.clone(), Some(QUOTE_CACHE_TTL))
            .await;
        Ok(chart)
    }

    /// Daily closes for a dashboard symbol, oldest to newest, trying each
    /// alias in order. Range is wide enough for a 500-day window.
    pub async fn fetch_daily_closes(&self, symbol: &str) -> Result<Vec<f64>> {
        for ticker in self.candidates(symbol) {
            match self.fetch_chart(&ticker, "5y").await {
                Ok(chart) if !chart.closes.is_empty() => return Ok(chart.closes),
                Ok(_) => debug!(symbol, ticker, "Chart had no closes"),
                Err(e) => debug!(symbol, ticker, "Chart miss: {e}"),
            }
        }
        Err(anyhow!("No historical closes found for symbol: {symbol}"))
    }
}

#[async_trait]
impl QuoteSource for YahooProvider {
    fn tier(&self) -> Option<FallbackSource> {
        Some(FallbackSource::Yahoo)
    }

    #[instrument(name = "YahooQuoteFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        for ticker in self.candidates(symbol) {
            // The wide range feeds the moving-average maps and shares the
            // cache entry with the historical-closes path.
            let chart = match self.fetch_chart(&ticker, "5y").await {
                Ok(chart) => chart,
                Err(e) => {
                    debug!(symbol, ticker, "Alias miss: {e}");
                    continue;
                }
            };
            if !chart.price.is_finite() {
                continue;
            }

            let mut quote = Quote::placeholder(symbol);
            if let Some(name) = chart.short_name {
                quote.name = name;
            }
            quote.current_price = Field::Number(chart.price);
            // Day change against the previous close when the chart has one
            let reference = chart
                .previous_close
                .or_else(|| chart.closes.iter().rev().nth(1).copied());
            if let Some(prev) = reference
                && prev > 0.0
            {
                let change = chart.price - prev;
                let percent = change / prev * 100.0;
                quote.change = Field::Number(change);
                quote.percent_change = Field::Number(percent);
                quote.change_str = format_change(change, percent);
                quote.recommendation = if change > 0.0 {
                    Recommendation::Buy
                } else {
                    Recommendation::Hold
                };
            }
            if let Some(volume) = chart.avg_volume {
                quote.avg_volume = Field::Number(volume);
                quote.liquidity = Field::Number(liquidity_score(volume));
            }
            quote.long_term_averages = long_term_averages(&chart.closes);
            quote.short_term_averages = short_term_averages(&chart.closes);
            return Ok(quote);
        }
        Err(anyhow!("No quote found on any alias for symbol: {symbol}"))
    }
}

/// Known dashboard-symbol to Yahoo-ticker renames, discovered against the
/// live API. Symbols not listed here resolve as `SYMBOL.NS`.
fn default_aliases() -> HashMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        ("NIFTYBEES", &["NIFTYBEES.NS"]),
        ("HDFCNIFTY", &["HDFCNIFETF.NS"]),
        ("ICICINIFTY", &["ICICINF100.NS"]),
        ("SBINIFTY", &["SETFNIF50.NS"]),
        ("UTINIFTY", &["UTINIFTETF.NS"]),
        ("JUNIORBEES", &["JUNIORBEES.NS"]),
        ("ICICIMID150", &["ICICIM150.NS"]),
        ("MOTILALM100", &["MOTILALM100.NS"]),
        ("KOTAKMID50", &["KOTAKMID50.NS"]),
        ("NIPPMID150", &["NIPPMID150.NS"]),
        ("NIPPSMLCAP", &["NIPPSMLCAP.NS"]),
        ("ICICISMLCAP", &["ICICISMLCAP.NS"]),
        ("SBIETFSC", &["SBIETFSC.NS"]),
        ("MOTISMLCAP", &["MOTISMLCAP.NS"]),
        ("HDFCSMLCAP", &["HDFCSMLCAP.NS"]),
        ("LIQUIDBEES", &["LIQUIDBEES.NS"]),
        ("ICICILIQUID", &["ICICILIQUID.NS"]),
        ("SBILIQUID", &["SBILIQUID.NS"]),
        ("HDFCLIQUID", &["HDFCLIQUID.NS"]),
        ("UTILIQUIB", &["UTILIQUIB.NS"]),
        ("MOTILALNAS100", &["MOTILALNAS100.NS"]),
        ("MOTILALSP500", &["MOTILALSP500.NS"]),
        ("ICICINASDAQ", &["ICICINASDAQ.NS"]),
        ("SBIINTERNAT", &["SBIINTERNAT.NS"]),
        ("HDFCNASDAQ", &["HDFCNASDAQ.NS"]),
    ];
    table
        .iter()
        .map(|(symbol, aliases)| {
            (
                symbol.to_string(),
                aliases.iter().map(|a| a.to_string()).collect(),
            )
        })
        .collect()
}
