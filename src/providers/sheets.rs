//! Google Sheets fallback: a spreadsheet published as a JSON key/value map
//! of symbol to last price, used when both market APIs miss.

use crate::quote::{Field, FallbackSource, Quote};
use crate::resolver::QuoteSource;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

pub struct SheetsProvider {
    url: String,
    client: reqwest::Client,
}

impl SheetsProvider {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("etfdash/1.0")
            .build()?;
        Ok(SheetsProvider {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl QuoteSource for SheetsProvider {
    fn tier(&self) -> Option<FallbackSource> {
        Some(FallbackSource::GoogleSheets)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        debug!(symbol, "Requesting Google Sheets map from {}", self.url);
        let data: Value = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Sheets request failed")?
            .json()
            .await
            .context("Sheets response was not JSON")?;

        let value = data
            .get(symbol)
            .ok_or_else(|| anyhow!("No sheet entry for symbol: {symbol}"))?;

        // Sheet cells arrive as numbers or numeric strings
        let price = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| anyhow!("Non-numeric sheet entry for symbol: {symbol}"))?;

        let mut quote = Quote::placeholder(symbol);
        quote.current_price = Field::Number(price);
        Ok(quote)
    }
}
