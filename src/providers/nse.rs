//! NSE equity API provider: the primary quote tier and the live ETF list.

use crate::quote::{Field, FallbackSource, Quote, Recommendation, format_change, liquidity_score};
use crate::resolver::QuoteSource;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Upstream failures that must keep their identity across the handler
/// boundary for status-code mapping.
#[derive(Debug, Error)]
pub enum NseError {
    /// Anti-bot interception (CAPTCHA or HTML error page).
    #[error("Blocked by NSE anti-bot: {0}")]
    Blocked(String),
    /// Upstream answered but not with the expected JSON shape.
    #[error("Invalid response from NSE API: {0}")]
    Invalid(String),
}

pub struct NseProvider {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EquityDetails {
    info: EquityInfo,
    #[serde(rename = "priceInfo")]
    price_info: PriceInfo,
}

#[derive(Debug, Deserialize)]
struct EquityInfo {
    #[serde(rename = "companyName", default)]
    company_name: String,
}

#[derive(Debug, Deserialize)]
struct PriceInfo {
    #[serde(rename = "lastPrice")]
    last_price: Option<f64>,
    #[serde(default)]
    change: Option<f64>,
    #[serde(rename = "pChange", default)]
    p_change: Option<f64>,
    #[serde(rename = "totalTradedVolume", default)]
    total_traded_volume: Option<f64>,
}

impl NseProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;
        Ok(NseProvider {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// Live ETF listing from NSE's internal `/api/etf` endpoint.
    ///
    /// NSE serves HTML or a CAPTCHA page when it suspects a bot; that case
    /// is surfaced as `NseError::Blocked` so the handler can answer 429.
    pub async fn fetch_live_etfs(&self) -> Result<serde_json::Value> {
        let url = format!("{}/api/etf", self.base_url);
        debug!("Requesting live ETF list from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
            .send()
            .await
            .context("Failed to reach NSE ETF API")?;

        let text = response
            .text()
            .await
            .context("Failed to read NSE ETF response")?;

        if text.contains("captcha") || text.trim_start().starts_with("<!DOCTYPE") {
            let preview: String = text.chars().take(200).collect();
            return Err(NseError::Blocked(preview).into());
        }

        let data: serde_json::Value = serde_json::from_str(&text)
            .map_err(|_| NseError::Invalid(text.chars().take(200).collect()))?;

        if data.get("data").is_none() {
            return Err(NseError::Invalid("missing data field".to_string()).into());
        }
        Ok(data)
    }
}

#[async_trait]
impl QuoteSource for NseProvider {
    fn tier(&self) -> Option<FallbackSource> {
        None
    }

    #[instrument(name = "NseQuoteFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let url = format!("{}/api/quote-equity?symbol={}", self.base_url, symbol);
        debug!("Requesting equity details from {}", url);

        let details = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Request error for symbol: {symbol}"))?
            .json::<EquityDetails>()
            .await
            .with_context(|| format!("Malformed equity details for symbol: {symbol}"))?;

        // A usable answer requires a company name and a numeric last price;
        // anything else is a miss for this tier.
        if details.info.company_name.trim().is_empty() {
            return Err(anyhow!("Empty company name for symbol: {symbol}"));
        }
        let last_price = details
            .price_info
            .last_price
            .ok_or_else(|| anyhow!("No last price for symbol: {symbol}"))?;

        let mut quote = Quote::placeholder(symbol);
        quote.name = details.info.company_name;
        quote.current_price = Field::Number(last_price);
        if let Some(change) = details.price_info.change {
            quote.change = Field::Number(change);
            quote.recommendation = if change > 0.0 {
                Recommendation::Buy
            } else {
                Recommendation::Hold
            };
            if let Some(percent) = details.price_info.p_change {
                quote.percent_change = Field::Number(percent);
                quote.change_str = format_change(change, percent);
            }
        }
        if let Some(volume) = details.price_info.total_traded_volume {
            quote.avg_volume = Field::Number(volume);
            quote.liquidity = Field::Number(liquidity_score(volume));
        }
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_equity(symbol: &str, body: &str, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/quote-equity"))
            .and(query_param("symbol", symbol))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_successful_quote() {
        let body = r#"{
            "info": {"companyName": "Nippon India ETF Nifty 50 BeES"},
            "priceInfo": {"lastPrice": 281.5, "change": 2.1, "pChange": 0.75, "totalTradedVolume": 1200000}
        }"#;
        let server = mock_equity("NIFTYBEES", body, 200).await;
        let provider = NseProvider::new(&server.uri()).unwrap();

        let quote = provider.fetch_quote("NIFTYBEES").await.unwrap();
        assert_eq!(quote.name, "Nippon India ETF Nifty 50 BeES");
        assert_eq!(quote.current_price, Field::Number(281.5));
        assert_eq!(quote.change_str, "+2.10 (0.75%)");
        assert_eq!(quote.recommendation, Recommendation::Buy);
        assert!(quote.liquidity.as_number().is_some());
    }

    #[tokio::test]
    async fn test_empty_company_name_is_a_miss() {
        let body = r#"{"info": {"companyName": ""}, "priceInfo": {"lastPrice": 10.0}}"#;
        let server = mock_equity("X", body, 200).await;
        let provider = NseProvider::new(&server.uri()).unwrap();

        let result = provider.fetch_quote("X").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Empty company name"));
    }

    #[tokio::test]
    async fn test_missing_price_is_a_miss() {
        let body = r#"{"info": {"companyName": "Some ETF"}, "priceInfo": {}}"#;
        let server = mock_equity("X", body, 200).await;
        let provider = NseProvider::new(&server.uri()).unwrap();

        let result = provider.fetch_quote("X").await;
        assert!(result.unwrap_err().to_string().contains("No last price"));
    }

    #[tokio::test]
    async fn test_live_etfs_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/etf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"data": [{"symbol": "NIFTYBEES", "ltp": 281.5}]}"#),
            )
            .mount(&server)
            .await;
        let provider = NseProvider::new(&server.uri()).unwrap();

        let data = provider.fetch_live_etfs().await.unwrap();
        assert_eq!(data["data"][0]["symbol"], "NIFTYBEES");
    }

    #[tokio::test]
    async fn test_live_etfs_blocked_by_captcha_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/etf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<!DOCTYPE html><html>captcha challenge</html>"),
            )
            .mount(&server)
            .await;
        let provider = NseProvider::new(&server.uri()).unwrap();

        let err = provider.fetch_live_etfs().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NseError>(),
            Some(NseError::Blocked(_))
        ));
    }

    #[tokio::test]
    async fn test_live_etfs_invalid_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/etf"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"marketStatus": "open"}"#))
            .mount(&server)
            .await;
        let provider = NseProvider::new(&server.uri()).unwrap();

        let err = provider.fetch_live_etfs().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NseError>(),
            Some(NseError::Invalid(_))
        ));
    }
}
