//! Fetcher for AMFI's daily bulk NAV text file (`NAVAll.txt`).

use crate::nav::service::NavSource;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::debug;

pub struct AmfiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl AmfiProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("etfdash/1.0")
            .build()?;
        Ok(AmfiProvider {
            base_url: base_url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl NavSource for AmfiProvider {
    async fn fetch_bulk_text(&self) -> Result<String> {
        let url = format!("{}/spages/NAVAll.txt", self.base_url);
        debug!("Requesting bulk NAV text from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch NAVAll.txt from AMFI")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error {} fetching NAVAll.txt",
                response.status()
            ));
        }

        let text = response
            .text()
            .await
            .context("Failed to read NAVAll.txt body")?;
        if text.trim().is_empty() {
            return Err(anyhow!("Received empty NAVAll.txt from AMFI"));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_amfi(body: &str, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spages/NAVAll.txt"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_fetch_bulk_text() {
        let server = mock_amfi("Scheme Code;...\n101;a;b;c;d;e", 200).await;
        let provider = AmfiProvider::new(&server.uri()).unwrap();
        let text = provider.fetch_bulk_text().await.unwrap();
        assert!(text.starts_with("Scheme Code;"));
    }

    #[tokio::test]
    async fn test_http_error_surfaces() {
        let server = mock_amfi("Service Unavailable", 503).await;
        let provider = AmfiProvider::new(&server.uri()).unwrap();
        let err = provider.fetch_bulk_text().await.unwrap_err();
        assert!(err.to_string().contains("HTTP error"));
    }

    #[tokio::test]
    async fn test_empty_body_is_an_error() {
        let server = mock_amfi("", 200).await;
        let provider = AmfiProvider::new(&server.uri()).unwrap();
        let err = provider.fetch_bulk_text().await.unwrap_err();
        assert!(err.to_string().contains("empty NAVAll.txt"));
    }
}
