//! Proxy to the mfapi.in mutual-fund NAV-history API.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct MfApiProvider {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MfApiResponse {
    meta: MfApiMeta,
    data: Vec<MfApiNavEntry>,
}

#[derive(Debug, Deserialize)]
struct MfApiMeta {
    scheme_name: String,
}

#[derive(Debug, Deserialize)]
struct MfApiNavEntry {
    date: String,
    nav: String,
}

/// Latest NAV entry for one scheme, as served by `/api/nav`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemeNav {
    pub scheme_name: String,
    pub amfi_code: String,
    pub date: String,
    pub nav: String,
}

impl MfApiProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("etfdash/1.0")
            .build()?;
        Ok(MfApiProvider {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// Latest NAV for a scheme id. `None` when the scheme has no entries.
    pub async fn fetch_latest_nav(&self, scheme_id: &str) -> Result<Option<SchemeNav>> {
        let url = format!("{}/mf/{}", self.base_url, scheme_id);
        debug!("Requesting NAV history from {}", url);

        let response: MfApiResponse = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("NAV request failed for scheme: {scheme_id}"))?
            .json()
            .await
            .with_context(|| format!("Malformed NAV response for scheme: {scheme_id}"))?;

        let Some(latest) = response.data.first() else {
            return Ok(None);
        };

        Ok(Some(SchemeNav {
            scheme_name: response.meta.scheme_name,
            amfi_code: scheme_id.to_string(),
            date: latest.date.clone(),
            nav: latest.nav.clone(),
        }))
    }
}
