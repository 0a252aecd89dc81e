//! Daily categorized-NAV snapshot service.
//!
//! Per calendar day the service is cold (nothing cached), fetching
//! (pulling and categorizing the bulk file with bounded retry) or warm
//! (serving from memory). The day's snapshot file, once written, is
//! authoritative until the wall-clock date changes.

use crate::categories::{Category, CategoryInfo, NavSnapshot, default_categories};
use crate::nav::parser::parse_etf_records;
use crate::retry::with_retry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

const RETRY_ATTEMPTS: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Upstream that serves the raw bulk NAV text.
#[async_trait]
pub trait NavSource: Send + Sync {
    async fn fetch_bulk_text(&self) -> Result<String>;
}

type Categories = HashMap<String, Category>;

pub struct NavDataService {
    data_dir: PathBuf,
    source: Arc<dyn NavSource>,
    cache: Mutex<Option<(String, Categories)>>,
    retry_attempts: usize,
    retry_delay: Duration,
}

impl NavDataService {
    pub fn new(data_dir: PathBuf, source: Arc<dyn NavSource>) -> Self {
        Self {
            data_dir,
            source,
            cache: Mutex::new(None),
            retry_attempts: RETRY_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_retry_policy(mut self, attempts: usize, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    fn today() -> String {
        chrono::Utc::now().date_naive().to_string()
    }

    fn snapshot_path(&self, date: &str) -> PathBuf {
        self.data_dir
            .join(format!("etf_navs_categorized_{date}.json"))
    }

    async fn fetch_and_categorize(&self) -> Result<Categories> {
        let raw = self.source.fetch_bulk_text().await?;
        let records = parse_etf_records(&raw)?;
        Ok(crate::categories::categorize(
            &records,
            default_categories(),
        ))
    }

    async fn write_snapshot(&self, date: &str, categories: &Categories) -> Result<PathBuf> {
        let path = self.snapshot_path(date);
        let snapshot = NavSnapshot {
            categories: categories.clone(),
        };
        let body = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write NAV snapshot: {}", path.display()))?;
        Ok(path)
    }

    /// Returns today's categorized snapshot, walking the daily state
    /// machine: memory, then the day's file, then fetch with retry.
    pub async fn ensure(&self) -> Result<Categories> {
        let today = Self::today();
        let mut cache = self.cache.lock().await;
        if let Some((date, categories)) = cache.as_ref()
            && *date == today
        {
            return Ok(categories.clone());
        }

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("Failed to create data dir: {}", self.data_dir.display()))?;

        // The day's file, when present and valid, is authoritative.
        let path = self.snapshot_path(&today);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => match serde_json::from_str::<NavSnapshot>(&body) {
                Ok(snapshot) => {
                    *cache = Some((today, snapshot.categories.clone()));
                    return Ok(snapshot.categories);
                }
                Err(e) => warn!("NAV snapshot file corrupt, refetching: {e}"),
            },
            Err(_) => info!("No NAV snapshot for {today}, fetching from AMFI"),
        }

        let categories = with_retry(
            || async {
                let categories = self.fetch_and_categorize().await?;
                self.write_snapshot(&today, &categories).await?;
                Ok(categories)
            },
            self.retry_attempts,
            self.retry_delay,
        )
        .await
        .context("Failed to fetch and save NAV data after retries")?;

        *cache = Some((today, categories.clone()));
        Ok(categories)
    }

    /// All available categories, key + label only.
    pub async fn categories(&self) -> Result<Vec<CategoryInfo>> {
        let categories = self.ensure().await?;
        let mut infos: Vec<CategoryInfo> = categories
            .iter()
            .map(|(key, category)| CategoryInfo {
                key: key.clone(),
                label: category.label.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    /// A single category's funds, or `None` for an unknown key.
    pub async fn category(&self, key: &str) -> Result<Option<Category>> {
        let categories = self.ensure().await?;
        Ok(categories.get(key).cloned())
    }

    /// Forces a refetch, overwriting today's snapshot file. Used by the
    /// explicit refresh trigger; bypasses the warm cache entirely.
    pub async fn refresh_and_save(&self) -> Result<PathBuf> {
        let today = Self::today();
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("Failed to create data dir: {}", self.data_dir.display()))?;

        let categories = self.fetch_and_categorize().await?;
        let path = self.write_snapshot(&today, &categories).await?;

        let mut cache = self.cache.lock().await;
        *cache = Some((today, categories));
        info!("Saved NAV snapshot to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const HEADER: &str =
        "Scheme Code;ISIN Div Payout/ ISIN Growth;ISIN Div Reinvestment;Scheme Name;Net Asset Value;Date";

    fn bulk_text() -> String {
        format!("{HEADER}\n101;INF1;-;ABC NIFTY BEES Fund;12.34;01-Jan-2025\n")
    }

    struct MockSource {
        responses: Mutex<Vec<Result<String>>>,
        calls: AtomicUsize,
    }

    impl MockSource {
        fn new(responses: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            })
        }

        fn always_ok() -> Arc<Self> {
            Self::new(vec![])
        }
    }

    #[async_trait]
    impl NavSource for MockSource {
        async fn fetch_bulk_text(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().await;
            if responses.is_empty() {
                Ok(bulk_text())
            } else {
                responses.remove(0)
            }
        }
    }

    fn service(dir: &tempfile::TempDir, source: Arc<MockSource>) -> NavDataService {
        NavDataService::new(dir.path().to_path_buf(), source)
            .with_retry_policy(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_cold_start_fetches_and_writes_file() {
        let dir = tempdir().unwrap();
        let source = MockSource::always_ok();
        let svc = service(&dir, source.clone());

        let categories = svc.ensure().await.unwrap();
        assert_eq!(categories["nifty50"].funds.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let path = svc.snapshot_path(&NavDataService::today());
        assert!(path.exists());
        let body = std::fs::read_to_string(path).unwrap();
        let snapshot: NavSnapshot = serde_json::from_str(&body).unwrap();
        assert!(snapshot.categories.contains_key("nifty50"));
    }

    #[tokio::test]
    async fn test_warm_cache_skips_disk_and_network() {
        let dir = tempdir().unwrap();
        let source = MockSource::always_ok();
        let svc = service(&dir, source.clone());

        svc.ensure().await.unwrap();
        svc.ensure().await.unwrap();
        svc.ensure().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_existing_file_is_authoritative() {
        let dir = tempdir().unwrap();
        let source = MockSource::always_ok();
        let svc = service(&dir, source.clone());

        // Pre-write today's snapshot by hand
        let snapshot = r#"{"categories": {"gold": {
            "label": "Gold", "description": "d", "keywords": ["gold"],
            "funds": [{"symbol": "", "schemeName": "Handmade Gold ETF",
                       "amfiCode": "7", "latestNav": "1.0", "navDate": "01-Jan-2025"}]
        }}}"#;
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(svc.snapshot_path(&NavDataService::today()), snapshot).unwrap();

        let categories = svc.ensure().await.unwrap();
        assert!(categories.contains_key("gold"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_triggers_refetch() {
        let dir = tempdir().unwrap();
        let source = MockSource::always_ok();
        let svc = service(&dir, source.clone());

        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(svc.snapshot_path(&NavDataService::today()), "{not json").unwrap();

        let categories = svc.ensure().await.unwrap();
        assert!(categories.contains_key("nifty50"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let dir = tempdir().unwrap();
        let source = MockSource::new(vec![
            Err(anyhow!("connection reset")),
            Err(anyhow!("timeout")),
            Ok(bulk_text()),
        ]);
        let svc = service(&dir, source.clone());

        let categories = svc.ensure().await.unwrap();
        assert!(categories.contains_key("nifty50"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_is_terminal_for_the_request() {
        let dir = tempdir().unwrap();
        let source = MockSource::new(vec![
            Err(anyhow!("down")),
            Err(anyhow!("down")),
            Err(anyhow!("down")),
        ]);
        let svc = service(&dir, source.clone());

        let err = svc.ensure().await.unwrap_err();
        assert!(
            err.to_string()
                .contains("Failed to fetch and save NAV data")
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_refresh_and_save_bypasses_warm_cache() {
        let dir = tempdir().unwrap();
        let source = MockSource::always_ok();
        let svc = service(&dir, source.clone());

        svc.ensure().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let path = svc.refresh_and_save().await.unwrap();
        assert!(path.exists());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_category_lookup() {
        let dir = tempdir().unwrap();
        let svc = service(&dir, MockSource::always_ok());

        let category = svc.category("nifty50").await.unwrap();
        assert_eq!(category.unwrap().funds[0].amfi_code, "101");

        assert!(svc.category("unknown").await.unwrap().is_none());

        let infos = svc.categories().await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].key, "nifty50");
        assert_eq!(infos[0].label, "Nifty 50");
    }
}
