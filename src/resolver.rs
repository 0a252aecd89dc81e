//! Multi-source quote resolution.
//!
//! Sources are tried in priority order; the first well-formed answer wins
//! and is tagged with the tier that produced it. A miss at one tier
//! (including a transport error) is never fatal — the chain moves on, and
//! an all-tiers miss yields the sentinel placeholder.

use crate::quote::{FallbackSource, Quote};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

/// One tier of the quote resolution chain.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Tag recorded on quotes this source produces. `None` for the primary
    /// exchange lookup.
    fn tier(&self) -> Option<FallbackSource>;

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote>;
}

pub struct QuoteResolver {
    sources: Vec<Arc<dyn QuoteSource>>,
}

impl QuoteResolver {
    pub fn new(sources: Vec<Arc<dyn QuoteSource>>) -> Self {
        Self { sources }
    }

    /// Full fallback chain: first successful source wins.
    pub async fn resolve(&self, symbol: &str) -> Quote {
        for source in &self.sources {
            match source.fetch_quote(symbol).await {
                Ok(mut quote) => {
                    quote.fallback_source = source.tier();
                    return quote;
                }
                Err(e) => {
                    debug!(symbol, tier = ?source.tier(), "Source miss: {e}");
                }
            }
        }
        debug!(symbol, "All sources missed, returning placeholder");
        Quote::placeholder(symbol)
    }

    /// Merge variant: queries the primary and secondary tiers
    /// independently, then merges field-by-field with primary precedence,
    /// the secondary filling only sentinel fields. Used by category
    /// listings where partial primary data beats full secondary data.
    pub async fn resolve_merged(&self, symbol: &str) -> Quote {
        let primary = self.sources.first();
        let secondary = self.sources.get(1);

        let (primary_result, secondary_result) = tokio::join!(
            fetch_optional(primary, symbol),
            fetch_optional(secondary, symbol)
        );

        match (primary_result, secondary_result) {
            (Some(mut quote), Some(fill)) => {
                quote.fill_missing_from(&fill);
                quote.fallback_source = primary.and_then(|s| s.tier());
                quote
            }
            (Some(mut quote), None) => {
                quote.fallback_source = primary.and_then(|s| s.tier());
                quote
            }
            (None, Some(mut quote)) => {
                quote.fallback_source = secondary.and_then(|s| s.tier());
                quote
            }
            (None, None) => Quote::placeholder(symbol),
        }
    }

    /// Concurrent fan-out over a symbol list. Each symbol resolves
    /// independently; one symbol's misses never affect another.
    pub async fn resolve_many(&self, symbols: &[String]) -> Vec<Quote> {
        let futures = symbols.iter().map(|symbol| self.resolve(symbol));
        join_all(futures).await
    }

    /// Fan-out for the merge variant.
    pub async fn resolve_many_merged(&self, symbols: &[String]) -> Vec<Quote> {
        let futures = symbols.iter().map(|symbol| self.resolve_merged(symbol));
        join_all(futures).await
    }
}

async fn fetch_optional(source: Option<&Arc<dyn QuoteSource>>, symbol: &str) -> Option<Quote> {
    match source {
        Some(source) => match source.fetch_quote(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                debug!(symbol, tier = ?source.tier(), "Source miss: {e}");
                None
            }
        },
        None => None,
    }
}
