use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::events::{Diagnostics, FetchEvent};

use super::ids::SymbolIds;
use super::provider::PriceProvider;

/// Default freshness window for cached prices.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached USD price and when it was fetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceEntry {
    pub usd_price: f64,
    pub fetched_at: Instant,
}

impl PriceEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// Cache-aside USD price lookup with a fixed TTL.
///
/// Only missing or stale identifiers are sent to the provider, in one call per
/// lookup. Lookups never fail: unknown symbols and failed refreshes price at 0.
pub struct PriceCache {
    provider: Arc<dyn PriceProvider>,
    ids: SymbolIds,
    ttl: Duration,
    entries: RwLock<HashMap<String, PriceEntry>>,
    diagnostics: Diagnostics,
}

impl PriceCache {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        ids: SymbolIds,
        ttl: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            provider,
            ids,
            ttl,
            entries: RwLock::new(HashMap::new()),
            diagnostics,
        }
    }

    /// USD price of one symbol, 0 when unknown or unavailable.
    pub async fn get_price(&self, symbol: &str) -> f64 {
        let prices = self.get_prices(&[symbol]).await;
        prices.get(&symbol.trim().to_uppercase()).copied().unwrap_or(0.0)
    }

    /// USD prices keyed by upper-cased symbol. Every requested symbol appears in
    /// the result.
    pub async fn get_prices<S: AsRef<str>>(&self, symbols: &[S]) -> HashMap<String, f64> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = symbols
            .iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| seen.insert(s.clone()))
            .collect();

        let mut symbol_ids = HashMap::new();
        for symbol in &unique {
            match self.ids.resolve(symbol) {
                Some(id) => {
                    symbol_ids.insert(symbol.clone(), id.to_string());
                }
                None => {
                    tracing::warn!(symbol = %symbol, "No price id for token symbol, pricing at zero");
                    self.diagnostics.emit(FetchEvent::UnknownSymbol {
                        symbol: symbol.clone(),
                    });
                }
            }
        }

        let stale: Vec<String> = {
            let now = Instant::now();
            let entries = self.entries.read().await;
            symbol_ids
                .values()
                .filter(|id| !entries.get(*id).is_some_and(|e| e.is_fresh(now, self.ttl)))
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        if !stale.is_empty() {
            self.refresh(&stale).await;
        }

        let now = Instant::now();
        let entries = self.entries.read().await;
        unique
            .into_iter()
            .map(|symbol| {
                let price = symbol_ids
                    .get(&symbol)
                    .and_then(|id| entries.get(id))
                    .filter(|e| e.is_fresh(now, self.ttl))
                    .map(|e| e.usd_price)
                    .unwrap_or(0.0);
                (symbol, price)
            })
            .collect()
    }

    async fn refresh(&self, ids: &[String]) {
        match self.provider.fetch_usd_prices(ids).await {
            Ok(prices) => {
                let fetched_at = Instant::now();
                let mut entries = self.entries.write().await;
                for id in ids {
                    match prices.get(id) {
                        Some(&usd_price) => {
                            entries.insert(id.clone(), PriceEntry { usd_price, fetched_at });
                        }
                        None => tracing::debug!(id = %id, "Price provider returned no quote"),
                    }
                }
                tracing::debug!(refreshed = prices.len(), requested = ids.len(), "Price cache refreshed");
            }
            Err(e) => {
                tracing::warn!(ids = ?ids, error = %e, "Price refresh failed, affected symbols price at zero");
                self.diagnostics.emit(FetchEvent::PriceRefreshFailed {
                    ids: ids.to_vec(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Cached entry for a provider id, fresh or not.
    pub async fn entry(&self, id: &str) -> Option<PriceEntry> {
        self.entries.read().await.get(id).copied()
    }
}
