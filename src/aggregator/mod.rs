pub mod snapshot;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::balances::{evm, BalanceSource};
use crate::error::AggregatorError;
use crate::events::{Diagnostics, FetchEvent};
use crate::networks::{ChainKind, Network};
use crate::prices::PriceCache;

pub use snapshot::{BalanceSnapshot, PortfolioView};

/// What readers of the aggregator observe.
#[derive(Debug, Clone)]
pub enum SnapshotState {
    /// No refresh has completed yet.
    Pending,
    Ready(Arc<PortfolioView>),
    /// The latest refresh failed as a whole. Distinct from zero balances.
    Failed { generation: u64, message: String },
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Published(Arc<PortfolioView>),
    /// A newer refresh started before this one finished; its results were dropped.
    Superseded { generation: u64 },
}

struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

/// Fans balance fetches out across wallets and networks, prices the result and
/// publishes it as a whole.
///
/// Each refresh supersedes the previous one: the older refresh is cancelled and
/// can never publish over a newer one.
pub struct Aggregator {
    networks: Vec<Arc<Network>>,
    source: Arc<dyn BalanceSource>,
    prices: Arc<PriceCache>,
    diagnostics: Diagnostics,
    in_flight: Mutex<InFlight>,
    published: watch::Sender<SnapshotState>,
}

impl Aggregator {
    pub fn new(
        networks: Vec<Network>,
        source: Arc<dyn BalanceSource>,
        prices: Arc<PriceCache>,
        diagnostics: Diagnostics,
    ) -> Self {
        let (published, _) = watch::channel(SnapshotState::Pending);
        Self {
            networks: networks.into_iter().map(Arc::new).collect(),
            source,
            prices,
            diagnostics,
            in_flight: Mutex::new(InFlight {
                generation: 0,
                cancel: CancellationToken::new(),
            }),
            published,
        }
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> + Clone {
        self.networks.iter().map(|n| n.as_ref())
    }

    pub fn prices(&self) -> &Arc<PriceCache> {
        &self.prices
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn subscribe(&self) -> watch::Receiver<SnapshotState> {
        self.published.subscribe()
    }

    pub fn current(&self) -> SnapshotState {
        self.published.borrow().clone()
    }

    /// Fetch, price and publish balances for `addresses`.
    pub async fn refresh(&self, addresses: &[String]) -> Result<RefreshOutcome, AggregatorError> {
        let (generation, cancel) = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.cancel.cancel();
            in_flight.generation += 1;
            in_flight.cancel = CancellationToken::new();
            (in_flight.generation, in_flight.cancel.clone())
        };

        tracing::info!(generation, wallets = addresses.len(), "Starting balance refresh");

        let result = tokio::select! {
            _ = cancel.cancelled() => return Ok(self.superseded(generation)),
            result = self.build(generation, addresses) => result,
        };

        // Generation check and publication happen under one lock so an older
        // refresh cannot overwrite a newer one.
        let in_flight = self.in_flight.lock().await;
        if in_flight.generation != generation {
            return Ok(self.superseded(generation));
        }

        match result {
            Ok(view) => {
                let view = Arc::new(view);
                tracing::info!(
                    generation,
                    wallets = view.wallet_totals.len(),
                    grand_total_usd = view.grand_total_usd,
                    "Balance refresh published"
                );
                self.published.send_replace(SnapshotState::Ready(view.clone()));
                Ok(RefreshOutcome::Published(view))
            }
            Err(e) => {
                tracing::error!(generation, error = %e, "Balance refresh failed");
                self.diagnostics.emit(FetchEvent::RefreshFailed {
                    generation,
                    error: e.to_string(),
                });
                self.published.send_replace(SnapshotState::Failed {
                    generation,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn superseded(&self, generation: u64) -> RefreshOutcome {
        tracing::info!(generation, "Balance refresh superseded, discarding results");
        self.diagnostics.emit(FetchEvent::RefreshSuperseded { generation });
        RefreshOutcome::Superseded { generation }
    }

    async fn build(&self, generation: u64, addresses: &[String]) -> Result<PortfolioView, AggregatorError> {
        let mut snapshot = BalanceSnapshot::default();
        let mut tasks = JoinSet::new();
        let mut seen = HashSet::new();

        for address in addresses.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
            let Some((kind, address)) = canonical_address(address) else {
                tracing::warn!(address, "Unsupported wallet address, skipping");
                self.diagnostics.emit(FetchEvent::UnsupportedAddress {
                    address: address.to_string(),
                });
                continue;
            };
            if !seen.insert(address.clone()) {
                continue;
            }

            snapshot.ensure_wallet(&address);
            for network in self.networks.iter().filter(|n| n.kind == kind) {
                let source = self.source.clone();
                let network = network.clone();
                let address = address.clone();
                tasks.spawn(async move {
                    let balances = source.fetch_network(&address, &network).await;
                    (address, network.name.clone(), balances)
                });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            let (address, network, balances) = joined
                .map_err(|e| AggregatorError::Pipeline(format!("balance task failed: {}", e)))?;
            snapshot.insert(address, network, balances);
        }

        let symbols: Vec<String> = snapshot.symbols().into_iter().collect();
        let prices = if symbols.is_empty() {
            HashMap::new()
        } else {
            self.prices.get_prices(&symbols).await
        };

        tracing::debug!(generation, symbols = symbols.len(), "Balances fetched and priced");
        Ok(PortfolioView::value(generation, snapshot, prices))
    }
}

/// Classify a wallet address and normalise it for use as a snapshot key.
///
/// EVM addresses are case-insensitive and keyed by their checksummed form;
/// Solana addresses are case-sensitive and kept as given.
fn canonical_address(address: &str) -> Option<(ChainKind, String)> {
    match ChainKind::for_address(address)? {
        ChainKind::Evm => {
            let parsed = evm::parse_address(address).ok()?;
            Some((ChainKind::Evm, parsed.to_string()))
        }
        ChainKind::Solana => Some((ChainKind::Solana, address.to_string())),
    }
}
