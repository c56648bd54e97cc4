use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::balances::NetworkBalances;
use crate::networks::Network;
use crate::prices::format::usd_value;

/// wallet address -> network name -> balances, built fresh on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BalanceSnapshot {
    wallets: BTreeMap<String, BTreeMap<String, NetworkBalances>>,
}

impl BalanceSnapshot {
    /// Register a wallet even if no network ends up reporting for it.
    pub fn ensure_wallet(&mut self, wallet: &str) {
        self.wallets.entry(wallet.to_string()).or_default();
    }

    pub fn insert(&mut self, wallet: String, network: String, balances: NetworkBalances) {
        self.wallets.entry(wallet).or_default().insert(network, balances);
    }

    pub fn get(&self, wallet: &str, network: &str) -> Option<&NetworkBalances> {
        self.wallets.get(wallet)?.get(network)
    }

    pub fn wallet(&self, wallet: &str) -> Option<&BTreeMap<String, NetworkBalances>> {
        self.wallets.get(wallet)
    }

    pub fn wallets(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, NetworkBalances>)> {
        self.wallets.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /// Every native and token symbol present, upper-cased.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        for networks in self.wallets.values() {
            for balances in networks.values() {
                symbols.insert(balances.native_symbol.to_uppercase());
                for token in &balances.token_balances {
                    symbols.insert(token.token.symbol.to_uppercase());
                }
            }
        }
        symbols
    }

    fn filtered(&self, network: Option<&str>, wallet: Option<&str>) -> Self {
        let wallets = self
            .wallets
            .iter()
            .filter(|(address, _)| wallet.map_or(true, |w| w.eq_ignore_ascii_case(address)))
            .map(|(address, networks)| {
                let networks = networks
                    .iter()
                    .filter(|(name, _)| network.map_or(true, |n| n == name.as_str()))
                    .map(|(name, balances)| (name.clone(), balances.clone()))
                    .collect();
                (address.clone(), networks)
            })
            .collect();
        Self { wallets }
    }
}

/// USD value of one wallet's holdings on one network.
pub fn cell_usd_value(balances: &NetworkBalances, prices: &HashMap<String, f64>) -> f64 {
    let native = usd_value(&balances.native_balance, &balances.native_symbol, prices);
    let tokens: f64 = balances
        .token_balances
        .iter()
        .map(|b| usd_value(&b.formatted_balance, &b.token.symbol, prices))
        .sum();
    native + tokens
}

/// The published result of one refresh: balances plus their USD valuation.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub generation: u64,
    pub refreshed_at: DateTime<Utc>,
    pub snapshot: BalanceSnapshot,
    /// USD price per upper-cased symbol; 0 when unavailable.
    pub prices: BTreeMap<String, f64>,
    /// Sum across all wallets, per network.
    pub network_totals: BTreeMap<String, f64>,
    pub wallet_totals: BTreeMap<String, f64>,
    pub grand_total_usd: f64,
}

impl PortfolioView {
    pub fn value(generation: u64, snapshot: BalanceSnapshot, prices: HashMap<String, f64>) -> Self {
        Self::value_at(generation, Utc::now(), snapshot, prices)
    }

    fn value_at(
        generation: u64,
        refreshed_at: DateTime<Utc>,
        snapshot: BalanceSnapshot,
        prices: HashMap<String, f64>,
    ) -> Self {
        let mut network_totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut wallet_totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut grand_total_usd = 0.0;

        for (wallet, networks) in snapshot.wallets() {
            let wallet_total = wallet_totals.entry(wallet.clone()).or_default();
            for (network, balances) in networks {
                let value = cell_usd_value(balances, &prices);
                *network_totals.entry(network.clone()).or_default() += value;
                *wallet_total += value;
                grand_total_usd += value;
            }
        }

        Self {
            generation,
            refreshed_at,
            snapshot,
            prices: prices.into_iter().collect(),
            network_totals,
            wallet_totals,
            grand_total_usd,
        }
    }

    /// View restricted to one network and/or one wallet, totals recomputed.
    pub fn select(&self, network: Option<&str>, wallet: Option<&str>) -> Self {
        let prices = self.prices.iter().map(|(k, v)| (k.clone(), *v)).collect();
        Self::value_at(
            self.generation,
            self.refreshed_at,
            self.snapshot.filtered(network, wallet),
            prices,
        )
    }

    pub fn network_total(&self, network: &str) -> f64 {
        self.network_totals.get(network).copied().unwrap_or(0.0)
    }

    /// Native balance per configured network for one wallet, `"0"` where nothing
    /// was fetched.
    pub fn native_balances_for<'a>(
        &self,
        wallet: &str,
        networks: impl IntoIterator<Item = &'a Network>,
    ) -> BTreeMap<String, String> {
        networks
            .into_iter()
            .map(|network| {
                let balance = self
                    .snapshot
                    .get(wallet, &network.name)
                    .map(|b| b.native_balance.clone())
                    .unwrap_or_else(|| "0".to_string());
                (network.name.clone(), balance)
            })
            .collect()
    }
}
