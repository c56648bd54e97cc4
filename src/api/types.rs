use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::aggregator::PortfolioView;
use crate::networks::{ChainKind, Network};
use crate::prices::format::{format_balance, format_usd_value, usd_value};

// ============================================================
// Query params & request bodies
// ============================================================

#[derive(Debug, Deserialize)]
pub struct PortfolioParams {
    pub network: Option<String>,
    pub wallet: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Falls back to the configured addresses when empty.
    #[serde(default)]
    pub addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PriceParams {
    /// Comma-separated symbols, e.g. `ETH,USDC`.
    pub symbols: String,
}

// ============================================================
// Responses
// ============================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub networks: usize,
    pub last_generation: Option<u64>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
    pub kind: ChainKind,
    pub currency: String,
    pub explorer: String,
    pub tokens: Vec<TokenInfo>,
}

#[derive(Debug, Serialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

impl From<&Network> for NetworkInfo {
    fn from(network: &Network) -> Self {
        Self {
            name: network.name.clone(),
            chain_id: network.chain_id,
            kind: network.kind,
            currency: network.currency.clone(),
            explorer: network.explorer.clone(),
            tokens: network
                .tokens
                .iter()
                .map(|t| TokenInfo {
                    symbol: t.symbol.clone(),
                    address: t.address.to_string(),
                    decimals: t.decimals,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PortfolioResponse {
    pub generation: u64,
    pub refreshed_at: DateTime<Utc>,
    pub grand_total_usd: f64,
    pub grand_total_display: String,
    pub network_totals: BTreeMap<String, f64>,
    pub prices: BTreeMap<String, f64>,
    pub wallets: Vec<WalletPortfolio>,
}

#[derive(Debug, Serialize)]
pub struct WalletPortfolio {
    pub address: String,
    pub total_usd: f64,
    pub total_display: String,
    /// Native balance on every configured network, `"0"` where not fetched.
    pub native_balances: BTreeMap<String, String>,
    pub networks: Vec<WalletNetwork>,
}

#[derive(Debug, Serialize)]
pub struct WalletNetwork {
    pub network: String,
    pub explorer_url: Option<String>,
    pub native_symbol: String,
    pub native_balance: String,
    pub native_display: String,
    pub native_usd: f64,
    pub tokens: Vec<TokenHolding>,
}

#[derive(Debug, Serialize)]
pub struct TokenHolding {
    pub symbol: String,
    pub contract: String,
    pub raw_balance: String,
    pub balance: String,
    pub display: String,
    pub usd_value: f64,
}

impl PortfolioResponse {
    pub fn build<'a>(view: &PortfolioView, networks: impl IntoIterator<Item = &'a Network> + Clone) -> Self {
        let prices: HashMap<String, f64> = view.prices.iter().map(|(k, v)| (k.clone(), *v)).collect();

        let wallets = view
            .snapshot
            .wallets()
            .map(|(address, cells)| {
                let total_usd = view.wallet_totals.get(address).copied().unwrap_or(0.0);
                let networks_out = cells
                    .iter()
                    .map(|(name, balances)| WalletNetwork {
                        network: name.clone(),
                        explorer_url: networks
                            .clone()
                            .into_iter()
                            .find(|n| &n.name == name)
                            .map(|n| n.address_url(address)),
                        native_symbol: balances.native_symbol.clone(),
                        native_balance: balances.native_balance.clone(),
                        native_display: format_balance(&balances.native_balance, &balances.native_symbol),
                        native_usd: usd_value(&balances.native_balance, &balances.native_symbol, &prices),
                        tokens: balances
                            .token_balances
                            .iter()
                            .map(|b| TokenHolding {
                                symbol: b.token.symbol.clone(),
                                contract: b.token.address.to_string(),
                                raw_balance: b.raw_balance.clone(),
                                balance: b.formatted_balance.clone(),
                                display: format_balance(&b.formatted_balance, &b.token.symbol),
                                usd_value: usd_value(&b.formatted_balance, &b.token.symbol, &prices),
                            })
                            .collect(),
                    })
                    .collect();

                WalletPortfolio {
                    address: address.clone(),
                    total_usd,
                    total_display: format_usd_value(total_usd),
                    native_balances: view.native_balances_for(address, networks.clone()),
                    networks: networks_out,
                }
            })
            .collect();

        Self {
            generation: view.generation,
            refreshed_at: view.refreshed_at,
            grand_total_usd: view.grand_total_usd,
            grand_total_display: format_usd_value(view.grand_total_usd),
            network_totals: view.network_totals.clone(),
            prices: view.prices.clone(),
            wallets,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PricesResponse {
    pub prices: BTreeMap<String, f64>,
}
