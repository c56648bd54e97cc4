pub mod evm;
pub mod rpc;
pub mod solana;
pub mod units;

use alloy::primitives::U256;
use async_trait::async_trait;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;

use crate::config::RpcConfig;
use crate::error::FetchError;
use crate::events::{Diagnostics, FetchEvent};
use crate::networks::{ChainKind, Network, Token};

use self::rpc::RpcPolicy;
use self::units::format_units;

/// One token holding on one network. Recomputed on every fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenBalance {
    pub token: Token,
    /// Integer amount in the token's base units, as a decimal string.
    pub raw_balance: String,
    /// Amount scaled by the token's decimals.
    pub formatted_balance: String,
}

/// Everything fetched for one wallet on one network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkBalances {
    pub native_symbol: String,
    pub native_balance: String,
    pub token_balances: Vec<TokenBalance>,
}

/// Per-network balance lookup used by the aggregator's fan-out.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch_network(&self, address: &str, network: &Network) -> NetworkBalances;
}

/// Queries native and ERC-20 balances. Failures never escape: a failed cell is
/// logged, reported on the diagnostics channel and degraded to zero.
pub struct BalanceFetcher {
    providers: HashMap<u64, DynProvider>,
    http: reqwest::Client,
    policy: RpcPolicy,
    diagnostics: Diagnostics,
    report_zero_balances: bool,
}

impl BalanceFetcher {
    pub fn new(networks: &[Network], rpc: &RpcConfig, diagnostics: Diagnostics) -> eyre::Result<Self> {
        let mut providers = HashMap::new();
        for network in networks.iter().filter(|n| n.kind == ChainKind::Evm) {
            let provider = connect(network)
                .map_err(|e| eyre::eyre!("Invalid RPC URL for {}: {}", network.name, e))?;
            providers.insert(network.chain_id, provider);
        }

        Ok(Self {
            providers,
            http: reqwest::Client::new(),
            policy: RpcPolicy::new(rpc),
            diagnostics,
            report_zero_balances: false,
        })
    }

    /// Keep tokens whose balance is zero instead of dropping them.
    pub fn report_zero_balances(mut self, enabled: bool) -> Self {
        self.report_zero_balances = enabled;
        self
    }

    fn provider(&self, network: &Network) -> Result<DynProvider, FetchError> {
        match self.providers.get(&network.chain_id) {
            Some(provider) => Ok(provider.clone()),
            None => connect(network),
        }
    }

    /// Native balance as a decimal string; `"0"` when the call fails.
    pub async fn fetch_native_balance(&self, address: &str, network: &Network) -> String {
        match self.try_native_balance(address, network).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(
                    network = %network.name,
                    address,
                    kind = e.kind(),
                    error = %e,
                    "Native balance unavailable, reporting zero"
                );
                self.diagnostics.emit(FetchEvent::NativeBalanceDegraded {
                    network: network.name.clone(),
                    address: address.to_string(),
                    kind: e.kind(),
                    error: e.to_string(),
                });
                "0".to_string()
            }
        }
    }

    async fn try_native_balance(&self, address: &str, network: &Network) -> Result<String, FetchError> {
        let raw = match network.kind {
            ChainKind::Evm => {
                let owner = evm::parse_address(address)?;
                let provider = self.provider(network)?;
                self.policy
                    .call(&network.name, "eth_getBalance", || {
                        evm::native_balance(&provider, owner)
                    })
                    .await?
            }
            ChainKind::Solana => {
                self.policy
                    .call(&network.name, "getBalance", || {
                        solana::native_balance(&self.http, &network.rpc_http, address)
                    })
                    .await?
            }
        };
        format_units(raw, network.kind.native_decimals())
    }

    /// Balances of `tokens` on `network`, in token order.
    ///
    /// Token calls run concurrently and fail independently; a failed token is
    /// omitted. Zero balances are dropped unless zero reporting is enabled.
    pub async fn fetch_token_balances(
        &self,
        address: &str,
        network: &Network,
        tokens: &[Token],
    ) -> Vec<TokenBalance> {
        if network.kind != ChainKind::Evm || tokens.is_empty() {
            return Vec::new();
        }

        let results = join_all(
            tokens
                .iter()
                .map(|token| self.try_token_balance(address, network, token)),
        )
        .await;

        let mut balances = Vec::new();
        for (token, result) in tokens.iter().zip(results) {
            match result {
                Ok((raw, balance)) => {
                    if self.report_zero_balances || !raw.is_zero() {
                        balances.push(balance);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        network = %network.name,
                        address,
                        symbol = %token.symbol,
                        kind = e.kind(),
                        error = %e,
                        "Token balance unavailable, skipping"
                    );
                    self.diagnostics.emit(FetchEvent::TokenBalanceDegraded {
                        network: network.name.clone(),
                        address: address.to_string(),
                        symbol: token.symbol.clone(),
                        kind: e.kind(),
                        error: e.to_string(),
                    });
                }
            }
        }
        balances
    }

    async fn try_token_balance(
        &self,
        address: &str,
        network: &Network,
        token: &Token,
    ) -> Result<(U256, TokenBalance), FetchError> {
        let owner = evm::parse_address(address)?;
        let provider = self.provider(network)?;
        let raw = self
            .policy
            .call(&network.name, "eth_call", || {
                evm::token_balance(&provider, token.address, owner)
            })
            .await?;

        let balance = TokenBalance {
            token: token.clone(),
            raw_balance: raw.to_string(),
            formatted_balance: format_units(raw, token.decimals)?,
        };
        Ok((raw, balance))
    }

    /// Native and token balances for one wallet on one network, fetched concurrently.
    pub async fn fetch_network(&self, address: &str, network: &Network) -> NetworkBalances {
        let (native_balance, token_balances) = tokio::join!(
            self.fetch_native_balance(address, network),
            self.fetch_token_balances(address, network, &network.tokens),
        );

        NetworkBalances {
            native_symbol: network.currency.clone(),
            native_balance,
            token_balances,
        }
    }
}

#[async_trait]
impl BalanceSource for BalanceFetcher {
    async fn fetch_network(&self, address: &str, network: &Network) -> NetworkBalances {
        BalanceFetcher::fetch_network(self, address, network).await
    }
}

fn connect(network: &Network) -> Result<DynProvider, FetchError> {
    let url = network
        .rpc_http
        .parse()
        .map_err(|e| FetchError::Transport(format!("invalid RPC URL '{}': {}", network.rpc_http, e)))?;
    Ok(ProviderBuilder::new().connect_http(url).erased())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::registry::SOLANA_CHAIN_ID;
    use crate::testing::{call_target, mount_rpc, word, Reply};
    use serde_json::json;
    use std::str::FromStr;

    const WALLET: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";
    const USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

    fn rpc_config() -> RpcConfig {
        RpcConfig {
            timeout_ms: 2_000,
            max_retries: 0,
            retry_base_delay_ms: 1,
            max_concurrency: 8,
        }
    }

    fn token(symbol: &str, address: &str, decimals: u8) -> Token {
        Token {
            symbol: symbol.to_string(),
            address: alloy::primitives::Address::from_str(address).unwrap(),
            decimals,
        }
    }

    fn evm_network(rpc_http: String, tokens: Vec<Token>) -> Network {
        Network {
            name: "Ethereum".to_string(),
            chain_id: 1,
            rpc_http,
            currency: "ETH".to_string(),
            explorer: "https://etherscan.io".to_string(),
            kind: ChainKind::Evm,
            tokens,
        }
    }

    fn fetcher(network: &Network) -> BalanceFetcher {
        BalanceFetcher::new(std::slice::from_ref(network), &rpc_config(), Diagnostics::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_native_balance_is_scaled_by_18_decimals() {
        let server = mount_rpc(|method, params| {
            assert_eq!(method, "eth_getBalance");
            assert_eq!(params[1], "latest");
            Reply::Result(json!("0xde0b6b3a7640000"))
        })
        .await;
        let network = evm_network(server.uri(), vec![]);

        assert_eq!(fetcher(&network).fetch_native_balance(WALLET, &network).await, "1.0");
    }

    #[tokio::test]
    async fn test_native_balance_degrades_to_zero() {
        let replies: [fn() -> Reply; 3] = [
            || Reply::HttpError,
            || Reply::Empty,
            || Reply::Error(-32000, "header not found"),
        ];
        for reply in replies {
            let server = mount_rpc(move |_, _| reply()).await;
            let network = evm_network(server.uri(), vec![]);
            assert_eq!(fetcher(&network).fetch_native_balance(WALLET, &network).await, "0");
        }
    }

    #[tokio::test]
    async fn test_native_failure_is_reported() {
        let server = mount_rpc(|_, _| Reply::HttpError).await;
        let network = evm_network(server.uri(), vec![]);
        let fetcher = fetcher(&network);
        let mut events = fetcher.diagnostics.subscribe();

        fetcher.fetch_native_balance(WALLET, &network).await;

        match events.recv().await.unwrap() {
            FetchEvent::NativeBalanceDegraded { network, kind, .. } => {
                assert_eq!(network, "Ethereum");
                assert_eq!(kind, "transport");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_address_degrades_without_rpc() {
        let server = mount_rpc(|_, _| panic!("no RPC expected")).await;
        let network = evm_network(server.uri(), vec![token("USDC", USDC, 6)]);
        let fetcher = fetcher(&network);

        assert_eq!(fetcher.fetch_native_balance("0x1234", &network).await, "0");
        assert!(fetcher.fetch_token_balances("0x1234", &network, &network.tokens).await.is_empty());
    }

    #[tokio::test]
    async fn test_token_balances_drop_zero_and_keep_order() {
        let server = mount_rpc(|method, params| {
            assert_eq!(method, "eth_call");
            let data = params[0]["input"]
                .as_str()
                .or_else(|| params[0]["data"].as_str())
                .unwrap_or_default();
            assert!(data.starts_with("0x70a08231"));
            match call_target(params).as_str() {
                USDC => Reply::Result(json!(word(5_000_000))),
                DAI => Reply::Result(json!(word(0))),
                USDT => Reply::Result(json!(word(2_500_000))),
                _ => Reply::HttpError,
            }
        })
        .await;
        let network = evm_network(
            server.uri(),
            vec![token("USDC", USDC, 6), token("DAI", DAI, 18), token("USDT", USDT, 6)],
        );

        let balances = fetcher(&network)
            .fetch_token_balances(WALLET, &network, &network.tokens)
            .await;

        let summary: Vec<_> = balances
            .iter()
            .map(|b| (b.token.symbol.as_str(), b.formatted_balance.as_str()))
            .collect();
        assert_eq!(summary, vec![("USDC", "5.0"), ("USDT", "2.5")]);
        assert_eq!(balances[0].raw_balance, "5000000");
    }

    #[tokio::test]
    async fn test_zero_balances_reported_when_enabled() {
        let server = mount_rpc(|_, _| Reply::Result(json!(word(0)))).await;
        let network = evm_network(server.uri(), vec![token("DAI", DAI, 18)]);

        let balances = fetcher(&network)
            .report_zero_balances(true)
            .fetch_token_balances(WALLET, &network, &network.tokens)
            .await;
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].formatted_balance, "0.0");
    }

    #[tokio::test]
    async fn test_failing_token_does_not_abort_siblings() {
        let server = mount_rpc(|_, params| match call_target(params).as_str() {
            USDC => Reply::HttpError,
            DAI => Reply::Empty,
            _ => Reply::Result(json!(word(1_000_000))),
        })
        .await;
        let network = evm_network(
            server.uri(),
            vec![token("USDC", USDC, 6), token("DAI", DAI, 18), token("USDT", USDT, 6)],
        );

        let balances = fetcher(&network)
            .fetch_token_balances(WALLET, &network, &network.tokens)
            .await;
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].token.symbol, "USDT");
        assert_eq!(balances[0].formatted_balance, "1.0");
    }

    #[tokio::test]
    async fn test_fetch_network_combines_native_and_tokens() {
        let server = mount_rpc(|method, params| match method {
            "eth_getBalance" => Reply::Result(json!("0x0")),
            _ if call_target(params) == USDC => Reply::Result(json!(word(5_000_000))),
            _ => Reply::Result(json!(word(0))),
        })
        .await;
        let network = evm_network(server.uri(), vec![token("USDC", USDC, 6), token("DAI", DAI, 18)]);

        let balances = fetcher(&network).fetch_network(WALLET, &network).await;
        assert_eq!(balances.native_symbol, "ETH");
        assert_eq!(balances.native_balance, "0.0");
        assert_eq!(balances.token_balances.len(), 1);
        assert_eq!(balances.token_balances[0].formatted_balance, "5.0");
    }

    #[tokio::test]
    async fn test_solana_native_balance_uses_lamports() {
        let server = mount_rpc(|method, _| {
            assert_eq!(method, "getBalance");
            Reply::Result(json!({ "context": { "slot": 7 }, "value": 2_000_000_000u64 }))
        })
        .await;
        let network = Network {
            name: "Solana".to_string(),
            chain_id: SOLANA_CHAIN_ID,
            rpc_http: server.uri(),
            currency: "SOL".to_string(),
            explorer: "https://solscan.io".to_string(),
            kind: ChainKind::Solana,
            tokens: vec![],
        };

        let balances = fetcher(&network)
            .fetch_network("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM", &network)
            .await;
        assert_eq!(balances.native_balance, "2.0");
        assert!(balances.token_balances.is_empty());
    }
}
