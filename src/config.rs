use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::networks::registry;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "registry::default_network_configs")]
    pub networks: Vec<NetworkConfig>,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub prices: PriceConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChainKindConfig {
    #[default]
    Evm,
    Solana,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_http: String,
    pub currency: String,
    pub explorer: String,
    #[serde(default)]
    pub kind: ChainKindConfig,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

// ============================================================
// RPC Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_rpc_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_max_concurrency() -> usize {
    16
}

// ============================================================
// Price Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct PriceConfig {
    #[serde(default = "default_price_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_price_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_price_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra symbol -> provider id mappings, merged over the built-in table.
    #[serde(default)]
    pub ids: HashMap<String, String>,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            base_url: default_price_base_url(),
            api_key: None,
            ttl_secs: default_price_ttl_secs(),
            timeout_ms: default_price_timeout_ms(),
            ids: HashMap::new(),
        }
    }
}

fn default_price_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_price_ttl_secs() -> u64 {
    300
}

fn default_price_timeout_ms() -> u64 {
    10_000
}

// ============================================================
// Refresh Config
// ============================================================

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RefreshConfig {
    /// Wallet addresses refreshed by the background loop.
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Background refresh period; `None` disables the loop.
    pub interval_secs: Option<u64>,
    #[serde(default)]
    pub report_zero_token_balances: bool,
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_api_port(),
            host: default_api_host(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            networks: registry::default_network_configs(),
            rpc: RpcConfig::default(),
            prices: PriceConfig::default(),
            refresh: RefreshConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl PriceConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if self.networks.is_empty() {
            return Err(eyre::eyre!("At least one network must be configured"));
        }
        if self.rpc.max_concurrency == 0 {
            return Err(eyre::eyre!("rpc.max_concurrency must be greater than zero"));
        }
        if self.prices.ttl_secs == 0 {
            return Err(eyre::eyre!("prices.ttl_secs must be greater than zero"));
        }

        let mut chain_ids = HashSet::new();
        for network in &self.networks {
            if !chain_ids.insert(network.chain_id) {
                return Err(eyre::eyre!(
                    "Duplicate chain id {} on network '{}'",
                    network.chain_id,
                    network.name
                ));
            }
            if network.kind == ChainKindConfig::Solana && !network.tokens.is_empty() {
                return Err(eyre::eyre!(
                    "Network '{}' is a Solana network and cannot list ERC-20 tokens",
                    network.name
                ));
            }
            for token in &network.tokens {
                let hex_ok = token
                    .address
                    .strip_prefix("0x")
                    .is_some_and(|h| h.len() == 40 && h.chars().all(|c| c.is_ascii_hexdigit()));
                if !hex_ok {
                    return Err(eyre::eyre!(
                        "Invalid token address '{}' for {} on network '{}'",
                        token.address,
                        token.symbol,
                        network.name
                    ));
                }
                if token.decimals > 77 {
                    return Err(eyre::eyre!(
                        "Token {} on network '{}' declares {} decimals (max 77)",
                        token.symbol,
                        network.name,
                        token.decimals
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[rpc]
timeout_ms = 5000

[[networks]]
name = "Ethereum"
chain_id = 1
rpc_http = "http://localhost:8545"
currency = "ETH"
explorer = "https://etherscan.io"

[[networks.tokens]]
symbol = "USDC"
address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
decimals = 6

[[networks]]
name = "Solana"
chain_id = 1151111081099710
rpc_http = "http://localhost:8899"
currency = "SOL"
explorer = "https://solscan.io"
kind = "solana"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.networks.len(), 2);
        assert_eq!(config.networks[0].kind, ChainKindConfig::Evm);
        assert_eq!(config.networks[0].tokens[0].decimals, 6);
        assert_eq!(config.networks[1].kind, ChainKindConfig::Solana);
        assert_eq!(config.rpc.timeout_ms, 5000);
        assert_eq!(config.rpc.max_retries, 2); // default
        assert_eq!(config.prices.ttl_secs, 300); // default
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_networks_fall_back_to_registry() {
        let config: Config = toml::from_str("[api]\nport = 8080\n").unwrap();
        assert_eq!(config.api.port, 8080);
        assert!(config.networks.iter().any(|n| n.name == "Ethereum"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_api_section_matches_default() {
        let config: Config = toml::from_str("[api]\n").unwrap();
        let default = ApiConfig::default();
        assert_eq!(config.api.enabled, default.enabled);
        assert_eq!(config.api.port, default.port);
        assert_eq!(config.api.host, default.host);
    }

    #[test]
    fn test_validate_empty_networks() {
        let config = Config {
            networks: vec![],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_chain_id() {
        let mut config = Config::default();
        let mut dup = config.networks[0].clone();
        dup.name = "Shadow".to_string();
        config.networks.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_address() {
        let config = Config {
            networks: vec![NetworkConfig {
                name: "test".to_string(),
                chain_id: 1,
                rpc_http: "http://localhost:8545".to_string(),
                currency: "ETH".to_string(),
                explorer: "https://etherscan.io".to_string(),
                kind: ChainKindConfig::Evm,
                tokens: vec![TokenConfig {
                    symbol: "BAD".to_string(),
                    address: "not-an-address".to_string(),
                    decimals: 6,
                }],
            }],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
