use alloy::primitives::Address;
use std::str::FromStr;

use crate::config::{ChainKindConfig, NetworkConfig, TokenConfig};

use super::types::{ChainKind, Network, Token};

/// Chain id LI.FI and most bridge aggregators use for Solana mainnet.
pub const SOLANA_CHAIN_ID: u64 = 1151111081099710;

fn token(symbol: &str, address: &str, decimals: u8) -> TokenConfig {
    TokenConfig {
        symbol: symbol.to_string(),
        address: address.to_string(),
        decimals,
    }
}

fn evm_network(
    name: &str,
    chain_id: u64,
    rpc_http: &str,
    explorer: &str,
    tokens: Vec<TokenConfig>,
) -> NetworkConfig {
    NetworkConfig {
        name: name.to_string(),
        chain_id,
        rpc_http: rpc_http.to_string(),
        currency: "ETH".to_string(),
        explorer: explorer.to_string(),
        kind: ChainKindConfig::Evm,
        tokens,
    }
}

/// Compiled-in network table, used when the config file lists no networks.
pub fn default_network_configs() -> Vec<NetworkConfig> {
    vec![
        evm_network(
            "Ethereum",
            1,
            "https://eth.llamarpc.com",
            "https://etherscan.io",
            vec![
                token("USDC", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6),
                token("USDT", "0xdAC17F958D2ee523a2206206994597C13D831ec7", 6),
                token("DAI", "0x6B175474E89094C44Da98b954EedeAC495271d0F", 18),
                token("WETH", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18),
            ],
        ),
        evm_network(
            "Base",
            8453,
            "https://base.llamarpc.com",
            "https://basescan.org",
            vec![
                token("USDC", "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", 6),
                token("DAI", "0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb", 18),
                token("WETH", "0x4200000000000000000000000000000000000006", 18),
            ],
        ),
        evm_network(
            "Optimism",
            10,
            "https://optimism.llamarpc.com",
            "https://optimistic.etherscan.io",
            vec![
                token("USDC", "0x7F5c764cBc14f9669B88837ca1490cCa17c31607", 6),
                token("USDT", "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58", 6),
                token("DAI", "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1", 18),
                token("WETH", "0x4200000000000000000000000000000000000006", 18),
            ],
        ),
        evm_network(
            "Arbitrum One",
            42161,
            "https://arbitrum.llamarpc.com",
            "https://arbiscan.io",
            vec![
                token("USDC", "0xaf88d065e77c8cC2239327C5EDb3A432268e5831", 6),
                token("USDT", "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", 6),
                token("DAI", "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1", 18),
                token("WETH", "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", 18),
            ],
        ),
        NetworkConfig {
            name: "Solana".to_string(),
            chain_id: SOLANA_CHAIN_ID,
            rpc_http: "https://api.mainnet-beta.solana.com".to_string(),
            currency: "SOL".to_string(),
            explorer: "https://solscan.io".to_string(),
            kind: ChainKindConfig::Solana,
            tokens: vec![],
        },
    ]
}

/// Build the runtime network list from config, parsing token addresses.
pub fn build_networks(configs: &[NetworkConfig]) -> eyre::Result<Vec<Network>> {
    let mut networks = Vec::with_capacity(configs.len());
    for config in configs {
        let mut tokens = Vec::with_capacity(config.tokens.len());
        for token in &config.tokens {
            let address = Address::from_str(&token.address).map_err(|e| {
                eyre::eyre!(
                    "Invalid address '{}' for {} on {}: {}",
                    token.address,
                    token.symbol,
                    config.name,
                    e
                )
            })?;
            tokens.push(Token {
                symbol: token.symbol.clone(),
                address,
                decimals: token.decimals,
            });
        }

        let kind = match config.kind {
            ChainKindConfig::Evm => ChainKind::Evm,
            ChainKindConfig::Solana => ChainKind::Solana,
        };

        tracing::debug!(
            network = %config.name,
            chain_id = config.chain_id,
            kind = kind.as_str(),
            tokens = tokens.len(),
            "Registered network"
        );

        networks.push(Network {
            name: config.name.clone(),
            chain_id: config.chain_id,
            rpc_http: config.rpc_http.clone(),
            currency: config.currency.clone(),
            explorer: config.explorer.clone(),
            kind,
            tokens,
        });
    }
    Ok(networks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_builds() {
        let networks = build_networks(&default_network_configs()).unwrap();
        let names: Vec<_> = networks.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Ethereum", "Base", "Optimism", "Arbitrum One", "Solana"]
        );

        let base = networks.iter().find(|n| n.chain_id == 8453).unwrap();
        assert_eq!(base.tokens[0].symbol, "USDC");
        assert_eq!(base.tokens[0].decimals, 6);

        let solana = networks.last().unwrap();
        assert_eq!(solana.kind, ChainKind::Solana);
        assert!(solana.tokens.is_empty());
    }

    #[test]
    fn test_token_order_is_preserved() {
        let networks = build_networks(&default_network_configs()).unwrap();
        let symbols: Vec<_> = networks[0].tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["USDC", "USDT", "DAI", "WETH"]);
    }
}
