use alloy::primitives::Address;
use serde::Serialize;

/// Which fetch path a network (and a wallet address) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Evm,
    Solana,
}

impl ChainKind {
    /// Classify a wallet address by its textual form.
    ///
    /// EVM: `0x` followed by 40 hex digits. Solana: 32 to 44 base58 characters.
    /// Anything else is unsupported.
    pub fn for_address(address: &str) -> Option<Self> {
        if let Some(hex) = address.strip_prefix("0x") {
            return (hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
                .then_some(Self::Evm);
        }

        let base58 = (32..=44).contains(&address.len())
            && address
                .chars()
                .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'));
        base58.then_some(Self::Solana)
    }

    /// Decimals of the chain's native currency (wei, lamports).
    pub fn native_decimals(&self) -> u8 {
        match self {
            Self::Evm => 18,
            Self::Solana => 9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
        }
    }
}

/// A fungible token contract tracked on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

/// A supported chain. Identified by `chain_id`; immutable after startup.
#[derive(Debug, Clone, Serialize)]
pub struct Network {
    pub name: String,
    pub chain_id: u64,
    #[serde(skip)]
    pub rpc_http: String,
    /// Native currency symbol, e.g. `ETH`.
    pub currency: String,
    pub explorer: String,
    pub kind: ChainKind,
    /// Known tokens, in display order.
    pub tokens: Vec<Token>,
}

impl Network {
    pub fn address_url(&self, address: &str) -> String {
        match self.kind {
            ChainKind::Evm => format!("{}/address/{}", self.explorer, address),
            ChainKind::Solana => format!("{}/account/{}", self.explorer, address),
        }
    }
}
