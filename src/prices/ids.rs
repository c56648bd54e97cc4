use std::collections::HashMap;

const BUILTIN_IDS: &[(&str, &str)] = &[
    ("ETH", "ethereum"),
    ("WETH", "weth"),
    ("USDC", "usd-coin"),
    ("USDT", "tether"),
    ("DAI", "dai"),
    ("SOL", "solana"),
];

/// Case-insensitive token symbol -> price provider identifier table.
#[derive(Debug, Clone)]
pub struct SymbolIds {
    ids: HashMap<String, String>,
}

impl SymbolIds {
    pub fn builtin() -> Self {
        Self {
            ids: BUILTIN_IDS
                .iter()
                .map(|(symbol, id)| (symbol.to_string(), id.to_string()))
                .collect(),
        }
    }

    /// Built-in table with `extra` entries added or replacing existing ones.
    pub fn with_overrides(extra: &HashMap<String, String>) -> Self {
        let mut table = Self::builtin();
        for (symbol, id) in extra {
            table.ids.insert(symbol.to_uppercase(), id.clone());
        }
        table
    }

    pub fn resolve(&self, symbol: &str) -> Option<&str> {
        self.ids.get(&symbol.to_uppercase()).map(String::as_str)
    }
}

impl Default for SymbolIds {
    fn default() -> Self {
        Self::builtin()
    }
}
