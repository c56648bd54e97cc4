pub mod cache;
pub mod format;
pub mod ids;
pub mod provider;

pub use cache::{PriceCache, PriceEntry, DEFAULT_TTL};
pub use ids::SymbolIds;
pub use provider::{CoinGeckoClient, PriceProvider};
