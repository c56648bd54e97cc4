pub mod registry;
pub mod types;

pub use types::{ChainKind, Network, Token};
