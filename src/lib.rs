pub mod aggregator;
pub mod api;
pub mod balances;
pub mod config;
pub mod error;
pub mod events;
pub mod networks;
pub mod prices;

#[cfg(test)]
mod testing;
