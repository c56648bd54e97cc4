use serde::Serialize;
use tokio::sync::broadcast;

/// Something the pipeline absorbed instead of failing on.
///
/// Every degraded cell, unpriced symbol and discarded refresh is reported here
/// so callers can surface diagnostics without scraping logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FetchEvent {
    NativeBalanceDegraded {
        network: String,
        address: String,
        kind: &'static str,
        error: String,
    },
    TokenBalanceDegraded {
        network: String,
        address: String,
        symbol: String,
        kind: &'static str,
        error: String,
    },
    UnknownSymbol {
        symbol: String,
    },
    PriceRefreshFailed {
        ids: Vec<String>,
        error: String,
    },
    UnsupportedAddress {
        address: String,
    },
    RefreshSuperseded {
        generation: u64,
    },
    RefreshFailed {
        generation: u64,
        error: String,
    },
}

/// Broadcast channel for [`FetchEvent`]s. Cheap to clone; emitting with no
/// subscribers is a no-op.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    tx: broadcast::Sender<FetchEvent>,
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FetchEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: FetchEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(256)
    }
}
