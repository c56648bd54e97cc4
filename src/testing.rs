//! Shared fixtures for unit tests: a JSON-RPC mock endpoint and a counting
//! price provider.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::balances::{BalanceSource, NetworkBalances};
use crate::error::PriceError;
use crate::networks::Network;
use crate::prices::PriceProvider;

pub enum Reply {
    Result(Value),
    Error(i64, &'static str),
    /// A response carrying neither `result` nor `error`.
    Empty,
    /// An HTTP 500 with no JSON-RPC body.
    HttpError,
    /// A successful result delivered after a delay.
    Slow(Value, Duration),
}

struct RpcStub<F>(F);

impl<F> Respond for RpcStub<F>
where
    F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
{
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let id = body["id"].clone();
        let rpc_method = body["method"].as_str().unwrap_or_default();

        let payload = match (self.0)(rpc_method, &body["params"]) {
            Reply::Result(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Reply::Slow(result, delay) => {
                return ResponseTemplate::new(200)
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
                    .set_delay(delay);
            }
            Reply::Error(code, message) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": code, "message": message }
            }),
            Reply::Empty => json!({ "jsonrpc": "2.0", "id": id }),
            Reply::HttpError => return ResponseTemplate::new(500),
        };
        ResponseTemplate::new(200).set_body_json(payload)
    }
}

/// Start a mock JSON-RPC endpoint answering every POST through `handler`.
pub async fn mount_rpc<F>(handler: F) -> MockServer
where
    F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
{
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(RpcStub(handler))
        .mount(&server)
        .await;
    server
}

/// A 32-byte big-endian word, as returned by `eth_call`.
pub fn word(value: u128) -> String {
    format!("0x{:064x}", value)
}

/// The `to` address of an `eth_call`, lower-cased.
pub fn call_target(params: &Value) -> String {
    params[0]["to"].as_str().unwrap_or_default().to_lowercase()
}

/// In-memory price provider that counts how often it is asked.
#[derive(Default)]
pub struct CountingProvider {
    prices: Mutex<HashMap<String, f64>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<Vec<String>>>,
    fail: std::sync::atomic::AtomicBool,
}

impl CountingProvider {
    pub fn with_prices(prices: &[(&str, f64)]) -> Self {
        let provider = Self::default();
        provider.set_prices(prices);
        provider
    }

    pub fn set_prices(&self, prices: &[(&str, f64)]) {
        let mut map = self.prices.lock().unwrap();
        for (id, price) in prices {
            map.insert(id.to_string(), *price);
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<Vec<String>> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceProvider for CountingProvider {
    async fn fetch_usd_prices(&self, ids: &[String]) -> Result<HashMap<String, f64>, PriceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(ids.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PriceError::Status(429));
        }
        let prices = self.prices.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| prices.get(id).map(|price| (id.clone(), *price)))
            .collect())
    }
}

/// Balance source whose every lookup panics, failing the whole refresh.
pub struct PanickingSource;

#[async_trait]
impl BalanceSource for PanickingSource {
    async fn fetch_network(&self, _address: &str, network: &Network) -> NetworkBalances {
        panic!("balance lookup on {} crashed", network.name)
    }
}
