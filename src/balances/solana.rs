use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::FetchError;

pub const LAMPORTS_DECIMALS: u8 = 9;

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct BalanceResult {
    value: u64,
}

/// `getBalance [address]` against a Solana RPC endpoint, in lamports.
pub async fn native_balance(
    client: &reqwest::Client,
    rpc_url: &str,
    address: &str,
) -> Result<U256, FetchError> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0",
        id: 1,
        method: "getBalance",
        params: json!([address]),
    };

    let response = client.post(rpc_url).json(&request).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Transport(format!("HTTP {}", status)));
    }

    let body: JsonRpcResponse<BalanceResult> = response
        .json()
        .await
        .map_err(|e| FetchError::Malformed(e.to_string()))?;

    match (body.result, body.error) {
        (_, Some(error)) => Err(FetchError::Rpc {
            code: error.code,
            message: error.message,
        }),
        (Some(result), None) => Ok(U256::from(result.value)),
        (None, None) => Err(FetchError::Malformed("missing result".to_string())),
    }
}
