use alloy::eips::BlockId;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use std::str::FromStr;

use crate::error::FetchError;

// ERC-20 read method; selector 0x70a08231.
sol! {
    function balanceOf(address account) external view returns (uint256);
}

pub fn parse_address(address: &str) -> Result<Address, FetchError> {
    Address::from_str(address).map_err(|_| FetchError::InvalidAddress(address.to_string()))
}

/// Calldata for `balanceOf(owner)`: selector followed by the left-padded address word.
pub fn balance_of_calldata(owner: Address) -> Bytes {
    balanceOfCall { account: owner }.abi_encode().into()
}

/// `eth_getBalance [owner, "latest"]`, in wei.
pub async fn native_balance<P: Provider>(provider: &P, owner: Address) -> Result<U256, FetchError> {
    Ok(provider.get_balance(owner).await?)
}

/// `eth_call` of `balanceOf(owner)` against `token` at `latest`, in token base units.
pub async fn token_balance<P: Provider>(
    provider: &P,
    token: Address,
    owner: Address,
) -> Result<U256, FetchError> {
    let tx = TransactionRequest::default()
        .with_to(token)
        .with_input(balance_of_calldata(owner));
    let output = provider.call(tx).block(BlockId::latest()).await?;
    decode_word(&output)
}

/// Decode the first 32-byte big-endian word of a call result.
pub fn decode_word(data: &[u8]) -> Result<U256, FetchError> {
    if data.len() < 32 {
        return Err(FetchError::Malformed(format!(
            "expected a 32-byte word, got {} bytes",
            data.len()
        )));
    }
    Ok(U256::from_be_slice(&data[..32]))
}
