use alloy::primitives::U256;

use crate::error::FetchError;

/// Scale a raw integer amount by `decimals` into a decimal string.
///
/// Trailing fractional zeros are trimmed but one fractional digit is always
/// kept, so `10^18` at 18 decimals is `"1.0"` and zero is `"0.0"`.
pub fn format_units(raw: U256, decimals: u8) -> Result<String, FetchError> {
    let scale = U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| FetchError::Malformed(format!("unsupported decimals {}", decimals)))?;

    let whole = raw / scale;
    let fraction = raw % scale;

    let mut fraction_digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    while fraction_digits.len() > 1 && fraction_digits.ends_with('0') {
        fraction_digits.pop();
    }
    if fraction_digits.is_empty() {
        fraction_digits.push('0');
    }

    Ok(format!("{}.{}", whole, fraction_digits))
}

/// Decimal string to `f64` for USD arithmetic. Unparseable amounts count as zero.
pub fn amount_as_f64(formatted: &str) -> f64 {
    formatted.parse::<f64>().unwrap_or(0.0)
}
