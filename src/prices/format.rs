use std::collections::HashMap;

use crate::balances::units::amount_as_f64;

/// `amount × price[symbol]`; unknown symbols and unparseable amounts are worth 0.
pub fn usd_value(amount: &str, symbol: &str, prices: &HashMap<String, f64>) -> f64 {
    let amount = amount_as_f64(amount);
    if amount == 0.0 {
        return 0.0;
    }
    amount * prices.get(&symbol.to_uppercase()).copied().unwrap_or(0.0)
}

/// Compact dollar display: `$0.00`, `<$0.01`, `$12.34`, `$1.2K`, `$3.4M`.
pub fn format_usd_value(value: f64) -> String {
    if value == 0.0 {
        "$0.00".to_string()
    } else if value < 0.01 {
        "<$0.01".to_string()
    } else if value < 1_000.0 {
        format!("${:.2}", value)
    } else if value < 1_000_000.0 {
        format!("${:.1}K", value / 1_000.0)
    } else {
        format!("${:.1}M", value / 1_000_000.0)
    }
}

/// Balance with its symbol at four decimals, e.g. `1.2346 ETH`.
pub fn format_balance(amount: &str, symbol: &str) -> String {
    let value = amount_as_f64(amount);
    if value == 0.0 {
        format!("0 {}", symbol)
    } else if value < 0.0001 {
        format!("<0.0001 {}", symbol)
    } else {
        format!("{:.4} {}", value, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usd_value() {
        let prices = HashMap::from([("ETH".to_string(), 3000.0), ("USDC".to_string(), 1.0)]);
        assert_eq!(usd_value("1.0", "eth", &prices), 3000.0);
        assert_eq!(usd_value("100.0", "USDC", &prices), 100.0);
        assert_eq!(usd_value("5.0", "PEPE", &prices), 0.0);
        assert_eq!(usd_value("not-a-number", "ETH", &prices), 0.0);
    }

    #[test]
    fn test_format_usd_value() {
        assert_eq!(format_usd_value(0.0), "$0.00");
        assert_eq!(format_usd_value(0.004), "<$0.01");
        assert_eq!(format_usd_value(0.5), "$0.50");
        assert_eq!(format_usd_value(3005.0), "$3.0K");
        assert_eq!(format_usd_value(999.999), "$1000.00");
        assert_eq!(format_usd_value(2_500_000.0), "$2.5M");
    }

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance("0.0", "ETH"), "0 ETH");
        assert_eq!(format_balance("0.00000001", "ETH"), "<0.0001 ETH");
        assert_eq!(format_balance("1.23456", "ETH"), "1.2346 ETH");
    }
}
