//! Hex address parsing for command-line arguments.

use anyhow::Result;

/// Parse a hex address string (with or without 0x prefix).
pub fn parse_hex_address(s: &str) -> Result<u64> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
        .replace('_', "");
    u64::from_str_radix(&digits, 16).map_err(|e| anyhow::anyhow!("Invalid hex address '{}': {}", s, e))
}

/// [`parse_hex_address`] in the shape clap's `value_parser` expects.
pub fn parse_hex_arg(s: &str) -> std::result::Result<u64, String> {
    parse_hex_address(s).map_err(|e| e.to_string())
}
