//! Conversion between raw integer amounts (wei) and display units.

use alloy_primitives::U256;

use crate::error::UnitsError;

/// Decimals of one ether.
pub const ETHER_DECIMALS: u8 = 18;
/// Decimals of one gwei.
pub const GWEI_DECIMALS: u8 = 9;

fn pow10(n: u8) -> U256 {
    let ten = U256::from(10u8);
    (0..n).fold(U256::from(1u8), |acc, _| acc * ten)
}

/// Render `amount / 10^decimals` with exactly `precision` fractional digits,
/// rounding half up.
pub fn format_units(amount: U256, decimals: u8, precision: u8) -> String {
    let unit = pow10(decimals);
    let mut whole = amount / unit;
    let rem = amount % unit;

    if precision == 0 {
        if decimals > 0 && rem * U256::from(2u8) >= unit {
            whole += U256::from(1u8);
        }
        return whole.to_string();
    }

    let frac = if precision >= decimals {
        rem * pow10(precision - decimals)
    } else {
        let divisor = pow10(decimals - precision);
        let mut frac = rem / divisor;
        if (rem % divisor) * U256::from(2u8) >= divisor {
            frac += U256::from(1u8);
        }
        if frac == pow10(precision) {
            whole += U256::from(1u8);
            frac = U256::ZERO;
        }
        frac
    };

    format!(
        "{whole}.{:0>width$}",
        frac.to_string(),
        width = precision as usize
    )
}

/// Wei → ether with four decimal places.
pub fn format_ether(wei: U256) -> String {
    format_units(wei, ETHER_DECIMALS, 4)
}

/// Wei → gwei with two decimal places.
pub fn format_gwei(wei: U256) -> String {
    format_units(wei, GWEI_DECIMALS, 2)
}

/// Parse a non-negative decimal string into its raw integer amount.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, UnitsError> {
    let text = input.trim().replace('_', "");
    if text.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text.as_str(), ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) || (whole.is_empty() && frac.is_empty()) {
        return Err(UnitsError::InvalidDigit(input.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            input: input.to_string(),
            decimals,
        });
    }

    let digits = format!("{whole}{frac:0<width$}", width = decimals as usize);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    digits
        .parse::<U256>()
        .map_err(|_| UnitsError::Overflow(input.to_string()))
}

/// Parse an ether amount such as `"1.5"` into wei.
pub fn parse_ether(input: &str) -> Result<U256, UnitsError> {
    parse_units(input, ETHER_DECIMALS)
}
