//! Rupiah display formatting.
//!
//! Amounts are stored and computed as `rust_decimal::Decimal` in whole
//! rupiah. Formatting only happens at the response boundary.

use rust_decimal::{Decimal, RoundingStrategy};

/// Formats an amount the way Indonesian locale currency display does:
/// `Rp` prefix, `.` as thousands separator, no fraction digits.
///
/// Fractions are rounded half away from zero. Negative amounts carry a
/// leading minus sign before the symbol.
#[must_use]
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}
