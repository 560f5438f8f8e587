//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are held as [`Decimal`] in the currency's standard unit (roubles,
//! not kopecks). Cart totals, order subtotals and delivery fees are all sums
//! of these values, so no floating point is involved anywhere in pricing.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in the store currency.
    #[must_use]
    pub const fn rub(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::RUB)
    }

    /// Format for display, e.g. `89 990 ₽` or `1 299,50 ₽`.
    ///
    /// Thousands are grouped with a space, the fraction is dropped when the
    /// amount is whole and otherwise shown with two digits after a comma.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self.amount.round_dp(2);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let abs = rounded.abs();
        let whole = abs.trunc();
        let fraction = abs - whole;

        let digits = whole.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(ch);
        }

        let sign = if negative { "-" } else { "" };
        let symbol = self.currency_code.symbol();
        if fraction.is_zero() {
            format!("{sign}{grouped} {symbol}")
        } else {
            let cents = (fraction * Decimal::ONE_HUNDRED).trunc().to_string();
            format!("{sign}{grouped},{cents:0>2} {symbol}")
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    RUB,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Display symbol placed after the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::RUB => "₽",
            Self::USD => "$",
            Self::EUR => "€",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::rub(Decimal::new(89_990, 0)).display(), "89 990 ₽");
        assert_eq!(Price::rub(Decimal::new(1_250_000, 0)).display(), "1 250 000 ₽");
        assert_eq!(Price::rub(Decimal::new(500, 0)).display(), "500 ₽");
    }

    #[test]
    fn test_display_fraction() {
        assert_eq!(Price::rub(Decimal::new(129_950, 2)).display(), "1 299,50 ₽");
        assert_eq!(Price::rub(Decimal::new(105, 2)).display(), "1,05 ₽");
    }

    #[test]
    fn test_display_zero_and_negative() {
        assert_eq!(Price::rub(Decimal::ZERO).display(), "0 ₽");
        assert_eq!(Price::rub(Decimal::new(-1500, 0)).display(), "-1 500 ₽");
    }
}
