//! Integer-minor-unit currency arithmetic. All monetary values are
//! stored and compared as minor units (e.g. pence); display forms are
//! derived, never authoritative.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use shared::EngineError;

/// An amount expressed in integer minor units (pence for GBP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(i64);

impl Money {
    pub fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    pub fn from_major(decimal: Decimal) -> Self {
        let minor = (decimal * Decimal::ONE_HUNDRED).round();
        Money(minor.to_i64().unwrap_or(0))
    }

    /// Parses a display string such as `£14.06`, stripping everything
    /// except digits and the decimal separator.
    pub fn parse(display: &str) -> Result<Self, EngineError> {
        let cleaned: String = display
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if cleaned.is_empty() {
            return Err(EngineError::validation("amount", format!("unparsable amount '{display}'")));
        }
        let decimal = Decimal::from_str(&cleaned)
            .map_err(|e| EngineError::validation("amount", format!("unparsable amount '{display}': {e}")))?;
        Ok(Self::from_major(decimal))
    }

    pub fn to_minor(self) -> i64 {
        self.0
    }

    pub fn to_major(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }

    /// VAT at `percent`, rounded half-even (banker's rounding) to the
    /// nearest minor unit.
    pub fn vat(self, percent: Decimal) -> Money {
        let base = Decimal::new(self.0, 2);
        let vat_major = base * percent / Decimal::ONE_HUNDRED;
        let vat_minor = (vat_major * Decimal::ONE_HUNDRED).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        Money(vat_minor.to_i64().unwrap_or(0))
    }

    pub fn format(self, symbol: &str) -> String {
        let major = self.to_major();
        format!("{symbol}{major:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_symbol_and_rounds_to_pence() {
        let m = Money::parse("£14.06").unwrap();
        assert_eq!(m.to_minor(), 1406);
    }

    #[test]
    fn parse_rejects_unparsable_input() {
        assert!(Money::parse("n/a").is_err());
    }

    #[test]
    fn round_trip_through_minor_and_major_preserves_value() {
        let original = Money::parse("£25.50").unwrap();
        let reformatted = Money::from_minor(original.to_minor()).format("£");
        assert_eq!(reformatted, "£25.50");
    }

    #[test]
    fn add_sums_minor_units() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(250);
        assert_eq!(a.add(b).to_minor(), 1250);
    }

    #[test]
    fn vat_uses_banker_rounding() {
        // 0.5p exactly at the boundary rounds to the nearest even minor unit.
        let amount = Money::from_minor(250); // £2.50
        let vat = amount.vat(Decimal::new(1, 0)); // 1% of £2.50 = 2.5p
        assert_eq!(vat.to_minor(), 2, "2.5p should round down to the even neighbour");
    }

    #[test]
    fn format_uses_given_symbol() {
        assert_eq!(Money::from_minor(2550).format("£"), "£25.50");
        assert_eq!(Money::from_minor(2550).format("$"), "$25.50");
    }
}
