//! # Amount Conversion
//!
//! Operators speak in reais (`100.50`), the ledger counts centavos
//! (`10050`). Every conversion between the two goes through this module so
//! that issuance and redemption can never round differently.
//!
//! The rule is **floor, never round**: `100.567` becomes `10056`. A request
//! that floors to zero or below is rejected outright instead of silently
//! turning into a no-op transition.
//!
//! Major amounts are `rust_decimal::Decimal`, parsed from the operator's
//! text. Binary floating point never touches a balance.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{MAX_COUNTER, MINOR_UNITS_PER_MAJOR, TOKEN_DECIMALS};

/// Errors from converting or parsing amounts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountError {
    /// The amount is zero or negative once truncated to minor units.
    #[error("amount {0} is not positive after truncation to minor units")]
    NonPositive(Decimal),

    /// The amount exceeds [`MAX_COUNTER`] minor units.
    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),

    /// The text is not a decimal number.
    #[error("malformed amount: {0:?}")]
    Malformed(String),
}

/// Convert a major-unit amount to minor units, flooring any excess
/// precision.
///
/// # Errors
///
/// [`AmountError::NonPositive`] if the floored result is `<= 0`,
/// [`AmountError::OutOfRange`] if it exceeds [`MAX_COUNTER`].
///
/// # Example
///
/// ```
/// use real_digital_protocol::amount::to_minor_units;
/// use rust_decimal::Decimal;
///
/// assert_eq!(to_minor_units(Decimal::new(100_567, 3)).unwrap(), 10_056);
/// assert!(to_minor_units(Decimal::new(4, 3)).is_err());
/// ```
pub fn to_minor_units(amount_major: Decimal) -> Result<u64, AmountError> {
    let scaled = amount_major
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .ok_or(AmountError::OutOfRange(amount_major))?
        .floor();

    if scaled <= Decimal::ZERO {
        return Err(AmountError::NonPositive(amount_major));
    }

    scaled
        .to_u64()
        .filter(|minor| *minor <= MAX_COUNTER)
        .ok_or(AmountError::OutOfRange(amount_major))
}

/// Parse an operator-typed major amount such as `"100.50"`.
///
/// Only parses; positivity is checked by [`to_minor_units`].
pub fn parse_major(text: &str) -> Result<Decimal, AmountError> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed).map_err(|_| AmountError::Malformed(text.to_string()))
}

/// Render minor units as a major amount with exactly two decimals.
pub fn format_minor(minor: u64) -> String {
    format!(
        "{}.{:0width$}",
        minor / MINOR_UNITS_PER_MAJOR,
        minor % MINOR_UNITS_PER_MAJOR,
        width = TOKEN_DECIMALS as usize
    )
}

/// Render a signed minor-unit delta, e.g. `-10.00`.
pub fn format_signed_minor(minor: i128) -> String {
    let magnitude = format_minor(minor.unsigned_abs().min(u64::MAX as u128) as u64);
    if minor < 0 {
        format!("-{magnitude}")
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn floors_instead_of_rounding() {
        assert_eq!(to_minor_units(dec("100.567")).unwrap(), 10056);
        assert_eq!(to_minor_units(dec("0.019")).unwrap(), 1);
        assert_eq!(to_minor_units(dec("100.50")).unwrap(), 10050);
    }

    #[test]
    fn sub_centavo_amount_is_rejected() {
        assert_eq!(
            to_minor_units(dec("0.004")),
            Err(AmountError::NonPositive(dec("0.004")))
        );
    }

    #[test]
    fn zero_and_negative_are_rejected() {
        assert!(matches!(to_minor_units(Decimal::ZERO), Err(AmountError::NonPositive(_))));
        assert!(matches!(to_minor_units(dec("-5.00")), Err(AmountError::NonPositive(_))));
    }

    #[test]
    fn huge_amount_is_out_of_range() {
        assert!(matches!(
            to_minor_units(dec("1000000000000000000000")),
            Err(AmountError::OutOfRange(_))
        ));
        assert!(matches!(
            to_minor_units(Decimal::MAX),
            Err(AmountError::OutOfRange(_))
        ));
    }

    #[test]
    fn largest_amount_is_signed_64_bit() {
        // 92233720368547758.07 is i64::MAX centavos.
        assert_eq!(
            to_minor_units(dec("92233720368547758.07")).unwrap(),
            MAX_COUNTER
        );
        assert!(matches!(
            to_minor_units(dec("92233720368547758.08")),
            Err(AmountError::OutOfRange(_))
        ));
    }

    #[test]
    fn parse_accepts_operator_text() {
        assert_eq!(parse_major(" 50.00 ").unwrap(), dec("50.00"));
        assert_eq!(parse_major("7").unwrap(), dec("7"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse_major("R$ 10"), Err(AmountError::Malformed(_))));
        assert!(matches!(parse_major(""), Err(AmountError::Malformed(_))));
    }

    #[test]
    fn format_pads_centavos() {
        assert_eq!(format_minor(10050), "100.50");
        assert_eq!(format_minor(5), "0.05");
        assert_eq!(format_minor(0), "0.00");
        assert_eq!(format_signed_minor(-1000), "-10.00");
        assert_eq!(format_signed_minor(1050), "10.50");
    }

    proptest! {
        #[test]
        fn whole_centavos_convert_exactly(cents in 1u64..=u32::MAX as u64) {
            let major = Decimal::new(cents as i64, 2);
            prop_assert_eq!(to_minor_units(major).unwrap(), cents);
        }

        #[test]
        fn extra_digit_is_always_dropped(mills in 10u64..=u32::MAX as u64) {
            let major = Decimal::new(mills as i64, 3);
            prop_assert_eq!(to_minor_units(major).unwrap(), mills / 10);
        }

        #[test]
        fn format_then_parse_is_identity(cents in 1u64..=u32::MAX as u64) {
            let text = format_minor(cents);
            prop_assert_eq!(to_minor_units(parse_major(&text).unwrap()).unwrap(), cents);
        }
    }
}
