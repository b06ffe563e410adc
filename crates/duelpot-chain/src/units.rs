//! Conversion between native decimal amounts and chain base units.
//!
//! Converting to base units always rounds **down**: the escrow never sends
//! a fraction of a base unit more than it holds.

use duelpot_types::{DuelpotError, Result};
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Base-unit decimals for TRX (1 TRX = 1 000 000 SUN).
pub const TRON_DECIMALS: u32 = 6;

/// Base-unit decimals for tez (1 tez = 1 000 000 mutez).
pub const TEZOS_DECIMALS: u32 = 6;

/// Native amount → base units, floored.
///
/// # Errors
/// Returns [`DuelpotError::AmountOutOfRange`] for negative amounts or
/// amounts that do not fit in `u64` base units.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<u64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DuelpotError::AmountOutOfRange { amount });
    }
    let factor = Decimal::from(10u64.pow(decimals));
    amount
        .checked_mul(factor)
        .map(|scaled| scaled.floor())
        .and_then(|scaled| scaled.to_u64())
        .ok_or(DuelpotError::AmountOutOfRange { amount })
}

/// Base units → native amount.
#[must_use]
pub fn from_base_units(units: u64, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(units), decimals).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_amounts_scale_exactly() {
        assert_eq!(to_base_units(Decimal::new(20, 0), TRON_DECIMALS).unwrap(), 20_000_000);
        assert_eq!(from_base_units(20_000_000, TRON_DECIMALS), Decimal::new(20, 0));
    }

    #[test]
    fn sub_unit_precision_is_floored() {
        // 1.2345678 TRX → 1 234 567 SUN (the trailing 0.8 SUN is dropped)
        let amount = Decimal::new(12_345_678, 7);
        assert_eq!(to_base_units(amount, TRON_DECIMALS).unwrap(), 1_234_567);
    }

    #[test]
    fn negative_rejected() {
        let err = to_base_units(Decimal::new(-1, 0), TEZOS_DECIMALS).unwrap_err();
        assert!(matches!(err, DuelpotError::AmountOutOfRange { .. }));
    }

    #[test]
    fn overflow_rejected() {
        assert!(to_base_units(Decimal::MAX, TEZOS_DECIMALS).is_err());
    }

    #[test]
    fn fractional_base_units_round_trip() {
        assert_eq!(from_base_units(1_500_000, TEZOS_DECIMALS), Decimal::new(15, 1));
        assert_eq!(from_base_units(0, TEZOS_DECIMALS), Decimal::ZERO);
    }
}
