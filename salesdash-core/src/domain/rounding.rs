//! Rounding policies per semantic field type
//!
//! Every place that rounds a quantity goes through one of these functions, so
//! the record constructor and the report assembler agree on precision.
//! All policies round half away from zero, matching what spreadsheet users
//! expect (`2.345 -> 2.35`), not banker's rounding.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const STRATEGY: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Currency amounts (sales value, price per kg): 2 decimal places
pub fn currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, STRATEGY)
}

/// Whether a currency amount fits the stored `DECIMAL(14, 2)` columns
pub fn currency_fits(value: Decimal) -> bool {
    value.abs() < Decimal::from(1_000_000_000_000_i64)
}

/// Whole kilograms for stored mass
pub fn mass_kg(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, STRATEGY)
        .to_i64()
        .unwrap_or(0)
}

/// Whole units, used for aggregated sales totals on dashboards
pub fn whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, STRATEGY)
}

/// One decimal place, used for report masses and percentage changes
pub fn tenths(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, STRATEGY)
}

/// Counts (quantity, invoice number) drop any fraction
pub fn count(value: Decimal) -> i64 {
    value.trunc().to_i64().unwrap_or(0)
}
