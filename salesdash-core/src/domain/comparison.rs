//! Period-over-period comparison

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::aggregate::{aggregate, AggregatedGroup, GroupBy};
use super::result::Error;
use super::rounding;
use super::sale::SalesTransaction;

const NO_COMP: &str = "no comp";

/// Relative change between two totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentageChange {
    /// Percent, rounded to one decimal place
    Change(Decimal),
    /// The prior total was zero or absent
    NoComp,
}

impl PercentageChange {
    pub fn between(current: Decimal, prior: Option<Decimal>) -> Self {
        match prior {
            Some(prior) if !prior.is_zero() => {
                let pct = (current - prior) / prior * Decimal::ONE_HUNDRED;
                PercentageChange::Change(rounding::tenths(pct))
            }
            _ => PercentageChange::NoComp,
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            PercentageChange::Change(v) => Some(*v),
            PercentageChange::NoComp => None,
        }
    }
}

impl fmt::Display for PercentageChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentageChange::NoComp => f.write_str(NO_COMP),
            PercentageChange::Change(v) => {
                let mut v = rounding::tenths(*v);
                if v.is_zero() {
                    return f.write_str("0.0%");
                }
                v.rescale(1);
                if v.is_sign_positive() {
                    write!(f, "+{}%", v)
                } else {
                    write!(f, "{}%", v)
                }
            }
        }
    }
}

impl FromStr for PercentageChange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(NO_COMP) {
            return Ok(PercentageChange::NoComp);
        }
        let number = s.trim_end_matches('%').trim_start_matches('+');
        Decimal::from_str(number)
            .map(PercentageChange::Change)
            .map_err(|_| Error::validation(format!("Invalid percentage change '{}'", s)))
    }
}

impl Serialize for PercentageChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PercentageChange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One compared total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_total: Decimal,
    #[serde(
        with = "rust_decimal::serde::float_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub prior_total: Option<Decimal>,
    pub percentage_change: PercentageChange,
}

impl ComparisonResult {
    pub fn new(name: impl Into<String>, current: Decimal, prior: Option<Decimal>) -> Self {
        Self {
            name: name.into(),
            current_total: current,
            prior_total: prior,
            percentage_change: PercentageChange::between(current, prior),
        }
    }
}

/// Quantity being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    SalesValue,
    Mass,
}

impl Metric {
    pub fn of(&self, group: &AggregatedGroup) -> Decimal {
        match self {
            Metric::SalesValue => group.sales_value_sum,
            Metric::Mass => Decimal::from(group.mass_sum),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonOutput {
    pub current: Vec<AggregatedGroup>,
    pub comparison: Vec<ComparisonResult>,
}

/// Compare sales value per group between two record sets
pub fn compare(
    current: &[SalesTransaction],
    prior: &[SalesTransaction],
    group_by: GroupBy,
) -> ComparisonOutput {
    compare_by(current, prior, group_by, Metric::SalesValue)
}

/// Compare `metric` per group. Only groups present in the current set are
/// reported; a group missing from the prior set has no prior total.
pub fn compare_by(
    current: &[SalesTransaction],
    prior: &[SalesTransaction],
    group_by: GroupBy,
    metric: Metric,
) -> ComparisonOutput {
    let current_groups = aggregate(current, group_by);
    let prior_totals: HashMap<String, Decimal> = aggregate(prior, group_by)
        .into_iter()
        .map(|g| {
            let total = metric.of(&g);
            (g.group_key, total)
        })
        .collect();

    let comparison = current_groups
        .iter()
        .map(|g| {
            ComparisonResult::new(
                g.group_key.clone(),
                metric.of(g),
                prior_totals.get(&g.group_key).copied(),
            )
        })
        .collect();

    ComparisonOutput {
        current: current_groups,
        comparison,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(product: &str, sales_value: i64, mass: i64) -> SalesTransaction {
        SalesTransaction {
            product: product.to_string(),
            customer: "X".to_string(),
            sales_value: Decimal::from(sales_value),
            mass,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_prior_is_no_comp() {
        let out = compare(&[tx("A", 200, 1)], &[tx("A", 0, 1)], GroupBy::Product);
        assert_eq!(out.comparison[0].percentage_change, PercentageChange::NoComp);
        assert_eq!(out.comparison[0].percentage_change.to_string(), "no comp");
    }

    #[test]
    fn test_missing_prior_is_no_comp() {
        let out = compare(&[tx("A", 200, 1)], &[tx("B", 10, 1)], GroupBy::Product);
        assert_eq!(out.comparison.len(), 1);
        assert_eq!(out.comparison[0].prior_total, None);
        assert_eq!(out.comparison[0].percentage_change, PercentageChange::NoComp);
    }

    #[test]
    fn test_signed_percentages() {
        let up = PercentageChange::between(Decimal::from(225), Some(Decimal::from(200)));
        assert_eq!(up.to_string(), "+12.5%");

        let down = PercentageChange::between(Decimal::from(97), Some(Decimal::from(100)));
        assert_eq!(down.to_string(), "-3.0%");

        let flat = PercentageChange::between(Decimal::from(100), Some(Decimal::from(100)));
        assert_eq!(flat.to_string(), "0.0%");
    }

    #[test]
    fn test_rounds_to_one_decimal() {
        // 1/3 = 33.333...%
        let pct = PercentageChange::between(Decimal::from(4), Some(Decimal::from(3)));
        assert_eq!(pct.value(), Some(Decimal::new(333, 1)));
        assert_eq!(pct.to_string(), "+33.3%");
    }

    #[test]
    fn test_compare_by_mass() {
        let out = compare_by(
            &[tx("A", 10, 150)],
            &[tx("A", 10, 100)],
            GroupBy::Product,
            Metric::Mass,
        );
        assert_eq!(out.comparison[0].current_total, Decimal::from(150));
        assert_eq!(out.comparison[0].percentage_change.to_string(), "+50.0%");
    }

    #[test]
    fn test_only_current_keys_are_reported() {
        let out = compare(
            &[tx("A", 10, 1), tx("B", 20, 1)],
            &[tx("C", 5, 1), tx("A", 5, 1)],
            GroupBy::Product,
        );
        let names: Vec<_> = out.comparison.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(out.current.len(), 2);
    }

    #[test]
    fn test_serde_round_trip_of_percentage_strings() {
        let result = ComparisonResult::new("A", Decimal::from(225), Some(Decimal::from(200)));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["percentage_change"], "+12.5%");

        let back: ComparisonResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.percentage_change, result.percentage_change);
    }
}
