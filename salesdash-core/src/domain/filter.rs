//! Typed query filter for stored sales rows

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::sale::SalesTransaction;

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The whole calendar year
    pub fn year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?,
        })
    }

    /// The whole calendar month
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self { start, end })
    }

    /// A single day
    pub fn day(date: NaiveDate) -> Option<Self> {
        Some(Self {
            start: date,
            end: date.succ_opt()?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Conjunctive filter over sales rows. `None` fields do not constrain.
///
/// Text filters are case-insensitive substring matches. Rows without a date
/// never match a date constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFilter {
    pub year: Option<i32>,
    /// Only effective together with `year`
    pub month: Option<u32>,
    /// Matched against the product name. There is no supplier column in the
    /// source data; a supplier-to-product mapping table is needed to make
    /// this filter mean what its name says.
    pub supplier: Option<String>,
    pub customer: Option<String>,
    pub product: Option<String>,
    /// Exact customer names, usually resolved from a sales rep
    pub customer_in: Option<Vec<String>>,
    pub date_range: Option<DateRange>,
    /// Exact, case-insensitive
    pub transaction_type: Option<String>,
}

impl SalesFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_transaction_type(mut self, transaction_type: impl Into<String>) -> Self {
        let value = transaction_type.into();
        self.transaction_type = if value.trim().is_empty() {
            None
        } else {
            Some(value)
        };
        self
    }

    /// Restrict to the customers of `rep`. Unknown reps and `"All"` leave the
    /// filter unchanged.
    pub fn restrict_to_rep(
        mut self,
        rep: Option<&str>,
        reps: &BTreeMap<String, Vec<String>>,
    ) -> Self {
        if let Some(customers) = rep.and_then(|r| reps.get(r)) {
            self.customer_in = Some(customers.clone());
        }
        self
    }

    /// Date range implied by `year` and `month`
    pub fn calendar_range(&self) -> Option<DateRange> {
        let year = self.year?;
        match self.month {
            Some(month) => DateRange::month(year, month),
            None => DateRange::year(year),
        }
    }

    /// A `year` (with its `month`) that has no calendar range matches no row
    pub fn is_unsatisfiable(&self) -> bool {
        self.year.is_some() && self.calendar_range().is_none()
    }

    /// Blank text filters mean "no constraint"; normalize them away.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.supplier,
            &mut self.customer,
            &mut self.product,
            &mut self.transaction_type,
        ] {
            if field.as_deref().map(|s| s.trim().is_empty()).unwrap_or(false) {
                *field = None;
            }
        }
        self
    }

    /// In-memory evaluation, equivalent to the store's SQL rendering
    pub fn matches(&self, tx: &SalesTransaction) -> bool {
        let date_ok = |range: Option<DateRange>| match range {
            None => true,
            Some(r) => tx.date.map(|d| r.contains(d)).unwrap_or(false),
        };
        if self.is_unsatisfiable() {
            return false;
        }
        if !date_ok(self.calendar_range()) {
            return false;
        }
        if !date_ok(self.date_range) {
            return false;
        }
        if !substring(&tx.product, self.supplier.as_deref())
            || !substring(&tx.customer, self.customer.as_deref())
            || !substring(&tx.product, self.product.as_deref())
        {
            return false;
        }
        if let Some(customers) = &self.customer_in {
            if !customers.iter().any(|c| c == &tx.customer) {
                return false;
            }
        }
        if let Some(tt) = &self.transaction_type {
            if !tx.transaction_type.eq_ignore_ascii_case(tt.trim()) {
                return false;
            }
        }
        true
    }
}

fn substring(value: &str, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(n) => value.to_lowercase().contains(&n.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(date: Option<(i32, u32, u32)>, customer: &str, product: &str) -> SalesTransaction {
        SalesTransaction {
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            customer: customer.to_string(),
            product: product.to_string(),
            transaction_type: "INV".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_year_and_month_ranges() {
        let filter = SalesFilter::new().with_year(2025).with_month(12);
        let range = filter.calendar_range().unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        assert!(filter.matches(&tx(Some((2025, 12, 31)), "A", "P")));
        assert!(!filter.matches(&tx(Some((2026, 1, 1)), "A", "P")));
    }

    #[test]
    fn test_year_without_calendar_range_matches_nothing() {
        for filter in [
            SalesFilter::new().with_year(300_000),
            SalesFilter::new().with_year(i32::MAX).with_month(12),
        ] {
            assert_eq!(filter.calendar_range(), None);
            assert!(filter.is_unsatisfiable());
            assert!(!filter.matches(&tx(Some((2025, 5, 17)), "A", "P")));
        }
        assert!(!SalesFilter::new().with_year(2025).is_unsatisfiable());
    }

    #[test]
    fn test_month_without_year_has_no_effect() {
        let filter = SalesFilter::new().with_month(3);
        assert_eq!(filter.calendar_range(), None);
        assert!(filter.matches(&tx(Some((2024, 7, 1)), "A", "P")));
        assert!(filter.matches(&tx(None, "A", "P")));
    }

    #[test]
    fn test_undated_rows_never_match_date_constraints() {
        let filter = SalesFilter::new().with_year(2025);
        assert!(!filter.matches(&tx(None, "A", "P")));
    }

    #[test]
    fn test_text_filters_are_case_insensitive_substrings() {
        let filter = SalesFilter {
            customer: Some("spar".to_string()),
            supplier: Some("FILLET".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&tx(None, "Spar Chatsworth", "Breast Fillet")));
        assert!(!filter.matches(&tx(None, "Spar Chatsworth", "Drumsticks")));
    }

    #[test]
    fn test_rep_restriction() {
        let mut reps = BTreeMap::new();
        reps.insert("Uriel".to_string(), vec!["Spar Chatsworth".to_string()]);

        let filter = SalesFilter::new().restrict_to_rep(Some("Uriel"), &reps);
        assert!(filter.matches(&tx(None, "Spar Chatsworth", "P")));
        assert!(!filter.matches(&tx(None, "Spar Chatsworth 2", "P")));

        let all = SalesFilter::new().restrict_to_rep(Some("All"), &reps);
        assert_eq!(all.customer_in, None);
    }

    #[test]
    fn test_blank_text_filters_are_dropped() {
        let filter = SalesFilter {
            customer: Some("  ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(filter.customer, None);
    }
}
