//! Dashboard service - role-based views over the stored snapshot
//!
//! Growth figures compare the selection with the same selection one period
//! earlier: the previous month when a year and month are chosen, the
//! previous year when only a year is chosen. Without a year there is nothing
//! to compare against and growth reads "no comp".

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::aggregate::rank_by_sales;
use crate::domain::rounding;
use crate::domain::result::Error;
use crate::domain::{
    aggregate, compare_by, AggregatedGroup, DateRange, GroupBy, Metric, PercentageChange,
    SalesFilter, SalesTransaction,
};
use crate::ports::SalesStore;

/// Weeks shown in the trader order history
pub const HISTORY_WEEKS: usize = 5;
/// Products shown in the trader order history
pub const HISTORY_PRODUCTS: usize = 5;

// ============================================================================
// Query
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    #[default]
    SalesValue,
    Mass,
    SalesQty,
    CustomerCount,
    AvgPricePerKg,
    RecordCount,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "" | "sales_value" => Ok(SortKey::SalesValue),
            "mass" => Ok(SortKey::Mass),
            "sales_qty" => Ok(SortKey::SalesQty),
            "customer_count" => Ok(SortKey::CustomerCount),
            "avg_price_per_kg" => Ok(SortKey::AvgPricePerKg),
            "record_count" => Ok(SortKey::RecordCount),
            other => Err(Error::validation(format!("Unknown sort key '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "" | "desc" => Ok(SortOrder::Desc),
            other => Err(Error::validation(format!("Unknown sort order '{}'", other))),
        }
    }
}

/// Query-string values: blank means absent
fn empty_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Selection shared by every dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DashboardQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub month: Option<u32>,
    #[serde(default)]
    pub rep: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub sort_by: Option<SortKey>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub sort_order: Option<SortOrder>,
}

impl DashboardQuery {
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if let Some(year) = self.year {
            if DateRange::year(year).is_none() {
                return Err(Error::validation(format!("Year out of range: {}", year)));
            }
        }
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(Error::validation(format!("Month must be 1-12, got {}", month)));
            }
        }
        Ok(())
    }

    /// Store filter for this selection
    pub fn to_filter(&self, reps: &BTreeMap<String, Vec<String>>) -> SalesFilter {
        SalesFilter {
            year: self.year,
            month: self.month,
            supplier: self.supplier.clone(),
            customer: self.customer.clone(),
            product: self.product.clone(),
            ..Default::default()
        }
        .restrict_to_rep(self.rep.as_deref(), reps)
        .normalized()
    }
}

/// What growth is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthBasis {
    PreviousMonth,
    PreviousYear,
    None,
}

/// The same selection one period earlier
///
/// No prior period exists when the previous year cannot be represented.
pub fn prior_filter(filter: &SalesFilter) -> (GrowthBasis, Option<SalesFilter>) {
    let previous_year = filter.year.and_then(|y| y.checked_sub(1));
    match (filter.year, filter.month) {
        (Some(year), Some(month)) => {
            let (py, pm) = if month == 1 {
                match previous_year {
                    Some(py) => (py, 12),
                    None => return (GrowthBasis::None, None),
                }
            } else {
                (year, month - 1)
            };
            let prior = SalesFilter {
                year: Some(py),
                month: Some(pm),
                ..filter.clone()
            };
            (GrowthBasis::PreviousMonth, Some(prior))
        }
        (Some(_), None) => {
            let Some(py) = previous_year else {
                return (GrowthBasis::None, None);
            };
            let prior = SalesFilter {
                year: Some(py),
                ..filter.clone()
            };
            (GrowthBasis::PreviousYear, Some(prior))
        }
        _ => (GrowthBasis::None, None),
    }
}

// ============================================================================
// Output shapes
// ============================================================================

/// One line of a dashboard table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardRow {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sales_value: Decimal,
    pub mass: i64,
    pub sales_qty: i64,
    pub customer_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_price_per_kg: Decimal,
    pub record_count: usize,
    pub sales_growth: PercentageChange,
    pub mass_growth: PercentageChange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_last_order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_sales: Decimal,
    pub total_mass: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_price_per_kg: Decimal,
    pub record_count: usize,
    pub unique_customers: usize,
    pub unique_products: usize,
}

impl DashboardSummary {
    fn of(records: &[SalesTransaction]) -> Self {
        let total = aggregate(records, GroupBy::Total).into_iter().next();
        let unique_products = aggregate(records, GroupBy::Product).len();
        match total {
            Some(t) => Self {
                total_sales: rounding::currency(t.sales_value_sum),
                total_mass: t.mass_sum,
                avg_price_per_kg: t.avg_price_per_kg,
                record_count: t.record_count,
                unique_customers: t.distinct_customer_count,
                unique_products,
            },
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectorDashboard {
    pub growth_basis: GrowthBasis,
    pub suppliers: Vec<DashboardRow>,
    pub summary: DashboardSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerDashboard {
    pub growth_basis: GrowthBasis,
    /// Reference day for `days_since_last_order`
    pub as_of: Option<NaiveDate>,
    pub customers: Vec<DashboardRow>,
    pub products: Vec<DashboardRow>,
    pub categories: Vec<DashboardRow>,
    pub summary: DashboardSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekCount {
    pub week: String,
    pub week_start: NaiveDate,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderHistory {
    pub product: String,
    /// Oldest week first
    pub weeks: Vec<WeekCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraderDashboard {
    pub growth_basis: GrowthBasis,
    pub as_of: Option<NaiveDate>,
    pub customers: Vec<DashboardRow>,
    pub order_history: Vec<OrderHistory>,
    pub summary: DashboardSummary,
}

// ============================================================================
// Row building
// ============================================================================

fn rows(
    current: &[SalesTransaction],
    prior: Option<&[SalesTransaction]>,
    group_by: GroupBy,
) -> Vec<DashboardRow> {
    let prior = prior.unwrap_or(&[]);
    let by_sales = compare_by(current, prior, group_by, Metric::SalesValue);
    let by_mass = compare_by(current, prior, group_by, Metric::Mass);

    by_sales
        .current
        .into_iter()
        .zip(by_sales.comparison)
        .zip(by_mass.comparison)
        .map(|((group, sales), mass)| DashboardRow {
            sales_value: rounding::currency(group.sales_value_sum),
            mass: group.mass_sum,
            sales_qty: group.sales_qty_sum,
            customer_count: group.distinct_customer_count,
            avg_price_per_kg: group.avg_price_per_kg,
            record_count: group.record_count,
            sales_growth: sales.percentage_change,
            mass_growth: mass.percentage_change,
            days_since_last_order: None,
            name: group.group_key,
        })
        .collect()
}

fn latest_date(records: &[SalesTransaction]) -> Option<NaiveDate> {
    records.iter().filter_map(|r| r.date).max()
}

/// Days between each customer's last order and `as_of`
fn fill_days_since_last_order(rows: &mut [DashboardRow], records: &[SalesTransaction], as_of: Option<NaiveDate>) {
    let Some(as_of) = as_of else { return };
    let mut last: HashMap<&str, NaiveDate> = HashMap::new();
    for r in records {
        if let Some(d) = r.date {
            let entry = last.entry(r.customer.as_str()).or_insert(d);
            if d > *entry {
                *entry = d;
            }
        }
    }
    for row in rows {
        row.days_since_last_order = last.get(row.name.as_str()).map(|d| (as_of - *d).num_days());
    }
}

/// Sort rows in place. Stable, so equal keys keep first-seen order.
pub fn sort_rows(rows: &mut [DashboardRow], key: SortKey, order: SortOrder) {
    rows.sort_by(|a, b| {
        let ord = match key {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::SalesValue => a.sales_value.cmp(&b.sales_value),
            SortKey::Mass => a.mass.cmp(&b.mass),
            SortKey::SalesQty => a.sales_qty.cmp(&b.sales_qty),
            SortKey::CustomerCount => a.customer_count.cmp(&b.customer_count),
            SortKey::AvgPricePerKg => a.avg_price_per_kg.cmp(&b.avg_price_per_kg),
            SortKey::RecordCount => a.record_count.cmp(&b.record_count),
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// Weekly row counts for the top-selling products over the weeks ending at
/// the latest date of the selection. Weeks are ISO weeks (Monday start).
pub fn order_history(records: &[SalesTransaction]) -> Vec<OrderHistory> {
    let Some(latest) = latest_date(records) else {
        return Vec::new();
    };
    let last_week_start = latest - Duration::days(latest.weekday().num_days_from_monday() as i64);
    let week_starts: Vec<NaiveDate> = (0..HISTORY_WEEKS)
        .rev()
        .map(|i| last_week_start - Duration::weeks(i as i64))
        .collect();

    let mut products = aggregate(records, GroupBy::Product);
    rank_by_sales(&mut products);

    products
        .into_iter()
        .take(HISTORY_PRODUCTS)
        .map(|p| {
            let weeks = week_starts
                .iter()
                .map(|start| {
                    let end = *start + Duration::days(7);
                    let orders = records
                        .iter()
                        .filter(|r| r.product == p.group_key)
                        .filter(|r| r.date.map(|d| d >= *start && d < end).unwrap_or(false))
                        .count();
                    let iso = start.iso_week();
                    WeekCount {
                        week: format!("{}-W{:02}", iso.year(), iso.week()),
                        week_start: *start,
                        orders,
                    }
                })
                .collect();
            OrderHistory {
                product: p.group_key,
                weeks,
            }
        })
        .collect()
}

// ============================================================================
// Service
// ============================================================================

/// Dashboard service
pub struct DashboardService {
    store: Arc<dyn SalesStore>,
    reps: BTreeMap<String, Vec<String>>,
}

struct Selection {
    basis: GrowthBasis,
    current: Vec<SalesTransaction>,
    prior: Option<Vec<SalesTransaction>>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn SalesStore>, reps: BTreeMap<String, Vec<String>>) -> Self {
        Self { store, reps }
    }

    fn select(&self, query: &DashboardQuery) -> Result<Selection> {
        query.validate()?;
        let filter = query.to_filter(&self.reps);
        let current = self.store.query(&filter).context("Failed to load selection")?;

        let (basis, prior_filter) = prior_filter(&filter);
        let prior = match prior_filter {
            Some(f) => Some(self.store.query(&f).context("Failed to load prior period")?),
            None => None,
        };

        Ok(Selection {
            basis,
            current,
            prior,
        })
    }

    fn sorted(query: &DashboardQuery, mut rows: Vec<DashboardRow>) -> Vec<DashboardRow> {
        sort_rows(
            &mut rows,
            query.sort_by.unwrap_or_default(),
            query.sort_order.unwrap_or_default(),
        );
        rows
    }

    /// Aggregate the selection along one dimension, in first-seen order
    pub fn aggregate(&self, query: &DashboardQuery, group_by: GroupBy) -> Result<Vec<AggregatedGroup>> {
        query.validate()?;
        let records = self.store.query(&query.to_filter(&self.reps))?;
        Ok(aggregate(&records, group_by))
    }

    pub fn director(&self, query: &DashboardQuery) -> Result<DirectorDashboard> {
        let sel = self.select(query)?;
        let suppliers = rows(&sel.current, sel.prior.as_deref(), GroupBy::Supplier);

        Ok(DirectorDashboard {
            growth_basis: sel.basis,
            suppliers: Self::sorted(query, suppliers),
            summary: DashboardSummary::of(&sel.current),
        })
    }

    pub fn manager(&self, query: &DashboardQuery) -> Result<ManagerDashboard> {
        let sel = self.select(query)?;
        let as_of = latest_date(&sel.current);

        let mut customers = rows(&sel.current, sel.prior.as_deref(), GroupBy::Customer);
        fill_days_since_last_order(&mut customers, &sel.current, as_of);
        let products = rows(&sel.current, sel.prior.as_deref(), GroupBy::Product);
        let categories = rows(&sel.current, sel.prior.as_deref(), GroupBy::Category);

        Ok(ManagerDashboard {
            growth_basis: sel.basis,
            as_of,
            customers: Self::sorted(query, customers),
            products: Self::sorted(query, products),
            categories: Self::sorted(query, categories),
            summary: DashboardSummary::of(&sel.current),
        })
    }

    pub fn trader(&self, query: &DashboardQuery) -> Result<TraderDashboard> {
        let sel = self.select(query)?;
        let as_of = latest_date(&sel.current);

        let mut customers = rows(&sel.current, sel.prior.as_deref(), GroupBy::Customer);
        fill_days_since_last_order(&mut customers, &sel.current, as_of);

        Ok(TraderDashboard {
            growth_basis: sel.basis,
            as_of,
            customers: Self::sorted(query, customers),
            order_history: order_history(&sel.current),
            summary: DashboardSummary::of(&sel.current),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbSalesStore;
    use crate::config::default_reps;

    fn tx(date: (i32, u32, u32), customer: &str, product: &str, value: i64, mass: i64) -> SalesTransaction {
        SalesTransaction {
            transaction_type: "INV".to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            customer: customer.to_string(),
            product: product.to_string(),
            mass,
            sales_value: Decimal::from(value),
            sales_qty: 1,
            ..Default::default()
        }
    }

    fn service(records: &[SalesTransaction]) -> DashboardService {
        let store = DuckDbSalesStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store.replace_all(records).unwrap();
        DashboardService::new(Arc::new(store), default_reps())
    }

    fn sample() -> Vec<SalesTransaction> {
        vec![
            tx((2025, 4, 10), "Spar Chatsworth", "Whole Bird", 100, 10),
            tx((2025, 5, 2), "Spar Chatsworth", "Whole Bird", 150, 12),
            tx((2025, 5, 9), "Pick n Pay Westwood", "Breast Fillet", 300, 5),
            tx((2025, 5, 16), "Spar Chatsworth", "Wings", 50, 0),
        ]
    }

    #[test]
    fn test_query_parsing_treats_blanks_as_absent() {
        let q: DashboardQuery = serde_json::from_value(serde_json::json!({
            "year": "2025", "month": "", "rep": "All", "sort_by": "mass", "sort_order": "asc"
        }))
        .unwrap();
        assert_eq!(q.year, Some(2025));
        assert_eq!(q.month, None);
        assert_eq!(q.sort_by, Some(SortKey::Mass));
        assert_eq!(q.sort_order, Some(SortOrder::Asc));
    }

    #[test]
    fn test_invalid_month_rejected() {
        let svc = service(&sample());
        let q = DashboardQuery {
            year: Some(2025),
            month: Some(13),
            ..Default::default()
        };
        let err = svc.director(&q).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Validation(_))));
    }

    #[test]
    fn test_unrepresentable_year_rejected() {
        let svc = service(&sample());
        for year in [i32::MIN, 300_000] {
            let q = DashboardQuery {
                year: Some(year),
                ..Default::default()
            };
            let err = svc.director(&q).unwrap_err();
            assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Validation(_))));
            let err = svc.aggregate(&q, GroupBy::Total).unwrap_err();
            assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Validation(_))));
        }
    }

    #[test]
    fn test_prior_filter_without_previous_year() {
        let (basis, prior) = prior_filter(&SalesFilter::new().with_year(i32::MIN));
        assert_eq!(basis, GrowthBasis::None);
        assert!(prior.is_none());

        let (basis, prior) = prior_filter(&SalesFilter::new().with_year(i32::MIN).with_month(1));
        assert_eq!(basis, GrowthBasis::None);
        assert!(prior.is_none());
    }

    #[test]
    fn test_prior_filter_rolls_back_a_period() {
        let jan = SalesFilter::new().with_year(2025).with_month(1);
        let (basis, prior) = prior_filter(&jan);
        assert_eq!(basis, GrowthBasis::PreviousMonth);
        let prior = prior.unwrap();
        assert_eq!((prior.year, prior.month), (Some(2024), Some(12)));

        let (basis, prior) = prior_filter(&SalesFilter::new().with_year(2025));
        assert_eq!(basis, GrowthBasis::PreviousYear);
        assert_eq!(prior.unwrap().year, Some(2024));

        assert_eq!(prior_filter(&SalesFilter::new()).0, GrowthBasis::None);
    }

    #[test]
    fn test_director_growth_against_previous_month() {
        let svc = service(&sample());
        let q = DashboardQuery {
            year: Some(2025),
            month: Some(5),
            ..Default::default()
        };
        let dash = svc.director(&q).unwrap();

        assert_eq!(dash.growth_basis, GrowthBasis::PreviousMonth);
        // Sorted by sales value descending
        let names: Vec<_> = dash.suppliers.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Breast Fillet", "Whole Bird", "Wings"]);

        let whole_bird = &dash.suppliers[1];
        assert_eq!(whole_bird.sales_growth.to_string(), "+50.0%");
        assert_eq!(whole_bird.mass_growth.to_string(), "+20.0%");
        assert_eq!(dash.suppliers[0].sales_growth, PercentageChange::NoComp);

        assert_eq!(dash.summary.record_count, 3);
        assert_eq!(dash.summary.total_sales, Decimal::from(500));
    }

    #[test]
    fn test_rep_restricts_customers() {
        let svc = service(&sample());
        let q = DashboardQuery {
            rep: Some("Lyle".to_string()),
            ..Default::default()
        };
        let dash = svc.manager(&q).unwrap();
        assert_eq!(dash.customers.len(), 1);
        assert_eq!(dash.customers[0].name, "Pick n Pay Westwood");
        assert_eq!(dash.growth_basis, GrowthBasis::None);
        assert_eq!(dash.customers[0].sales_growth, PercentageChange::NoComp);
    }

    #[test]
    fn test_days_since_last_order_relative_to_latest_date() {
        let svc = service(&sample());
        let dash = svc.manager(&DashboardQuery::default()).unwrap();
        assert_eq!(dash.as_of, NaiveDate::from_ymd_opt(2025, 5, 16));

        let pnp = dash.customers.iter().find(|c| c.name == "Pick n Pay Westwood").unwrap();
        assert_eq!(pnp.days_since_last_order, Some(7));
        assert_eq!(dash.categories.len(), 3);
    }

    #[test]
    fn test_trader_order_history() {
        let svc = service(&sample());
        let dash = svc.trader(&DashboardQuery::default()).unwrap();

        assert_eq!(dash.order_history.len(), 3);
        let fillet = &dash.order_history[0];
        assert_eq!(fillet.product, "Breast Fillet");
        assert_eq!(fillet.weeks.len(), HISTORY_WEEKS);
        // 2025-05-16 is a Friday; its week starts Monday 12 May
        assert_eq!(fillet.weeks[4].week_start, NaiveDate::from_ymd_opt(2025, 5, 12).unwrap());
        assert_eq!(fillet.weeks[4].week, "2025-W20");
        assert_eq!(fillet.weeks[3].orders, 1);
        let total: usize = dash.order_history.iter().flat_map(|h| &h.weeks).map(|w| w.orders).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_sort_by_name_ascending() {
        let mut rows = rows(&sample(), None, GroupBy::Customer);
        sort_rows(&mut rows, SortKey::Name, SortOrder::Asc);
        assert_eq!(rows[0].name, "Pick n Pay Westwood");
    }
}
