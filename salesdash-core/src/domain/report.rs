//! Fixed-shape sales report
//!
//! [`assemble`] is a pure function from pre-computed aggregates to a
//! [`Report`]. Identical inputs serialize to identical bytes: every map in the
//! report has a fixed or explicitly sorted key order.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::aggregate::{aggregate, price_per_kg, rank_by_mass, rank_by_sales, AggregatedGroup, GroupBy};
use super::classify::{CustomerGroup, ProductCategory};
use super::comparison::{ComparisonResult, PercentageChange};
use super::period::ComparisonPeriod;
use super::result::{Error, Result};
use super::rounding;
use super::sale::SalesTransaction;

/// Entries shown in ranked sections
pub const TOP_N: usize = 5;

/// Report date label, e.g. `17 May 2025`
pub fn date_label(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

// ============================================================================
// Value types
// ============================================================================

/// A currency or mass figure, serialized as a JSON number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(pub Decimal);

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        rust_decimal::serde::float::deserialize(deserializer).map(Amount)
    }
}

/// Label-keyed section that keeps its entry order when serialized as a
/// JSON object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakdown<V>(pub Vec<(String, V)>);

impl<V> Breakdown<V> {
    pub fn get(&self, label: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == label).map(|(_, v)| v)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for Breakdown<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> FromIterator<(String, V)> for Breakdown<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<V: Serialize> Serialize for Breakdown<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Breakdown<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct BreakdownVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for BreakdownVisitor<V> {
            type Value = Breakdown<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of labels to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, V>()? {
                    entries.push((k, v));
                }
                Ok(Breakdown(entries))
            }
        }

        deserializer.deserialize_map(BreakdownVisitor(PhantomData))
    }
}

// ============================================================================
// Report shapes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalSales {
    /// Kilograms, one decimal place
    pub total_mass: Amount,
    pub total_sales_value: Amount,
    pub price_per_kg: Amount,
    pub total_orders: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub sales_value: Amount,
    pub mass: Amount,
    /// Only reported for frozen value-add
    pub mass_tons: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusLine {
    /// `"1.2t"` from one ton upwards, otherwise `"850kg"`
    pub mass: String,
    pub customers: usize,
}

/// Single-period report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsReport {
    pub date: String,
    pub total_sales: TotalSales,
    pub product_categories: Breakdown<CategoryTotals>,
    pub customer_groups: Breakdown<Amount>,
    pub top_customers: Breakdown<Amount>,
    pub product_focus_lines: Breakdown<FocusLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalSalesComparison {
    pub total_mass: ComparisonResult,
    pub total_sales_value: ComparisonResult,
    pub price_per_kg: ComparisonResult,
    pub total_orders: ComparisonResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub sales_value: ComparisonResult,
    pub mass: ComparisonResult,
}

/// Period-over-period report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub date: String,
    pub period: ComparisonPeriod,
    pub period_name: String,
    pub total_sales: TotalSalesComparison,
    pub product_categories: Breakdown<CategoryComparison>,
    pub customer_groups: Breakdown<ComparisonResult>,
    pub top_customers: Breakdown<ComparisonResult>,
    pub product_focus_lines: Breakdown<FocusLine>,
}

/// Assembled report, tagged by mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Report {
    Totals(TotalsReport),
    Compare(ComparisonReport),
}

/// Report flavour requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    #[default]
    Totals,
    Compare(ComparisonPeriod),
}

impl ReportMode {
    /// Build a mode from the `comparison_mode` / `period` pair used by the upload API
    pub fn from_flags(comparison_mode: bool, period: Option<ComparisonPeriod>) -> Self {
        if comparison_mode {
            ReportMode::Compare(period.unwrap_or(ComparisonPeriod::Daily))
        } else {
            ReportMode::Totals
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportMode::Totals => "totals",
            ReportMode::Compare(_) => "compare",
        }
    }

    pub fn period(&self) -> Option<ComparisonPeriod> {
        match self {
            ReportMode::Totals => None,
            ReportMode::Compare(p) => Some(*p),
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportMode::Totals => f.write_str("totals"),
            ReportMode::Compare(p) => write!(f, "compare ({})", p),
        }
    }
}

/// Accepts `totals`, `compare` (daily), or a period name
impl FromStr for ReportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "totals" | "total" | "" => Ok(ReportMode::Totals),
            "compare" => Ok(ReportMode::Compare(ComparisonPeriod::Daily)),
            other => other.parse().map(ReportMode::Compare),
        }
    }
}

impl Serialize for ReportMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Knobs for the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Products tracked in the focus-lines section. Empty means the heaviest
    /// products of the period.
    pub focus_lines: Vec<String>,
    pub top_n: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            focus_lines: Vec::new(),
            top_n: TOP_N,
        }
    }
}

// ============================================================================
// Assembler input
// ============================================================================

/// Aggregates of one period along every report dimension
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodAggregates {
    pub total: Option<AggregatedGroup>,
    pub by_category: Vec<AggregatedGroup>,
    pub by_customer_group: Vec<AggregatedGroup>,
    pub by_customer: Vec<AggregatedGroup>,
    pub by_product: Vec<AggregatedGroup>,
}

impl PeriodAggregates {
    pub fn from_records(records: &[SalesTransaction]) -> Self {
        Self {
            total: aggregate(records, GroupBy::Total).into_iter().next(),
            by_category: aggregate(records, GroupBy::Category),
            by_customer_group: aggregate(records, GroupBy::CustomerGroup),
            by_customer: aggregate(records, GroupBy::Customer),
            by_product: aggregate(records, GroupBy::Product),
        }
    }

    fn find<'a>(groups: &'a [AggregatedGroup], key: &str) -> Option<&'a AggregatedGroup> {
        groups.iter().find(|g| g.group_key == key)
    }

    fn sales(groups: &[AggregatedGroup], key: &str) -> Decimal {
        Self::find(groups, key).map(|g| g.sales_value_sum).unwrap_or_default()
    }

    fn mass(groups: &[AggregatedGroup], key: &str) -> Decimal {
        Self::find(groups, key).map(|g| Decimal::from(g.mass_sum)).unwrap_or_default()
    }

    fn total_sales(&self) -> Decimal {
        self.total.as_ref().map(|t| t.sales_value_sum).unwrap_or_default()
    }

    fn total_mass(&self) -> Decimal {
        self.total.as_ref().map(|t| Decimal::from(t.mass_sum)).unwrap_or_default()
    }

    fn total_orders(&self) -> usize {
        self.total.as_ref().map(|t| t.record_count).unwrap_or(0)
    }
}

/// Everything [`assemble`] needs: the anchor date and the aggregates of the
/// current period, plus the prior period for comparison reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOutput {
    pub anchor: NaiveDate,
    pub current: PeriodAggregates,
    pub prior: Option<PeriodAggregates>,
}

impl AggregateOutput {
    pub fn new(anchor: NaiveDate, current: &[SalesTransaction], prior: Option<&[SalesTransaction]>) -> Self {
        Self {
            anchor,
            current: PeriodAggregates::from_records(current),
            prior: prior.map(PeriodAggregates::from_records),
        }
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Shape aggregates into a report. Pure; a comparison report without prior
/// aggregates treats the prior period as empty.
pub fn assemble(output: &AggregateOutput, mode: &ReportMode, options: &ReportOptions) -> Report {
    match mode {
        ReportMode::Totals => Report::Totals(assemble_totals(output, options)),
        ReportMode::Compare(period) => {
            Report::Compare(assemble_comparison(output, *period, options))
        }
    }
}

fn assemble_totals(output: &AggregateOutput, options: &ReportOptions) -> TotalsReport {
    let current = &output.current;
    let sales = current.total_sales();
    let mass = current.total_mass();

    let product_categories = ProductCategory::ALL
        .iter()
        .map(|category| {
            let label = category.label();
            let mass = PeriodAggregates::mass(&current.by_category, label);
            let totals = CategoryTotals {
                sales_value: Amount(rounding::currency(PeriodAggregates::sales(&current.by_category, label))),
                mass: Amount(rounding::tenths(mass)),
                mass_tons: (*category == ProductCategory::ValueAddFrozen)
                    .then(|| Amount(rounding::tenths(mass / Decimal::ONE_THOUSAND))),
            };
            (label.to_string(), totals)
        })
        .collect();

    let mut groups: Vec<(String, Amount)> = CustomerGroup::REPORTED
        .iter()
        .map(|group| {
            let label = group.label();
            let value = PeriodAggregates::sales(&current.by_customer_group, label);
            (label.to_string(), Amount(rounding::currency(value)))
        })
        .collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1));

    let top_customers = top_by_sales(&current.by_customer, options.top_n)
        .into_iter()
        .map(|g| (g.group_key.clone(), Amount(rounding::currency(g.sales_value_sum))))
        .collect();

    TotalsReport {
        date: date_label(output.anchor),
        total_sales: TotalSales {
            total_mass: Amount(rounding::tenths(mass)),
            total_sales_value: Amount(rounding::currency(sales)),
            price_per_kg: Amount(price_per_kg(sales, mass)),
            total_orders: current.total_orders(),
        },
        product_categories,
        customer_groups: Breakdown(groups),
        top_customers,
        product_focus_lines: focus_lines(&current.by_product, options),
    }
}

fn assemble_comparison(
    output: &AggregateOutput,
    period: ComparisonPeriod,
    options: &ReportOptions,
) -> ComparisonReport {
    let current = &output.current;
    let empty = PeriodAggregates::default();
    let prior = output.prior.as_ref().unwrap_or(&empty);

    // Totals of an empty prior period count as "no comparison"
    let prior_present = |value: Decimal| (!value.is_zero()).then_some(value);

    let cur_sales = current.total_sales();
    let cur_mass = current.total_mass();
    let prior_sales = prior.total_sales();
    let prior_mass = prior.total_mass();

    let total_sales = TotalSalesComparison {
        total_mass: ComparisonResult::new(
            "total_mass",
            rounding::tenths(cur_mass),
            prior_present(rounding::tenths(prior_mass)),
        ),
        total_sales_value: ComparisonResult::new(
            "total_sales_value",
            rounding::currency(cur_sales),
            prior_present(rounding::currency(prior_sales)),
        ),
        price_per_kg: ComparisonResult::new(
            "price_per_kg",
            price_per_kg(cur_sales, cur_mass),
            prior_present(price_per_kg(prior_sales, prior_mass)),
        ),
        total_orders: ComparisonResult::new(
            "total_orders",
            Decimal::from(current.total_orders()),
            prior_present(Decimal::from(prior.total_orders())),
        ),
    };

    let leaf = |name: &str, cur: Decimal, groups: &[AggregatedGroup], value: fn(&AggregatedGroup) -> Decimal| {
        let prior_value = PeriodAggregates::find(groups, name).map(value);
        ComparisonResult::new(name, cur, prior_value)
    };
    let sales_of = |g: &AggregatedGroup| rounding::currency(g.sales_value_sum);
    let mass_of = |g: &AggregatedGroup| rounding::tenths(Decimal::from(g.mass_sum));

    let product_categories = ProductCategory::ALL
        .iter()
        .map(|category| {
            let label = category.label();
            let cur_sales = rounding::currency(PeriodAggregates::sales(&current.by_category, label));
            let cur_mass = rounding::tenths(PeriodAggregates::mass(&current.by_category, label));
            (
                label.to_string(),
                CategoryComparison {
                    sales_value: leaf(label, cur_sales, &prior.by_category, sales_of),
                    mass: leaf(label, cur_mass, &prior.by_category, mass_of),
                },
            )
        })
        .collect();

    let mut groups: Vec<(String, ComparisonResult)> = CustomerGroup::REPORTED
        .iter()
        .map(|group| {
            let label = group.label();
            let cur = rounding::currency(PeriodAggregates::sales(&current.by_customer_group, label));
            (label.to_string(), leaf(label, cur, &prior.by_customer_group, sales_of))
        })
        .collect();
    groups.sort_by(|a, b| b.1.current_total.cmp(&a.1.current_total));

    let top_customers = top_by_sales(&current.by_customer, options.top_n)
        .into_iter()
        .map(|g| {
            let cur = rounding::currency(g.sales_value_sum);
            (g.group_key.clone(), leaf(&g.group_key, cur, &prior.by_customer, sales_of))
        })
        .collect();

    ComparisonReport {
        date: date_label(output.anchor),
        period,
        period_name: period.label().to_string(),
        total_sales,
        product_categories,
        customer_groups: Breakdown(groups),
        top_customers,
        product_focus_lines: focus_lines(&current.by_product, options),
    }
}

fn top_by_sales(groups: &[AggregatedGroup], n: usize) -> Vec<AggregatedGroup> {
    let mut ranked = groups.to_vec();
    rank_by_sales(&mut ranked);
    ranked.truncate(n);
    ranked
}

fn focus_lines(products: &[AggregatedGroup], options: &ReportOptions) -> Breakdown<FocusLine> {
    if options.focus_lines.is_empty() {
        let mut ranked: Vec<AggregatedGroup> =
            products.iter().filter(|g| g.mass_sum > 0).cloned().collect();
        rank_by_mass(&mut ranked);
        ranked.truncate(options.top_n);
        return ranked
            .into_iter()
            .map(|g| {
                let line = FocusLine {
                    mass: format_mass(g.mass_sum),
                    customers: g.distinct_customer_count,
                };
                (g.group_key, line)
            })
            .collect();
    }

    options
        .focus_lines
        .iter()
        .map(|name| {
            let group = products
                .iter()
                .find(|g| g.group_key == *name)
                .or_else(|| products.iter().find(|g| g.group_key.eq_ignore_ascii_case(name)));
            let line = FocusLine {
                mass: format_mass(group.map(|g| g.mass_sum).unwrap_or(0)),
                customers: group.map(|g| g.distinct_customer_count).unwrap_or(0),
            };
            (name.clone(), line)
        })
        .collect()
}

/// `"1.2t"` from one ton upwards, otherwise whole kilograms
pub fn format_mass(kg: i64) -> String {
    let kg = Decimal::from(kg);
    let tons = kg / Decimal::ONE_THOUSAND;
    if tons >= Decimal::ONE {
        let mut t = rounding::tenths(tons);
        t.rescale(1);
        format!("{}t", t)
    } else {
        format!("{}kg", kg)
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn money(value: Decimal) -> String {
    let mut v = rounding::currency(value);
    v.rescale(2);
    format!("R{}", v)
}

fn kilograms(value: Decimal) -> String {
    let mut v = rounding::tenths(value);
    v.rescale(1);
    format!("{}kg", v)
}

impl Report {
    pub fn date(&self) -> &str {
        match self {
            Report::Totals(r) => &r.date,
            Report::Compare(r) => &r.date,
        }
    }

    pub fn mode(&self) -> ReportMode {
        match self {
            Report::Totals(_) => ReportMode::Totals,
            Report::Compare(r) => ReportMode::Compare(r.period),
        }
    }

    /// Compact plain-text summary for SMS delivery
    pub fn to_sms_text(&self) -> String {
        let mut lines = Vec::new();
        match self {
            Report::Totals(r) => {
                lines.push(format!("Sales Report {}", r.date));
                lines.push(format!(
                    "Total: {} | {} | {}/kg | {} orders",
                    money(r.total_sales.total_sales_value.0),
                    kilograms(r.total_sales.total_mass.0),
                    money(r.total_sales.price_per_kg.0),
                    r.total_sales.total_orders
                ));
                let categories: Vec<String> = r
                    .product_categories
                    .iter()
                    .filter(|(_, c)| !c.sales_value.0.is_zero())
                    .map(|(label, c)| format!("{} {}", label, money(c.sales_value.0)))
                    .collect();
                if !categories.is_empty() {
                    lines.push(format!("Categories: {}", categories.join(", ")));
                }
                let groups: Vec<String> = r
                    .customer_groups
                    .iter()
                    .filter(|(_, v)| !v.0.is_zero())
                    .map(|(label, v)| format!("{} {}", label, money(v.0)))
                    .collect();
                if !groups.is_empty() {
                    lines.push(format!("Groups: {}", groups.join(", ")));
                }
                let top: Vec<String> = r
                    .top_customers
                    .iter()
                    .map(|(name, v)| format!("{} {}", name, money(v.0)))
                    .collect();
                if !top.is_empty() {
                    lines.push(format!("Top: {}", top.join(", ")));
                }
                push_focus_lines(&mut lines, &r.product_focus_lines);
            }
            Report::Compare(r) => {
                lines.push(format!("Sales Report {} ({})", r.date, r.period_name));
                let t = &r.total_sales;
                lines.push(format!(
                    "Total: {} ({}) | {} ({}) | {}/kg ({})",
                    money(t.total_sales_value.current_total),
                    t.total_sales_value.percentage_change,
                    kilograms(t.total_mass.current_total),
                    t.total_mass.percentage_change,
                    money(t.price_per_kg.current_total),
                    t.price_per_kg.percentage_change
                ));
                let categories: Vec<String> = r
                    .product_categories
                    .iter()
                    .filter(|(_, c)| !c.sales_value.current_total.is_zero())
                    .map(|(label, c)| format!("{} {}", label, change(&c.sales_value)))
                    .collect();
                if !categories.is_empty() {
                    lines.push(format!("Categories: {}", categories.join(", ")));
                }
                let groups: Vec<String> = r
                    .customer_groups
                    .iter()
                    .filter(|(_, c)| !c.current_total.is_zero())
                    .map(|(label, c)| format!("{} {}", label, change(c)))
                    .collect();
                if !groups.is_empty() {
                    lines.push(format!("Groups: {}", groups.join(", ")));
                }
                push_focus_lines(&mut lines, &r.product_focus_lines);
            }
        }
        lines.join("\n")
    }
}

fn change(result: &ComparisonResult) -> String {
    match result.percentage_change {
        PercentageChange::NoComp => format!("{} (no comp)", money(result.current_total)),
        pct => format!("{} ({})", money(result.current_total), pct),
    }
}

fn push_focus_lines(lines: &mut Vec<String>, focus: &Breakdown<FocusLine>) {
    let entries: Vec<String> = focus
        .iter()
        .map(|(name, f)| format!("{} {} ({} cust)", name, f.mass, f.customers))
        .collect();
    if !entries.is_empty() {
        lines.push(format!("Focus: {}", entries.join(", ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(customer: &str, product: &str, sales: &str, mass: i64) -> SalesTransaction {
        SalesTransaction {
            customer: customer.to_string(),
            product: product.to_string(),
            sales_value: Decimal::from_str(sales).unwrap(),
            mass,
            transaction_type: "INV".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 17),
            ..Default::default()
        }
    }

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 17).unwrap()
    }

    fn sample() -> Vec<SalesTransaction> {
        vec![
            tx("Spar Chatsworth", "Whole Bird No Gib", "1000.00", 400),
            tx("Pick n Pay Westwood", "Breast Fillet", "2500.50", 900),
            tx("Mega Save Chatsworth", "Crumbed Strips (FRZ)", "800.25", 1500),
            tx("Spar Chatsworth", "Breast Fillet", "300.00", 100),
            tx("Corner Cafe", "Giblets", "50.00", 20),
        ]
    }

    fn totals(records: &[SalesTransaction], options: &ReportOptions) -> TotalsReport {
        match assemble(&AggregateOutput::new(anchor(), records, None), &ReportMode::Totals, options) {
            Report::Totals(r) => r,
            Report::Compare(_) => panic!("expected a totals report"),
        }
    }

    #[test]
    fn test_totals_shape() {
        let report = totals(&sample(), &ReportOptions::default());

        assert_eq!(report.date, "17 May 2025");
        assert_eq!(report.total_sales.total_orders, 5);
        assert_eq!(report.total_sales.total_mass.0, Decimal::from(2920));
        assert_eq!(report.total_sales.total_sales_value.0, Decimal::from_str("4650.75").unwrap());
        // 4650.75 / 2920 = 1.5927...
        assert_eq!(report.total_sales.price_per_kg.0, Decimal::from_str("1.59").unwrap());

        let labels: Vec<_> = report.product_categories.labels().collect();
        assert_eq!(labels, vec!["WB", "Deli WB", "Fillets", "Portion", "V/Add", "V/Add Frozen", "Offal Fresh"]);
        let frozen = report.product_categories.get("V/Add Frozen").unwrap();
        assert_eq!(frozen.mass_tons, Some(Amount(Decimal::from_str("1.5").unwrap())));
        assert_eq!(report.product_categories.get("WB").unwrap().mass_tons, None);
        assert_eq!(
            report.product_categories.get("Fillets").unwrap().sales_value.0,
            Decimal::from_str("2800.50").unwrap()
        );
    }

    #[test]
    fn test_customer_groups_sorted_descending_and_exclude_other() {
        let report = totals(&sample(), &ReportOptions::default());
        let labels: Vec<_> = report.customer_groups.labels().collect();
        assert_eq!(labels.len(), 6);
        assert_eq!(&labels[..3], &["PnP", "Spar D/Ship", "Mega"]);
        assert!(report.customer_groups.get("Other").is_none());
    }

    #[test]
    fn test_top_customers() {
        let report = totals(&sample(), &ReportOptions::default());
        let names: Vec<_> = report.top_customers.labels().collect();
        assert_eq!(
            names,
            vec!["Pick n Pay Westwood", "Spar Chatsworth", "Mega Save Chatsworth", "Corner Cafe"]
        );
    }

    #[test]
    fn test_default_focus_lines_are_heaviest_products() {
        let report = totals(&sample(), &ReportOptions::default());
        let first = report.product_focus_lines.iter().next().unwrap();
        assert_eq!(first.0, "Crumbed Strips (FRZ)");
        assert_eq!(first.1.mass, "1.5t");

        let fillet = report.product_focus_lines.get("Breast Fillet").unwrap();
        assert_eq!(fillet.mass, "1.0t");
        assert_eq!(fillet.customers, 2);
    }

    #[test]
    fn test_configured_focus_lines() {
        let options = ReportOptions {
            focus_lines: vec!["giblets".to_string(), "Wings".to_string()],
            ..Default::default()
        };
        let report = totals(&sample(), &options);
        let giblets = report.product_focus_lines.get("giblets").unwrap();
        assert_eq!(giblets.mass, "20kg");
        assert_eq!(giblets.customers, 1);
        assert_eq!(report.product_focus_lines.get("Wings").unwrap().mass, "0kg");
    }

    #[test]
    fn test_empty_period_gives_zeroed_report() {
        let report = totals(&[], &ReportOptions::default());
        assert_eq!(report.total_sales.total_orders, 0);
        assert_eq!(report.total_sales.price_per_kg.0, Decimal::ZERO);
        assert_eq!(report.product_categories.len(), 7);
        assert!(report.top_customers.is_empty());
        assert!(report.product_focus_lines.is_empty());
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let output = AggregateOutput::new(anchor(), &sample(), Some(&sample()[..2]));
        for mode in [ReportMode::Totals, ReportMode::Compare(ComparisonPeriod::Weekly)] {
            let a = serde_json::to_string(&assemble(&output, &mode, &ReportOptions::default())).unwrap();
            let b = serde_json::to_string(&assemble(&output, &mode, &ReportOptions::default())).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_comparison_report() {
        let prior = vec![
            tx("Spar Chatsworth", "Whole Bird No Gib", "800.00", 400),
            tx("Pick n Pay Westwood", "Breast Fillet", "0", 0),
        ];
        let output = AggregateOutput::new(anchor(), &sample(), Some(&prior));
        let report = match assemble(&output, &ReportMode::Compare(ComparisonPeriod::Daily), &ReportOptions::default()) {
            Report::Compare(r) => r,
            Report::Totals(_) => panic!("expected a comparison report"),
        };

        assert_eq!(report.period_name, "Today vs Yesterday");
        let wb = report.product_categories.get("WB").unwrap();
        assert_eq!(wb.sales_value.percentage_change.to_string(), "+25.0%");

        // Prior fillet sales were zero
        let fillets = report.product_categories.get("Fillets").unwrap();
        assert_eq!(fillets.sales_value.percentage_change, PercentageChange::NoComp);

        // No prior frozen sales at all
        let frozen = report.product_categories.get("V/Add Frozen").unwrap();
        assert_eq!(frozen.sales_value.prior_total, None);

        assert_eq!(
            report.total_sales.total_orders.percentage_change.to_string(),
            "+150.0%"
        );
    }

    #[test]
    fn test_comparison_without_prior_is_all_no_comp() {
        let output = AggregateOutput::new(anchor(), &sample(), None);
        let report = assemble(&output, &ReportMode::Compare(ComparisonPeriod::Monthly), &ReportOptions::default());
        let Report::Compare(report) = report else {
            panic!("expected a comparison report");
        };
        assert_eq!(report.total_sales.total_sales_value.percentage_change, PercentageChange::NoComp);
    }

    #[test]
    fn test_report_json_round_trip_keeps_order() {
        let report = assemble(
            &AggregateOutput::new(anchor(), &sample(), None),
            &ReportMode::Totals,
            &ReportOptions::default(),
        );
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.starts_with("{\"mode\":\"totals\""));

        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(serde_json::to_string(&back).unwrap(), json);
    }

    #[test]
    fn test_sms_text() {
        let report = assemble(
            &AggregateOutput::new(anchor(), &sample(), None),
            &ReportMode::Totals,
            &ReportOptions::default(),
        );
        let text = report.to_sms_text();
        assert!(text.starts_with("Sales Report 17 May 2025\n"));
        assert!(text.contains("Total: R4650.75 | 2920.0kg | R1.59/kg | 5 orders"));
        assert!(text.contains("Top: Pick n Pay Westwood R2500.50"));
    }

    #[test]
    fn test_format_mass() {
        assert_eq!(format_mass(850), "850kg");
        assert_eq!(format_mass(1000), "1.0t");
        assert_eq!(format_mass(1250), "1.3t");
        assert_eq!(format_mass(0), "0kg");
    }

    #[test]
    fn test_report_mode_parsing() {
        assert_eq!("totals".parse::<ReportMode>().unwrap(), ReportMode::Totals);
        assert_eq!(
            "compare".parse::<ReportMode>().unwrap(),
            ReportMode::Compare(ComparisonPeriod::Daily)
        );
        assert_eq!(
            "monthly".parse::<ReportMode>().unwrap(),
            ReportMode::Compare(ComparisonPeriod::Monthly)
        );
        assert!("sideways".parse::<ReportMode>().is_err());
    }
}
