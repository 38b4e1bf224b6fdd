//! Grouped summary statistics over sales rows

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use super::classify::{CustomerGroup, ProductCategory};
use super::result::{Error, Result};
use super::rounding;
use super::sale::SalesTransaction;

/// Key used when no grouping dimension applies
pub const TOTAL_KEY: &str = "Total";

/// Grouping dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Product,
    Customer,
    /// Groups by product name. The source data carries no supplier column.
    Supplier,
    Category,
    CustomerGroup,
    #[default]
    Total,
}

impl GroupBy {
    /// Group key of a row under this dimension
    pub fn key_for(&self, tx: &SalesTransaction) -> String {
        match self {
            GroupBy::Product | GroupBy::Supplier => tx.product.clone(),
            GroupBy::Customer => tx.customer.clone(),
            GroupBy::Category => ProductCategory::classify(&tx.product).label().to_string(),
            GroupBy::CustomerGroup => CustomerGroup::classify(&tx.customer).label().to_string(),
            GroupBy::Total => TOTAL_KEY.to_string(),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupBy::Product => "product",
            GroupBy::Customer => "customer",
            GroupBy::Supplier => "supplier",
            GroupBy::Category => "category",
            GroupBy::CustomerGroup => "customer_group",
            GroupBy::Total => "total",
        };
        f.write_str(name)
    }
}

impl FromStr for GroupBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "product" => Ok(GroupBy::Product),
            "customer" => Ok(GroupBy::Customer),
            "supplier" => Ok(GroupBy::Supplier),
            "category" => Ok(GroupBy::Category),
            "customer_group" | "group" => Ok(GroupBy::CustomerGroup),
            "" | "total" | "none" => Ok(GroupBy::Total),
            other => Err(Error::validation(format!("Unknown group_by '{}'", other))),
        }
    }
}

/// Insertion-ordered map from group key to value
#[derive(Debug, Clone)]
pub struct OrderedGroups<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, V)>,
}

impl<K: Eq + Hash + Clone, V> OrderedGroups<K, V> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Value for `key`, created with `init` on first sight
    pub fn entry_or_insert_with(&mut self, key: K, init: impl FnOnce() -> V) -> &mut V {
        let pos = match self.index.get(&key) {
            Some(&pos) => pos,
            None => {
                let pos = self.entries.len();
                self.index.insert(key.clone(), pos);
                self.entries.push((key, init()));
                pos
            }
        };
        &mut self.entries[pos].1
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn into_entries(self) -> Vec<(K, V)> {
        self.entries
    }
}

impl<K: Eq + Hash + Clone, V> Default for OrderedGroups<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct Accumulator<'a> {
    sales_value: Decimal,
    mass: i64,
    sales_qty: i64,
    customers: HashSet<&'a str>,
    records: usize,
}

impl<'a> Accumulator<'a> {
    fn add(&mut self, tx: &'a SalesTransaction) {
        self.sales_value += tx.sales_value;
        self.mass += tx.mass;
        self.sales_qty += tx.sales_qty;
        self.customers.insert(tx.customer.as_str());
        self.records += 1;
    }

    fn finish(self, key: String) -> AggregatedGroup {
        AggregatedGroup {
            avg_price_per_kg: price_per_kg(self.sales_value, Decimal::from(self.mass)),
            group_key: key,
            sales_value_sum: self.sales_value,
            mass_sum: self.mass,
            sales_qty_sum: self.sales_qty,
            distinct_customer_count: self.customers.len(),
            record_count: self.records,
        }
    }
}

/// Summary statistics for one group
///
/// Sums are kept exact; `sales_value_sum` is rounded to whole units only
/// when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedGroup {
    pub group_key: String,
    #[serde(serialize_with = "whole_units")]
    pub sales_value_sum: Decimal,
    pub mass_sum: i64,
    pub sales_qty_sum: i64,
    pub distinct_customer_count: usize,
    pub record_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_price_per_kg: Decimal,
}

fn whole_units<S: Serializer>(value: &Decimal, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    rust_decimal::serde::float::serialize(&rounding::whole(*value), serializer)
}

/// `value / mass` at currency precision, or 0 when there is no mass
pub fn price_per_kg(value: Decimal, mass: Decimal) -> Decimal {
    if mass > Decimal::ZERO {
        rounding::currency(value / mass)
    } else {
        Decimal::ZERO
    }
}

/// Group `records` by `group_by` in one pass. Groups come out in first-seen
/// key order.
pub fn aggregate<'a, I>(records: I, group_by: GroupBy) -> Vec<AggregatedGroup>
where
    I: IntoIterator<Item = &'a SalesTransaction>,
{
    let mut groups: OrderedGroups<String, Accumulator<'a>> = OrderedGroups::new();
    for tx in records {
        groups
            .entry_or_insert_with(group_by.key_for(tx), Accumulator::default)
            .add(tx);
    }
    groups
        .into_entries()
        .into_iter()
        .map(|(key, acc)| acc.finish(key))
        .collect()
}

/// Sort groups by sales value, largest first. Ties keep first-seen order.
pub fn rank_by_sales(groups: &mut [AggregatedGroup]) {
    groups.sort_by(|a, b| b.sales_value_sum.cmp(&a.sales_value_sum));
}

/// Sort groups by mass, heaviest first. Ties keep first-seen order.
pub fn rank_by_mass(groups: &mut [AggregatedGroup]) {
    groups.sort_by(|a, b| b.mass_sum.cmp(&a.mass_sum));
}
