//! Filter options offered to dashboard users

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::adapters::duckdb::{DuckDbSalesStore, TextColumn};
use crate::domain::ProductCategory;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub months: Vec<u32>,
    pub reps: Vec<String>,
    /// Product names. The supplier filter and the director's supplier rows
    /// are keyed by product until a supplier mapping exists.
    pub suppliers: Vec<String>,
    pub customers: Vec<String>,
    /// Product categories present in the data
    pub categories: Vec<String>,
}

pub struct FilterService {
    store: Arc<DuckDbSalesStore>,
    reps: BTreeMap<String, Vec<String>>,
}

impl FilterService {
    pub fn new(store: Arc<DuckDbSalesStore>, reps: BTreeMap<String, Vec<String>>) -> Self {
        Self { store, reps }
    }

    pub fn options(&self) -> Result<FilterOptions> {
        let customers = self.store.distinct_values(TextColumn::Customer)?;
        let products = self.store.distinct_values(TextColumn::Product)?;
        if customers.is_empty() && products.is_empty() {
            return Ok(FilterOptions::default());
        }

        let present: Vec<ProductCategory> =
            products.iter().map(|p| ProductCategory::classify(p)).collect();
        let categories = ProductCategory::ALL
            .iter()
            .filter(|c| present.contains(c))
            .map(|c| c.label().to_string())
            .collect();

        let mut reps: Vec<String> = self.reps.keys().cloned().collect();
        reps.push("All".to_string());

        Ok(FilterOptions {
            years: self.store.years()?,
            months: (1..=12).collect(),
            reps,
            suppliers: products,
            customers,
            categories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_reps;
    use crate::domain::SalesTransaction;
    use crate::ports::SalesStore;
    use crate::services::{DashboardQuery, DashboardService};

    fn tx(customer: &str, product: &str, year: i32) -> SalesTransaction {
        SalesTransaction {
            customer: customer.to_string(),
            product: product.to_string(),
            date: chrono::NaiveDate::from_ymd_opt(year, 3, 1),
            ..Default::default()
        }
    }

    #[test]
    fn test_options_reflect_data() {
        let store = Arc::new(DuckDbSalesStore::open_in_memory().unwrap());
        store.ensure_schema().unwrap();
        let service = FilterService::new(store.clone(), default_reps());

        assert_eq!(service.options().unwrap(), FilterOptions::default());

        store
            .replace_all(&[
                tx("Spar Chatsworth", "Breast Fillet", 2025),
                tx("Pick n Pay Westwood", "Whole Bird", 2024),
                tx("Spar Umhlanga", "Breast Fillet", 2025),
            ])
            .unwrap();

        let options = service.options().unwrap();
        assert_eq!(options.years, vec![2024, 2025]);
        assert_eq!(options.months.len(), 12);
        assert_eq!(options.reps, vec!["Calvyn", "Lyle", "Uriel", "All"]);
        assert_eq!(options.suppliers, vec!["Breast Fillet", "Whole Bird"]);
        assert_eq!(options.categories, vec!["WB", "Fillets"]);
        assert_eq!(options.customers.len(), 3);
    }

    #[test]
    fn test_every_offered_supplier_selects_rows() {
        let store = Arc::new(DuckDbSalesStore::open_in_memory().unwrap());
        store.ensure_schema().unwrap();
        store
            .replace_all(&[
                tx("Spar Chatsworth", "Breast Fillet", 2025),
                tx("Mega Save", "Wings", 2025),
            ])
            .unwrap();

        let options = FilterService::new(store.clone(), default_reps()).options().unwrap();
        let dashboards = DashboardService::new(store, default_reps());
        for supplier in options.suppliers {
            let query = DashboardQuery {
                supplier: Some(supplier.clone()),
                ..Default::default()
            };
            let view = dashboards.director(&query).unwrap();
            assert!(view.summary.record_count > 0, "no rows for supplier {}", supplier);
        }
    }
}
