//! Sales transaction domain model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::raw_row::{parse_date, parse_number, truncate_chars, RawCell, RawRow};
use super::rounding;

/// Storage limit for short text columns (transaction type, account number)
pub const SHORT_TEXT_MAX: usize = 50;
/// Storage limit for name columns (customer, product)
pub const LONG_TEXT_MAX: usize = 100;

/// Column headers of the sales export
pub mod columns {
    pub const INVOICE_NUMBER: &str = "Invoice Number";
    pub const TRANSACTION_TYPE: &str = "Transaction Type";
    pub const DATE: &str = "Date";
    pub const ACCOUNT_NUMBER: &str = "Account Number";
    pub const CUSTOMER: &str = "Customer";
    pub const PRODUCT: &str = "Product";
    pub const MASS: &str = "Mass";
    pub const SALES_VALUE: &str = "Sales Value";
    pub const SALES_QTY: &str = "Sales Qty";
    pub const PRICE_PER_KG: &str = "R/KG";
    /// Header used by the richer Excel export for the same column
    pub const PRICE_PER_KG_ALT: &str = "Price per Kg";

    pub const EXPECTED: [&str; 10] = [
        INVOICE_NUMBER,
        TRANSACTION_TYPE,
        DATE,
        ACCOUNT_NUMBER,
        CUSTOMER,
        PRODUCT,
        MASS,
        SALES_VALUE,
        SALES_QTY,
        PRICE_PER_KG,
    ];
}

/// One ingested sales row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalesTransaction {
    pub invoice_number: i64,
    pub transaction_type: String,
    /// `None` when the source date could not be read
    pub date: Option<NaiveDate>,
    pub account_number: String,
    pub customer: String,
    pub product: String,
    /// Whole kilograms
    pub mass: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub sales_value: Decimal,
    pub sales_qty: i64,
    #[serde(rename = "r_kg", with = "rust_decimal::serde::float")]
    pub price_per_kg: Decimal,
}

impl Default for SalesTransaction {
    fn default() -> Self {
        Self {
            invoice_number: 0,
            transaction_type: String::new(),
            date: None,
            account_number: String::new(),
            customer: String::new(),
            product: String::new(),
            mass: 0,
            sales_value: Decimal::ZERO,
            sales_qty: 0,
            price_per_kg: Decimal::ZERO,
        }
    }
}

/// Which fields of a row fell back to defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowIssues {
    /// Numeric columns that held something other than blank, `-` or a number
    pub invalid_numbers: Vec<&'static str>,
    /// The date cell was present but unreadable
    pub invalid_date: bool,
}

impl RowIssues {
    pub fn is_clean(&self) -> bool {
        self.invalid_numbers.is_empty() && !self.invalid_date
    }
}

/// A parsed row together with the coercions applied to it
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub transaction: SalesTransaction,
    pub issues: RowIssues,
}

/// Amounts the store cannot hold default to zero like any unreadable number
fn storable_currency(value: Decimal, header: &'static str, issues: &mut RowIssues) -> Decimal {
    if rounding::currency_fits(value) {
        return value;
    }
    tracing::warn!(column = header, %value, "Amount out of range, using 0");
    issues.invalid_numbers.push(header);
    Decimal::ZERO
}

impl SalesTransaction {
    /// Build a transaction from a raw row. Never fails; see [`SalesTransaction::parse_row`].
    pub fn from_raw(row: &RawRow) -> Self {
        Self::parse_row(row).transaction
    }

    /// Build a transaction from a raw row, reporting which fields were defaulted.
    pub fn parse_row(row: &RawRow) -> ParsedRow {
        let mut issues = RowIssues::default();

        let mut number = |header: &'static str, cell: &RawCell| -> Decimal {
            match parse_number(cell) {
                Some(value) => value,
                None => {
                    if !is_blank_or_dash(cell) {
                        issues.invalid_numbers.push(header);
                    }
                    Decimal::ZERO
                }
            }
        };

        let invoice_number = rounding::count(number(
            columns::INVOICE_NUMBER,
            row.get(columns::INVOICE_NUMBER),
        ))
        .max(0);
        let mass = rounding::mass_kg(number(columns::MASS, row.get(columns::MASS)));
        let sales_value =
            rounding::currency(number(columns::SALES_VALUE, row.get(columns::SALES_VALUE)));
        let sales_qty = rounding::count(number(columns::SALES_QTY, row.get(columns::SALES_QTY)));
        let price_per_kg = rounding::currency(number(
            columns::PRICE_PER_KG,
            row.get_any(&[columns::PRICE_PER_KG, columns::PRICE_PER_KG_ALT]),
        ));

        let sales_value = storable_currency(sales_value, columns::SALES_VALUE, &mut issues);
        let price_per_kg = storable_currency(price_per_kg, columns::PRICE_PER_KG, &mut issues);

        let date_cell = row.get(columns::DATE);
        let date = parse_date(date_cell);
        if date.is_none() && !date_cell.is_blank() {
            tracing::warn!(value = %date_cell.as_text(), "Invalid date, leaving it unset");
            issues.invalid_date = true;
        }

        let text = |header: &str, max: usize| truncate_chars(&row.get(header).as_text(), max);

        ParsedRow {
            transaction: SalesTransaction {
                invoice_number,
                transaction_type: text(columns::TRANSACTION_TYPE, SHORT_TEXT_MAX),
                date,
                account_number: text(columns::ACCOUNT_NUMBER, SHORT_TEXT_MAX),
                customer: text(columns::CUSTOMER, LONG_TEXT_MAX),
                product: text(columns::PRODUCT, LONG_TEXT_MAX),
                mass,
                sales_value,
                sales_qty,
                price_per_kg,
            },
            issues,
        }
    }

    /// Mass as a decimal, for arithmetic with currency fields
    pub fn mass_decimal(&self) -> Decimal {
        Decimal::from(self.mass)
    }
}

fn is_blank_or_dash(cell: &RawCell) -> bool {
    cell.is_blank() || cell.as_text() == "-"
}
