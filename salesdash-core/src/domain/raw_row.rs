//! Raw tabular rows as read from CSV or Excel, and the coercion rules that
//! turn individual cells into typed values.
//!
//! Coercion never fails: a cell that cannot be interpreted yields `None` and
//! the caller substitutes the field default.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// One spreadsheet cell before interpretation
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl RawCell {
    /// String form of the cell, trimmed
    ///
    /// Whole numbers render without a fractional part so that numeric Excel
    /// cells in text columns (account numbers, invoice numbers) read naturally.
    pub fn as_text(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            RawCell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(s.to_string())
        }
    }
}

static EMPTY: RawCell = RawCell::Empty;

/// A header-keyed row. Header lookups ignore case and surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: HashMap<String, RawCell>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from (header, text) pairs, as a CSV reader produces them
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut row = Self::new();
        for (header, value) in pairs {
            row.insert(header, RawCell::from(value));
        }
        row
    }

    pub fn insert(&mut self, header: &str, cell: RawCell) {
        self.cells.insert(normalize_header(header), cell);
    }

    /// Cell under `header`, or `RawCell::Empty` when the column is absent
    pub fn get(&self, header: &str) -> &RawCell {
        self.cells.get(&normalize_header(header)).unwrap_or(&EMPTY)
    }

    /// First present, non-blank column among `headers`
    pub fn get_any(&self, headers: &[&str]) -> &RawCell {
        headers
            .iter()
            .map(|h| self.get(h))
            .find(|c| !c.is_blank())
            .unwrap_or(&EMPTY)
    }

    pub fn contains(&self, header: &str) -> bool {
        self.cells.contains_key(&normalize_header(header))
    }
}

/// A header row plus its data rows, as read from one file
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Entries of `expected` with no matching header (case-insensitive)
    pub fn missing_headers<'a>(&self, expected: &[&'a str]) -> Vec<&'a str> {
        let present: Vec<String> = self.headers.iter().map(|h| normalize_header(h)).collect();
        expected
            .iter()
            .filter(|e| !present.contains(&normalize_header(e)))
            .copied()
            .collect()
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Interpret a cell as a number.
///
/// Blank and `"-"` are "no value". Thousands separators are stripped before
/// parsing. Anything else that does not parse as a finite number is `None`.
pub fn parse_number(cell: &RawCell) -> Option<Decimal> {
    match cell {
        RawCell::Number(n) if n.is_finite() => Decimal::try_from(*n).ok(),
        RawCell::Number(_) | RawCell::Empty | RawCell::Date(_) => None,
        RawCell::Text(s) => parse_number_text(s),
    }
}

fn parse_number_text(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();

    if let Ok(d) = Decimal::from_str(&cleaned) {
        return Some(d);
    }
    if let Ok(d) = Decimal::from_scientific(&cleaned) {
        return Some(d);
    }
    // Last resort for forms Decimal rejects but are still plain floats ("1.", ".5e1")
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(|f| Decimal::try_from(f).ok())
}

/// Text formats tried in order. Day-first precedes month-first, so `03/04/2025`
/// reads as 3 April; an impossible day-first value falls through to month-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Largest serial Excel can represent (9999-12-31)
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Interpret a cell as a calendar date
pub fn parse_date(cell: &RawCell) -> Option<NaiveDate> {
    match cell {
        RawCell::Date(d) => Some(*d),
        RawCell::Number(n) => excel_serial_to_date(*n),
        RawCell::Text(s) => parse_date_text(s),
        RawCell::Empty => None,
    }
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    // Offsets are normalized to UTC before taking the calendar day
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc().date());
    }
    None
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_MAX_SERIAL {
        return None;
    }
    // Day zero is 1899-12-30 once the 1900 leap-year bug is accounted for
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    #[test]
    fn test_blank_dash_and_garbage_are_not_numbers() {
        assert_eq!(parse_number(&text("")), None);
        assert_eq!(parse_number(&text("   ")), None);
        assert_eq!(parse_number(&text("-")), None);
        assert_eq!(parse_number(&text(" - ")), None);
        assert_eq!(parse_number(&text("abc")), None);
        assert_eq!(parse_number(&text("NaN")), None);
        assert_eq!(parse_number(&text("inf")), None);
        assert_eq!(parse_number(&RawCell::Empty), None);
    }

    #[test]
    fn test_thousands_separators_are_stripped() {
        assert_eq!(
            parse_number(&text("1,234.50")),
            Some(Decimal::from_str("1234.50").unwrap())
        );
        assert_eq!(
            parse_number(&text("1,000,000")),
            Some(Decimal::from(1_000_000))
        );
    }

    #[test]
    fn test_negative_and_scientific() {
        assert_eq!(parse_number(&text("-12.5")), Some(Decimal::from_str("-12.5").unwrap()));
        assert_eq!(parse_number(&text("1e3")), Some(Decimal::from(1000)));
    }

    #[test]
    fn test_native_number_cell() {
        assert_eq!(parse_number(&RawCell::Number(42.0)), Some(Decimal::from(42)));
        assert_eq!(parse_number(&RawCell::Number(f64::NAN)), None);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();
        assert_eq!(parse_date(&text("2025-05-17")), Some(expected));
        assert_eq!(parse_date(&text("2025/05/17")), Some(expected));
        assert_eq!(parse_date(&text("17/05/2025")), Some(expected));
        assert_eq!(parse_date(&text("05/17/2025")), Some(expected));
        assert_eq!(parse_date(&text("17 May 2025")), Some(expected));
        assert_eq!(parse_date(&text("May 17, 2025")), Some(expected));
        assert_eq!(parse_date(&text("2025-05-17 08:30:00")), Some(expected));
        assert_eq!(parse_date(&text("2025-05-17T08:30:00Z")), Some(expected));
    }

    #[test]
    fn test_day_first_wins_when_ambiguous() {
        assert_eq!(
            parse_date(&text("03/04/2025")),
            NaiveDate::from_ymd_opt(2025, 4, 3)
        );
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_date(&text("not a date")), None);
        assert_eq!(parse_date(&text("2025-13-45")), None);
        assert_eq!(parse_date(&RawCell::Empty), None);
    }

    #[test]
    fn test_excel_serial_dates() {
        assert_eq!(
            parse_date(&RawCell::Number(45794.0)),
            NaiveDate::from_ymd_opt(2025, 5, 17)
        );
        assert_eq!(parse_date(&RawCell::Number(0.0)), None);
    }

    #[test]
    fn test_header_lookup_ignores_case_and_padding() {
        let row = RawRow::from_pairs([(" Sales Value ", "10"), ("R/KG", "")]);
        assert_eq!(row.get("sales value"), &text("10"));
        assert!(row.get("R/KG").is_blank());
        assert_eq!(row.get("Missing"), &RawCell::Empty);
        assert!(row.contains("r/kg"));
    }

    #[test]
    fn test_missing_headers() {
        let table = RawTable {
            headers: vec!["Date".to_string(), " customer ".to_string()],
            rows: Vec::new(),
        };
        assert_eq!(
            table.missing_headers(&["Date", "Customer", "Mass"]),
            vec!["Mass"]
        );
    }

    #[test]
    fn test_number_cell_as_text() {
        assert_eq!(RawCell::Number(100234.0).as_text(), "100234");
        assert_eq!(RawCell::Number(1.5).as_text(), "1.5");
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
