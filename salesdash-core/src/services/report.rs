//! Report service - anchored daily reports and period comparisons

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::filter::DateRange;
use crate::domain::result::Error;
use crate::domain::{assemble, AggregateOutput, Report, ReportMode, ReportOptions, SalesFilter};
use crate::ports::SalesStore;

/// What to report on
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportRequest {
    pub mode: ReportMode,
    /// Day to report; the latest day with data when absent
    pub report_date: Option<NaiveDate>,
}

/// A report together with the rows behind it
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    pub report: Report,
    pub anchor: NaiveDate,
    pub current_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_rows: Option<usize>,
}

/// Report service
pub struct ReportService {
    store: Arc<dyn SalesStore>,
    transaction_type: Option<String>,
    options: ReportOptions,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn SalesStore>,
        transaction_type: Option<String>,
        options: ReportOptions,
    ) -> Self {
        Self {
            store,
            transaction_type,
            options,
        }
    }

    /// Rows eligible for reporting
    fn base_filter(&self) -> SalesFilter {
        match &self.transaction_type {
            Some(t) => SalesFilter::new().with_transaction_type(t.clone()),
            None => SalesFilter::new(),
        }
    }

    /// Pick the day to report on
    ///
    /// A requested day without any rows falls back to the latest day that
    /// has some.
    pub fn resolve_anchor(&self, requested: Option<NaiveDate>) -> Result<NaiveDate> {
        let base = self.base_filter();

        if let Some(date) = requested {
            let day = DateRange::day(date)
                .ok_or_else(|| Error::validation(format!("Report date out of range: {}", date)))?;
            if !self.store.query(&base.clone().with_date_range(day))?.is_empty() {
                return Ok(date);
            }
            tracing::warn!(requested = %date, "No sales on requested date, using latest date");
        }

        self.store
            .latest_date(&base)?
            .ok_or_else(|| Error::validation("No dated sales data to report on").into())
    }

    pub fn generate(&self, request: &ReportRequest) -> Result<GeneratedReport> {
        let anchor = self.resolve_anchor(request.report_date)?;
        let base = self.base_filter();

        let (current_range, prior_range) = match request.mode.period() {
            None => (
                DateRange::day(anchor)
                    .ok_or_else(|| Error::validation("Report date out of range"))?,
                None,
            ),
            Some(period) => {
                let windows = period.resolve(anchor)?;
                (windows.current, Some(windows.prior))
            }
        };

        let current = self
            .store
            .query(&base.clone().with_date_range(current_range))
            .context("Failed to load current period")?;
        let prior = match prior_range {
            Some(range) => Some(
                self.store
                    .query(&base.with_date_range(range))
                    .context("Failed to load prior period")?,
            ),
            None => None,
        };

        let output = AggregateOutput::new(anchor, &current, prior.as_deref());
        let report = assemble(&output, &request.mode, &self.options);

        tracing::info!(
            mode = %request.mode,
            anchor = %anchor,
            current_rows = current.len(),
            prior_rows = prior.as_ref().map(|p| p.len()),
            "Report generated"
        );

        Ok(GeneratedReport {
            report,
            anchor,
            current_rows: current.len(),
            prior_rows: prior.map(|p| p.len()),
        })
    }
}
