//! Sales store port - persistence of the latest uploaded snapshot

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{SalesFilter, SalesTransaction};

/// Rows per insert statement during a replace
pub const INSERT_CHUNK_SIZE: usize = 1000;

/// Outcome of a full replace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaceResult {
    /// Identifier stamped on every row of the new snapshot
    pub batch_id: String,
    pub deleted: usize,
    pub inserted: usize,
}

/// Storage for the single current snapshot of sales rows
///
/// Implementations must make [`SalesStore::replace_all`] all-or-nothing: a
/// failure at any point leaves the previous snapshot in place.
pub trait SalesStore: Send + Sync {
    /// Replace every stored row with `records`, calling `progress` with
    /// `(inserted, total)` after each chunk
    fn replace_all_with_progress(
        &self,
        records: &[SalesTransaction],
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<ReplaceResult>;

    /// Replace every stored row with `records`
    fn replace_all(&self, records: &[SalesTransaction]) -> Result<ReplaceResult> {
        self.replace_all_with_progress(records, &mut |_: usize, _: usize| {})
    }

    /// Rows matching `filter`, in insertion order
    fn query(&self, filter: &SalesFilter) -> Result<Vec<SalesTransaction>>;

    /// Most recent transaction date among rows matching `filter`
    fn latest_date(&self, filter: &SalesFilter) -> Result<Option<NaiveDate>>;
}
