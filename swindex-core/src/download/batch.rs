//! Batch driver: expands a date range into product files and fetches them one
//! at a time into the cache.

use super::cache::PayloadCache;
use super::catalog::Product;
use super::source::{DownloadError, DownloadProgress, FileOutcome, PayloadSource};
use chrono::NaiveDate;
use tracing::warn;

/// Fetch every file of `product` overlapping `[first, last]`.
///
/// Files the source lacks are counted as missing. Failures are logged with the
/// product and date and the batch moves on; files already stored stay stored.
pub fn download_range(
    product: &Product,
    first: NaiveDate,
    last: NaiveDate,
    source: &dyn PayloadSource,
    cache: &PayloadCache,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let dates = product.cadence().file_dates(first, last);
    let total = dates.len();
    let mut succeeded = 0;
    let mut missing = Vec::new();
    let mut failed = 0;
    let mut errors = Vec::new();

    for (i, date) in dates.into_iter().enumerate() {
        progress.on_start(product, date, i, total);

        let result = download_single(product, date, source, cache);
        progress.on_complete(product, date, i, total, &result);

        match result {
            Ok(FileOutcome::Stored(_)) => succeeded += 1,
            Ok(FileOutcome::Missing) => missing.push(date),
            Err(e) => {
                warn!(%product, %date, source = source.name(), error = %e, "download failed");
                errors.push((date, e));
                failed += 1;
            }
        }
    }

    progress.on_batch_complete(succeeded, missing.len(), failed, total);

    DownloadSummary {
        total,
        succeeded,
        missing: missing.len(),
        failed,
        missing_dates: missing,
        errors,
    }
}

/// Fetch one file → cache.
fn download_single(
    product: &Product,
    date: NaiveDate,
    source: &dyn PayloadSource,
    cache: &PayloadCache,
) -> Result<FileOutcome, DownloadError> {
    let period = product.cadence().period(date);
    match source.fetch(product, &period)? {
        Some(payload) => Ok(FileOutcome::Stored(cache.write(product, date, &payload)?)),
        None => Ok(FileOutcome::Missing),
    }
}

/// Summary of a batch download operation.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub missing: usize,
    pub failed: usize,
    /// File dates the source did not have.
    pub missing_dates: Vec<NaiveDate>,
    pub errors: Vec<(NaiveDate, DownloadError)>,
}

impl DownloadSummary {
    /// Fold a follow-up batch into this one.
    pub fn absorb(&mut self, other: DownloadSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.missing += other.missing;
        self.failed += other.failed;
        self.missing_dates.extend(other.missing_dates);
        self.errors.extend(other.errors);
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
