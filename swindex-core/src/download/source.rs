//! Payload source trait and structured error types.
//!
//! The PayloadSource trait abstracts over where raw product files come from
//! (the remote servers, a local mirror directory) so the batch driver can be
//! pointed at either, and tests never touch the network.

use super::catalog::{FilePeriod, Product};
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Structured error types for download operations.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("mirror directory {path} is not usable: {reason}")]
    MirrorUnavailable { path: PathBuf, reason: String },

    #[error("network unreachable for {url}: {message}")]
    NetworkUnreachable { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("gateway timeout for {url}")]
    GatewayTimeout { url: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("cache I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache metadata for {path}: {source}")]
    Meta {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DownloadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DownloadError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A raw payload and where it came from.
#[derive(Debug, Clone)]
pub struct Payload {
    pub text: String,
    /// URL or mirror path.
    pub origin: String,
}

/// Trait for payload sources (remote HTTP, mirror directory).
///
/// Sources hand back the payload unchanged. The cache layer sits above this
/// trait; sources don't know about it.
pub trait PayloadSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the file of `product` covering `period`.
    ///
    /// `Ok(None)` means the source does not have that file.
    fn fetch(&self, product: &Product, period: &FilePeriod) -> Result<Option<Payload>, DownloadError>;
}

/// Outcome of one file in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Stored(PathBuf),
    Missing,
}

/// Progress callback for multi-file operations.
pub trait DownloadProgress: Send {
    /// Called when starting to fetch a file.
    fn on_start(&self, product: &Product, date: NaiveDate, index: usize, total: usize);

    /// Called when a file fetch completes.
    fn on_complete(
        &self,
        product: &Product,
        date: NaiveDate,
        index: usize,
        total: usize,
        result: &Result<FileOutcome, DownloadError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, missing: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl DownloadProgress for StdoutProgress {
    fn on_start(&self, product: &Product, date: NaiveDate, index: usize, total: usize) {
        println!("[{}/{}] Fetching {product} for {date}...", index + 1, total);
    }

    fn on_complete(
        &self,
        _product: &Product,
        date: NaiveDate,
        _index: usize,
        _total: usize,
        result: &Result<FileOutcome, DownloadError>,
    ) {
        match result {
            Ok(FileOutcome::Stored(path)) => println!("  OK: {date} -> {}", path.display()),
            Ok(FileOutcome::Missing) => println!("  MISSING: {date}"),
            Err(e) => println!("  FAIL: {date}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, missing: usize, failed: usize, total: usize) {
        println!("\nDownload complete: {succeeded}/{total} stored, {missing} missing, {failed} failed");
    }
}

/// Progress reporter that only emits tracing events.
pub struct LogProgress;

impl DownloadProgress for LogProgress {
    fn on_start(&self, _product: &Product, _date: NaiveDate, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        product: &Product,
        date: NaiveDate,
        _index: usize,
        _total: usize,
        result: &Result<FileOutcome, DownloadError>,
    ) {
        if let Ok(FileOutcome::Stored(path)) = result {
            info!(%product, %date, path = %path.display(), "stored");
        }
    }

    fn on_batch_complete(&self, succeeded: usize, missing: usize, failed: usize, total: usize) {
        info!(succeeded, missing, failed, total, "download batch complete");
    }
}
