//! Download adapters: product catalog, payload sources, cache and batch driver.

pub mod batch;
pub mod cache;
pub mod catalog;
pub mod http;
pub mod mirror;
pub mod source;

pub use batch::{download_range, DownloadSummary};
pub use cache::{CacheMeta, CacheStatus, PayloadCache};
pub use catalog::{FileCadence, FilePeriod, Product};
pub use http::HttpSource;
pub use mirror::MirrorSource;
pub use source::{DownloadError, DownloadProgress, FileOutcome, LogProgress, Payload, PayloadSource, StdoutProgress};
