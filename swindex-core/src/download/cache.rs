//! Raw payload cache.
//!
//! Layout: `{cache_dir}/{product}/{key}_{YYYY-MM-DD}.{ext}`
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Payloads stored byte-for-byte as received
//! - Metadata sidecar per file (`{file}.meta.json`: hash, origin, fetch time)

use super::catalog::Product;
use super::source::{DownloadError, Payload};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Metadata sidecar for one cached file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub product: String,
    pub key: String,
    pub date: NaiveDate,
    pub bytes: usize,
    pub blake3: String,
    /// URL or mirror path the payload came from.
    pub origin: String,
    pub fetched_at: NaiveDateTime,
}

/// Per-directory summary returned by [`PayloadCache::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub product: String,
    pub files: usize,
    pub bytes: u64,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

pub struct PayloadCache {
    cache_dir: PathBuf,
}

impl PayloadCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn product_dir(&self, product: &Product) -> PathBuf {
        self.cache_dir.join(product.name())
    }

    /// Path a product file for `date` is (or would be) cached at.
    pub fn path(&self, product: &Product, date: NaiveDate) -> PathBuf {
        self.product_dir(product).join(product.cache_file_name(date))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".meta.json");
        PathBuf::from(name)
    }

    /// Store a payload unchanged and write its sidecar.
    pub fn write(&self, product: &Product, date: NaiveDate, payload: &Payload) -> Result<PathBuf, DownloadError> {
        let dir = self.product_dir(product);
        fs::create_dir_all(&dir).map_err(|e| DownloadError::io(&dir, e))?;

        let path = self.path(product, date);
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, payload.text.as_bytes()).map_err(|e| DownloadError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            DownloadError::io(&path, e)
        })?;

        let meta = CacheMeta {
            product: product.name().to_string(),
            key: product.key(),
            date,
            bytes: payload.text.len(),
            blake3: blake3::hash(payload.text.as_bytes()).to_hex().to_string(),
            origin: payload.origin.clone(),
            fetched_at: Utc::now().naive_utc(),
        };
        let meta_path = Self::meta_path(&path);
        let json = serde_json::to_string_pretty(&meta).map_err(|e| DownloadError::Meta {
            path: meta_path.clone(),
            source: e,
        })?;
        fs::write(&meta_path, json).map_err(|e| DownloadError::io(&meta_path, e))?;

        debug!(path = %path.display(), bytes = meta.bytes, "cached payload");
        Ok(path)
    }

    pub fn read(&self, path: &Path) -> Result<String, DownloadError> {
        fs::read_to_string(path).map_err(|e| DownloadError::io(path, e))
    }

    /// Cached files of one product, keyed by file date.
    pub fn list(&self, product: &Product) -> Result<BTreeMap<NaiveDate, PathBuf>, DownloadError> {
        let dir = self.product_dir(product);
        let mut files = BTreeMap::new();
        if !dir.is_dir() {
            return Ok(files);
        }
        let prefix = format!("{}_", product.key());
        let suffix = format!(".{}", product.extension());
        let entries = fs::read_dir(&dir).map_err(|e| DownloadError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DownloadError::io(&dir, e))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(date) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&suffix))
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            else {
                continue;
            };
            files.insert(date, path);
        }
        Ok(files)
    }

    /// Sidecar of a cached file, if present and readable.
    pub fn get_meta(&self, path: &Path) -> Option<CacheMeta> {
        let content = fs::read_to_string(Self::meta_path(path)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Whether the cached file still matches the hash in its sidecar.
    pub fn verify(&self, path: &Path) -> Result<bool, DownloadError> {
        let Some(meta) = self.get_meta(path) else {
            return Ok(false);
        };
        let bytes = fs::read(path).map_err(|e| DownloadError::io(path, e))?;
        Ok(blake3::hash(&bytes).to_hex().as_str() == meta.blake3)
    }

    /// One entry per product directory, sorted by name.
    pub fn status(&self) -> Result<Vec<CacheStatus>, DownloadError> {
        let mut out = Vec::new();
        if !self.cache_dir.is_dir() {
            return Ok(out);
        }
        let entries = fs::read_dir(&self.cache_dir).map_err(|e| DownloadError::io(&self.cache_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DownloadError::io(&self.cache_dir, e))?;
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let mut status = CacheStatus {
                product: entry.file_name().to_string_lossy().into_owned(),
                files: 0,
                bytes: 0,
                first: None,
                last: None,
            };
            for file in fs::read_dir(&dir).map_err(|e| DownloadError::io(&dir, e))? {
                let path = file.map_err(|e| DownloadError::io(&dir, e))?.path();
                let Some(meta) = self.get_meta(&path) else {
                    continue;
                };
                status.files += 1;
                status.bytes += meta.bytes as u64;
                status.first = Some(status.first.map_or(meta.date, |d| d.min(meta.date)));
                status.last = Some(status.last.map_or(meta.date, |d| d.max(meta.date)));
            }
            out.push(status);
        }
        out.sort_by(|a, b| a.product.cmp(&b.product));
        Ok(out)
    }

    /// Delete every cached file of a product. Returns the number of payloads removed.
    pub fn clean(&self, product: &Product) -> Result<usize, DownloadError> {
        let files = self.list(product)?;
        for path in files.values() {
            fs::remove_file(path).map_err(|e| DownloadError::io(path, e))?;
            let meta = Self::meta_path(path);
            if meta.exists() {
                fs::remove_file(&meta).map_err(|e| DownloadError::io(&meta, e))?;
            }
        }
        Ok(files.len())
    }
}
