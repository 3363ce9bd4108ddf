//! Local mirror directory source.
//!
//! Mirrors hold product files under their remote names (query products under
//! their cache names), all in one flat directory.

use super::catalog::{FilePeriod, Product};
use super::source::{DownloadError, Payload, PayloadSource};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug)]
pub struct MirrorSource {
    dir: PathBuf,
}

impl MirrorSource {
    /// Fails unless `dir` is an existing, readable directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DownloadError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(DownloadError::MirrorUnavailable {
                path: dir,
                reason: "not a directory".into(),
            });
        }
        if let Err(e) = fs::read_dir(&dir) {
            return Err(DownloadError::MirrorUnavailable {
                path: dir,
                reason: e.to_string(),
            });
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PayloadSource for MirrorSource {
    fn name(&self) -> &str {
        "mirror"
    }

    fn fetch(&self, product: &Product, period: &FilePeriod) -> Result<Option<Payload>, DownloadError> {
        let names = product.mirror_names(period);
        for name in &names {
            let path = self.dir.join(name);
            if path.is_file() {
                let text = fs::read_to_string(&path).map_err(|e| DownloadError::io(&path, e))?;
                return Ok(Some(Payload {
                    text,
                    origin: path.display().to_string(),
                }));
            }
        }
        info!(
            %product,
            start = %period.start,
            dir = %self.dir.display(),
            candidates = ?names,
            "file not present in mirror, skipping"
        );
        Ok(None)
    }
}
