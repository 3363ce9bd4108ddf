//! Runtime configuration, loaded once from TOML and passed down explicitly.
//!
//! ```toml
//! cache_dir = "data"
//! mirror_dir = "/srv/mirror/swpc"
//!
//! [http]
//! timeout_secs = 30
//!
//! [fill]
//! default = nan
//! [fill.products]
//! gfz_json = -1.0
//! [fill.fields]
//! "swpc_dsd/c_flare" = -1.0
//!
//! [start_dates]
//! "kp:def" = "1932-01-01"
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where downloaded payloads are kept.
    pub cache_dir: PathBuf,
    /// Local mirror to read instead of the network.
    pub mirror_dir: Option<PathBuf>,
    pub http: HttpConfig,
    pub fill: FillDefaults,
    /// First available date per instrument, keyed `name:tag` or `name`.
    pub start_dates: BTreeMap<String, NaiveDate>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Start date for `name:tag`, falling back to the instrument-wide entry.
    pub fn start_date(&self, name: &str, tag: &str) -> Option<NaiveDate> {
        self.start_dates
            .get(&format!("{name}:{tag}"))
            .or_else(|| self.start_dates.get(name))
            .copied()
    }
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .map(|d| d.join("swindex"))
            .unwrap_or_else(|| PathBuf::from("data"));

        let start_dates = [
            ("kp:def", (1932, 1, 1)),
            ("kp:now", (1932, 1, 1)),
            ("ap:def", (1932, 1, 1)),
            ("ap:now", (1932, 1, 1)),
            ("cp", (1932, 1, 1)),
            ("hpo", (1995, 1, 1)),
            ("apo", (1995, 1, 1)),
            ("ssn:now", (1932, 1, 1)),
            ("f107:historic", (1947, 2, 14)),
            ("f107:prelim", (1994, 1, 1)),
            ("ssn:prelim", (1994, 1, 1)),
            ("flare:prelim", (1994, 1, 1)),
            ("sbfield:prelim", (1994, 1, 1)),
            ("dst:noaa", (1957, 1, 1)),
            ("norp:daily", (1951, 11, 1)),
            ("mgii:composite", (1978, 11, 7)),
            ("mgii:sorce", (2003, 3, 4)),
            ("ace_mag:historic", (2001, 8, 1)),
            ("ace_swepam:historic", (2001, 8, 1)),
            ("ace_epam:historic", (2001, 8, 1)),
            ("ace_sis:historic", (2001, 8, 1)),
        ]
        .into_iter()
        .filter_map(|(key, (y, m, d))| {
            NaiveDate::from_ymd_opt(y, m, d).map(|date| (key.to_string(), date))
        })
        .collect();

        Self {
            cache_dir,
            mirror_dir: None,
            http: HttpConfig::default(),
            fill: FillDefaults::default(),
            start_dates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("swindex/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fill values used when a payload does not declare its own.
///
/// Lookup order: `fields["product/field"]`, `fields["field"]`,
/// `products["product"]`, then `default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillDefaults {
    pub default: f64,
    pub products: BTreeMap<String, f64>,
    pub fields: BTreeMap<String, f64>,
}

impl FillDefaults {
    pub fn get(&self, product: &str, field: &str) -> f64 {
        self.fields
            .get(&format!("{product}/{field}"))
            .or_else(|| self.fields.get(field))
            .or_else(|| self.products.get(product))
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for FillDefaults {
    fn default() -> Self {
        let products = [
            ("gfz_json", -1.0),
            ("gfz_kp_wdc", -1.0),
            ("noaa_dst", 9999.0),
            ("swpc_dgd", -1.0),
            ("lisird_json", -99999.0),
            ("swpc_dsd", -999.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        // flare counts mark missing entries with -1, the rest of the DSD with -999
        let fields = [
            "c_flare", "m_flare", "x_flare", "os_flare", "o1_flare", "o2_flare", "o3_flare",
        ]
        .into_iter()
        .map(|f| (format!("swpc_dsd/{f}"), -1.0))
        .collect();

        Self {
            default: f64::NAN,
            products,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_documented_fills() {
        let fill = FillDefaults::default();
        assert_eq!(fill.get("gfz_json", "Kp"), -1.0);
        assert_eq!(fill.get("swpc_dsd", "f107"), -999.0);
        assert_eq!(fill.get("swpc_dsd", "m_flare"), -1.0);
        assert!(fill.get("swpc_3day_predictions", "Kp").is_nan());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
cache_dir = "/tmp/sw"

[http]
timeout_secs = 5

[start_dates]
"kp:def" = "2000-01-01"
"#,
        )
        .unwrap();
        assert_eq!(cfg.cache_dir, PathBuf::from("/tmp/sw"));
        assert_eq!(cfg.http.timeout_secs, 5);
        assert!(cfg.http.user_agent.starts_with("swindex/"));
        assert_eq!(cfg.start_date("kp", "def"), NaiveDate::from_ymd_opt(2000, 1, 1));
        // explicit table replaces the default table
        assert_eq!(cfg.start_date("dst", "noaa"), None);
    }

    #[test]
    fn start_date_falls_back_to_instrument() {
        let cfg = Config::default();
        assert_eq!(cfg.start_date("hpo", "30min"), NaiveDate::from_ymd_opt(1995, 1, 1));
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = Config {
            cache_dir: PathBuf::from("data"),
            ..Config::default()
        };
        let text = cfg.to_toml().unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.cache_dir, cfg.cache_dir);
        assert_eq!(back.start_dates, cfg.start_dates);
        assert!(back.fill.default.is_nan());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::from_file(Path::new("/nonexistent/swindex.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/swindex.toml"));
    }
}
