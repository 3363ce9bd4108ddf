//! Remote products: where each file lives, how often a new one appears, and
//! where it lands in the cache.

use crate::parse::{ace, dsd, dst, gfz, lasp, lisird, norp, swpc, AceKind};
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

const SWPC_TEXT: &str = "https://services.swpc.noaa.gov/text/";
const SWPC_OLD_INDICES: &str = "https://ftp.swpc.noaa.gov/pub/indices/old_indices/";
const GFZ_JSON: &str = "https://kp.gfz-potsdam.de/app/json/";
const GFZ_WDC: &str = "https://datapub.gfz-potsdam.de/download/10.5880.Kp.0001/";
const NGDC_DST: &str = "https://ftp.ngdc.noaa.gov/STP/GEOMAGNETIC_DATA/INDICES/DST/";
const LASP_96HR: &str = "https://lasp.colorado.edu/space_weather/dsttemerin/";
const LISIRD_LATIS: &str = "https://lasp.colorado.edu/lisird/latis/dap/";
const ACE_DAILY: &str = "https://sohoftp.nascom.nasa.gov/sdb/ace/daily/";
const NORP_DAILY: &str = "https://solar.nro.nao.ac.jp/norp/data/daily/";

/// How often the remote side publishes a new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCadence {
    /// One current file, overwritten in place. Only the latest date is fetched.
    Snapshot,
    /// One current file holding the whole record; the newest copy supersedes
    /// every older one. Only the latest date is fetched.
    Archive,
    Daily,
    Monthly,
    Quarterly,
    Yearly,
}

/// The span of data one remote file covers: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FilePeriod {
    /// Last day inside the period.
    pub fn last(&self) -> NaiveDate {
        self.end - Duration::days(1)
    }

    pub fn quarter(&self) -> u32 {
        (self.start.month() - 1) / 3 + 1
    }
}

impl FileCadence {
    /// The file period that contains `date`.
    pub fn period(self, date: NaiveDate) -> FilePeriod {
        let first_of = |y: i32, m: u32| NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(date);
        let (start, months) = match self {
            FileCadence::Snapshot | FileCadence::Archive | FileCadence::Daily => {
                return FilePeriod {
                    start: date,
                    end: date + Duration::days(1),
                }
            }
            FileCadence::Monthly => (first_of(date.year(), date.month()), 1),
            FileCadence::Quarterly => (first_of(date.year(), (date.month() - 1) / 3 * 3 + 1), 3),
            FileCadence::Yearly => (first_of(date.year(), 1), 12),
        };
        FilePeriod {
            start,
            end: start + Months::new(months),
        }
    }

    /// Start dates of every file overlapping `[first, last]`.
    ///
    /// Snapshot and archive products only have their current file, dated `last`.
    pub fn file_dates(self, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
        if last < first {
            return Vec::new();
        }
        if matches!(self, FileCadence::Snapshot | FileCadence::Archive) {
            return vec![last];
        }
        let mut dates = Vec::new();
        let mut period = self.period(first);
        while period.start <= last {
            dates.push(period.start);
            period = self.period(period.end);
        }
        dates
    }
}

/// A remote product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    SwpcSolarGeomagPredictions,
    SwpcGeomagForecast,
    SwpcDailyGeomagIndices,
    Swpc45DayForecast,
    SwpcDailySolarData,
    /// Yearly archive; `quarterly` selects the files of the running year.
    SwpcOldDsd { quarterly: bool },
    GfzJson { index: &'static str, definitive: bool },
    GfzKpWdc { definitive: bool },
    NoaaDst,
    Lasp96Hour { index: &'static str },
    LisirdJson { dataset: &'static str },
    AceText { kind: AceKind, realtime: bool },
    NorpDaily,
}

impl Product {
    /// Cache directory name.
    pub fn name(&self) -> &'static str {
        match self {
            Product::SwpcSolarGeomagPredictions => "swpc_predictions",
            Product::SwpcGeomagForecast => "swpc_geomag_forecast",
            Product::SwpcDailyGeomagIndices => "swpc_dgd",
            Product::Swpc45DayForecast => "swpc_45day",
            Product::SwpcDailySolarData => "swpc_dsd",
            Product::SwpcOldDsd { .. } => "swpc_old_dsd",
            Product::GfzJson { .. } => "gfz_json",
            Product::GfzKpWdc { .. } => "gfz_kp_wdc",
            Product::NoaaDst => "noaa_dst",
            Product::Lasp96Hour { .. } => "lasp_96hr",
            Product::LisirdJson { .. } => "lisird",
            Product::AceText { .. } => "ace",
            Product::NorpDaily => "norp",
        }
    }

    /// File prefix inside the cache directory; distinguishes variants.
    pub fn key(&self) -> String {
        let status = |definitive: bool| if definitive { "def" } else { "now" };
        match self {
            Product::GfzJson { index, definitive } => format!("{index}_{}", status(*definitive)),
            Product::GfzKpWdc { definitive } => format!("kp_{}", status(*definitive)),
            Product::SwpcOldDsd { quarterly } => {
                format!("dsd_{}", if *quarterly { "quarterly" } else { "yearly" })
            }
            Product::NorpDaily => "norp_rf_daily".to_string(),
            Product::Lasp96Hour { index } => index.to_string(),
            Product::LisirdJson { dataset } => dataset.to_string(),
            Product::AceText { kind, realtime } => {
                format!("{}_{}", kind.name(), if *realtime { "realtime" } else { "historic" })
            }
            other => other.name().to_string(),
        }
    }

    /// Parser format tag.
    pub fn format(&self) -> &'static str {
        match self {
            Product::SwpcSolarGeomagPredictions => swpc::PREDICTIONS_FORMAT,
            Product::SwpcGeomagForecast => swpc::GEOMAG_FORECAST_FORMAT,
            Product::SwpcDailyGeomagIndices => swpc::DGD_FORMAT,
            Product::Swpc45DayForecast => swpc::FORTY_FIVE_DAY_FORMAT,
            Product::SwpcDailySolarData | Product::SwpcOldDsd { .. } => dsd::FORMAT,
            Product::GfzJson { .. } => gfz::JSON_FORMAT,
            Product::GfzKpWdc { .. } => gfz::WDC_FORMAT,
            Product::NoaaDst => dst::FORMAT,
            Product::Lasp96Hour { .. } => lasp::FORMAT,
            Product::LisirdJson { .. } => lisird::FORMAT,
            Product::AceText { .. } => ace::FORMAT,
            Product::NorpDaily => norp::FORMAT,
        }
    }

    /// Parser variant passed through `ParseContext::variant`.
    pub fn variant(&self) -> &'static str {
        match self {
            Product::GfzJson { index, .. } => *index,
            Product::Lasp96Hour { index } => *index,
            Product::LisirdJson { dataset } => *dataset,
            Product::AceText { kind, .. } => kind.name(),
            _ => "",
        }
    }

    pub fn cadence(&self) -> FileCadence {
        match self {
            Product::SwpcSolarGeomagPredictions
            | Product::SwpcGeomagForecast
            | Product::SwpcDailyGeomagIndices
            | Product::Swpc45DayForecast
            | Product::SwpcDailySolarData
            | Product::Lasp96Hour { .. }
            | Product::AceText { realtime: true, .. } => FileCadence::Snapshot,
            Product::AceText { realtime: false, .. } => FileCadence::Daily,
            Product::GfzJson { .. } | Product::LisirdJson { .. } => FileCadence::Monthly,
            Product::NorpDaily => FileCadence::Archive,
            Product::SwpcOldDsd { quarterly: true } => FileCadence::Quarterly,
            Product::SwpcOldDsd { quarterly: false } | Product::GfzKpWdc { .. } | Product::NoaaDst => {
                FileCadence::Yearly
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Product::GfzJson { .. } | Product::LisirdJson { .. } => "json",
            Product::GfzKpWdc { .. } => "wdc",
            _ => "txt",
        }
    }

    /// Remote file names for a period, in the order they should be tried.
    fn remote_names(&self, period: &FilePeriod) -> Vec<String> {
        let year = period.start.year();
        match self {
            Product::SwpcSolarGeomagPredictions => vec!["3-day-solar-geomag-predictions.txt".into()],
            Product::SwpcGeomagForecast => vec!["3-day-geomag-forecast.txt".into()],
            Product::SwpcDailyGeomagIndices => vec!["daily-geomagnetic-indices.txt".into()],
            Product::Swpc45DayForecast => vec!["45-day-ap-forecast.txt".into()],
            Product::SwpcDailySolarData => vec!["daily-solar-indices.txt".into()],
            Product::SwpcOldDsd { quarterly: false } => vec![format!("{year}_DSD.txt")],
            Product::SwpcOldDsd { quarterly: true } => vec![format!("{year}Q{}_DSD.txt", period.quarter())],
            Product::NorpDaily => vec!["TYKW-NoRP_dailyflux.txt".into()],
            Product::GfzKpWdc { definitive } => {
                vec![format!("Kp_{}{year}.wdc", if *definitive { "def" } else { "now" })]
            }
            Product::NoaaDst => vec![format!("dst{year}.txt")],
            Product::Lasp96Hour { index } => vec![format!("{index}_last_96_hrs.txt")],
            Product::AceText { kind, realtime: true } => {
                let name = match kind {
                    AceKind::Mag => "magnetometer",
                    other => other.name(),
                };
                vec![format!("ace-{name}.txt")]
            }
            Product::AceText { kind, realtime: false } => vec![format!(
                "{}_ace_{}_{}m.txt",
                period.start.format("%Y%m%d"),
                kind.name(),
                kind.cadence_minutes()
            )],
            Product::GfzJson { .. } | Product::LisirdJson { .. } => vec![self.cache_file_name(period.start)],
        }
    }

    /// Remote URLs for a period, in the order they should be tried.
    pub fn urls(&self, period: &FilePeriod) -> Vec<String> {
        let start = period.start.format("%Y-%m-%d");
        let last = period.last().format("%Y-%m-%d");
        match self {
            Product::GfzJson { index, definitive } => {
                let status = if *definitive { "&status=def" } else { "" };
                vec![format!(
                    "{GFZ_JSON}?start={start}T00:00:00Z&end={last}T23:59:59Z&index={index}{status}"
                )]
            }
            Product::LisirdJson { dataset } => vec![format!(
                "{LISIRD_LATIS}{dataset}.json?&time>={start}T00:00:00.000Z&time<={last}T23:59:59.999Z\
                 &format_time(yyyy-MM-dd'T'HH:mm:ss.SSS)"
            )],
            Product::GfzKpWdc { definitive } => {
                let dir = if *definitive { "Kp_definitive" } else { "Kp_nowcast" };
                self.remote_names(period)
                    .into_iter()
                    .map(|name| format!("{GFZ_WDC}{dir}/{name}"))
                    .collect()
            }
            _ => {
                let base = match self {
                    Product::SwpcOldDsd { .. } => SWPC_OLD_INDICES,
                    Product::NorpDaily => NORP_DAILY,
                    Product::NoaaDst => NGDC_DST,
                    Product::Lasp96Hour { .. } => LASP_96HR,
                    Product::AceText { realtime: false, .. } => ACE_DAILY,
                    _ => SWPC_TEXT,
                };
                self.remote_names(period)
                    .into_iter()
                    .map(|name| format!("{base}{name}"))
                    .collect()
            }
        }
    }

    /// Finer-grained product tried for the periods this one lacks: a year
    /// without a yearly DSD archive is still published quarter by quarter.
    pub fn fallback(&self) -> Option<Product> {
        match self {
            Product::SwpcOldDsd { quarterly: false } => Some(Product::SwpcOldDsd { quarterly: true }),
            _ => None,
        }
    }

    /// File names looked up in a mirror directory, in order.
    ///
    /// File products keep their remote name; query products use the cache name.
    pub fn mirror_names(&self, period: &FilePeriod) -> Vec<String> {
        self.remote_names(period)
    }

    /// `{key}_{YYYY-MM-DD}.{ext}`, relative to the product's cache directory.
    pub fn cache_file_name(&self, date: NaiveDate) -> String {
        format!("{}_{}.{}", self.key(), date.format("%Y-%m-%d"), self.extension())
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.key())
    }
}
