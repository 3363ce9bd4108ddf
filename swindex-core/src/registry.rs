//! Instrument registry: the host-facing surface.
//!
//! Every instrument is a named index with one or more tags; each tag is backed
//! by exactly one remote [`Product`]. The four entry points are
//! [`list_files`], [`download`], [`load`] and [`clean`].

use crate::combine::{combine, CombineError, CombineOptions};
use crate::config::Config;
use crate::domain::{InstrumentId, Series, SeriesBuilder, SeriesError, SourcePriority, TimeRange};
use crate::download::{
    download_range, DownloadError, DownloadProgress, DownloadSummary, FileCadence, PayloadCache,
    PayloadSource, Product,
};
use crate::parse::{ace, AceKind, ParseContext, ParseError, ParserRegistry};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// A snapshot file holds up to 45 days on either side of its file date
/// (30-day observations, 45-day forecasts), so snapshots dated this far
/// outside the requested range are still parsed.
const SNAPSHOT_REACH_DAYS: i64 = 45;

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),

    #[error("instrument '{name}' has no tag '{tag}' (known: {known})")]
    UnknownTag {
        name: String,
        tag: String,
        known: String,
    },

    #[error("unknown clean level '{0}' (expected clean, dusty, dirty or none)")]
    UnknownCleanLevel(String),

    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

// ─── Instrument table ────────────────────────────────────────────────

/// One tag of an instrument and the product behind it.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub tag: &'static str,
    pub product: Product,
    pub desc: &'static str,
}

impl Tag {
    /// The tag's product followed by its fallback, if any.
    pub fn products(&self) -> impl Iterator<Item = Product> {
        std::iter::once(self.product).chain(self.product.fallback())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Instrument {
    pub platform: &'static str,
    /// Instrument name; also the index name picked out of each parse.
    pub name: &'static str,
    pub description: &'static str,
    pub tags: &'static [Tag],
}

const fn tag(tag: &'static str, product: Product, desc: &'static str) -> Tag {
    Tag { tag, product, desc }
}

const KP_WDC_DEF: Product = Product::GfzKpWdc { definitive: true };
const KP_WDC_NOW: Product = Product::GfzKpWdc { definitive: false };
const OLD_DSD: Product = Product::SwpcOldDsd { quarterly: false };

const INSTRUMENTS: &[Instrument] = &[
    Instrument {
        platform: "sw",
        name: "kp",
        description: "3-hourly planetary Kp index",
        tags: &[
            tag("def", KP_WDC_DEF, "GFZ definitive Kp"),
            tag("now", KP_WDC_NOW, "GFZ nowcast Kp"),
            tag("recent", Product::SwpcDailyGeomagIndices, "SWPC last 30 days of Kp"),
            tag("forecast", Product::SwpcGeomagForecast, "SWPC 3-day Kp forecast"),
            tag("prediction", Product::SwpcSolarGeomagPredictions, "SWPC 3-day Kp prediction"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "ap",
        description: "3-hourly ap and daily Ap indices",
        tags: &[
            tag("def", KP_WDC_DEF, "GFZ definitive ap"),
            tag("now", KP_WDC_NOW, "GFZ nowcast ap"),
            tag("recent", Product::SwpcDailyGeomagIndices, "SWPC last 30 days of Ap"),
            tag("forecast", Product::SwpcGeomagForecast, "SWPC observed, estimated and predicted Ap"),
            tag("prediction", Product::SwpcSolarGeomagPredictions, "SWPC 3-day Ap prediction"),
            tag("45day", Product::Swpc45DayForecast, "SWPC 45-day Ap forecast"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "cp",
        description: "Daily planetary character figures Cp and C9",
        tags: &[
            tag("def", KP_WDC_DEF, "GFZ definitive Cp"),
            tag("now", KP_WDC_NOW, "GFZ nowcast Cp"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "stormprob",
        description: "Geomagnetic storm probabilities",
        tags: &[
            tag("forecast", Product::SwpcGeomagForecast, "SWPC 3-day storm probabilities"),
            tag("prediction", Product::SwpcSolarGeomagPredictions, "SWPC 3-day storm predictions"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "polarcap",
        description: "Polar cap absorption forecast",
        tags: &[tag("prediction", Product::SwpcSolarGeomagPredictions, "SWPC 3-day polar cap forecast")],
    },
    Instrument {
        platform: "sw",
        name: "hpo",
        description: "Half-hourly and hourly Hpo indices",
        tags: &[
            tag("30min", Product::GfzJson { index: "Hp30", definitive: false }, "GFZ Hp30"),
            tag("60min", Product::GfzJson { index: "Hp60", definitive: false }, "GFZ Hp60"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "apo",
        description: "Half-hourly and hourly apo indices",
        tags: &[
            tag("30min", Product::GfzJson { index: "ap30", definitive: false }, "GFZ ap30"),
            tag("60min", Product::GfzJson { index: "ap60", definitive: false }, "GFZ ap60"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "f107",
        description: "10.7 cm solar radio flux",
        tags: &[
            tag("historic", Product::LisirdJson { dataset: "noaa_radio_flux" }, "LISIRD Penticton archive"),
            tag("prelim", OLD_DSD, "SWPC archived daily solar data"),
            tag("daily", Product::SwpcDailySolarData, "SWPC last 30 days of solar data"),
            tag("45day", Product::Swpc45DayForecast, "SWPC 45-day F10.7 forecast"),
            tag("forecast", Product::SwpcSolarGeomagPredictions, "SWPC 3-day F10.7 forecast"),
            tag("now", Product::GfzJson { index: "Fobs", definitive: false }, "GFZ observed F10.7"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "ssn",
        description: "Sunspot number, area and new regions",
        tags: &[
            tag("prelim", OLD_DSD, "SWPC archived daily solar data"),
            tag("daily", Product::SwpcDailySolarData, "SWPC last 30 days of solar data"),
            tag("now", Product::GfzJson { index: "SN", definitive: false }, "GFZ international sunspot number"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "flare",
        description: "Solar flare counts and flare probabilities",
        tags: &[
            tag("prelim", OLD_DSD, "SWPC archived daily flare counts"),
            tag("daily", Product::SwpcDailySolarData, "SWPC last 30 days of flare counts"),
            tag("prediction", Product::SwpcSolarGeomagPredictions, "SWPC 3-day flare probabilities"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "sbfield",
        description: "Solar mean magnetic field",
        tags: &[
            tag("prelim", OLD_DSD, "SWPC archived solar mean field"),
            tag("daily", Product::SwpcDailySolarData, "SWPC last 30 days of solar mean field"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "mgii",
        description: "MgII core-to-wing ratio",
        tags: &[
            tag("composite", Product::LisirdJson { dataset: "mgii_composite" }, "LISIRD composite MgII"),
            tag("sorce", Product::LisirdJson { dataset: "mgii_sorce" }, "LISIRD SORCE MgII"),
        ],
    },
    Instrument {
        platform: "norp",
        name: "norp",
        description: "Nobeyama multi-frequency solar radio flux",
        tags: &[tag("daily", Product::NorpDaily, "Toyokawa and Nobeyama daily flux since 1951")],
    },
    Instrument {
        platform: "sw",
        name: "dst",
        description: "Hourly disturbance storm-time index",
        tags: &[
            tag("noaa", Product::NoaaDst, "NGDC WDC yearly Dst files"),
            tag("lasp", Product::Lasp96Hour { index: "dst" }, "LASP last 96 hours of Dst"),
        ],
    },
    Instrument {
        platform: "sw",
        name: "ae",
        description: "Auroral electrojet index",
        tags: &[tag("lasp", Product::Lasp96Hour { index: "ae" }, "LASP last 96 hours of AE")],
    },
    Instrument {
        platform: "sw",
        name: "al",
        description: "Auroral lower envelope index",
        tags: &[tag("lasp", Product::Lasp96Hour { index: "al" }, "LASP last 96 hours of AL")],
    },
    Instrument {
        platform: "sw",
        name: "au",
        description: "Auroral upper envelope index",
        tags: &[tag("lasp", Product::Lasp96Hour { index: "au" }, "LASP last 96 hours of AU")],
    },
    Instrument {
        platform: "ace",
        name: "ace_mag",
        description: "ACE magnetometer, 1-minute",
        tags: &[
            tag("realtime", Product::AceText { kind: AceKind::Mag, realtime: true }, "SWPC last 2 hours"),
            tag("historic", Product::AceText { kind: AceKind::Mag, realtime: false }, "Daily archive files"),
        ],
    },
    Instrument {
        platform: "ace",
        name: "ace_swepam",
        description: "ACE solar wind plasma, 1-minute",
        tags: &[
            tag("realtime", Product::AceText { kind: AceKind::Swepam, realtime: true }, "SWPC last 2 hours"),
            tag("historic", Product::AceText { kind: AceKind::Swepam, realtime: false }, "Daily archive files"),
        ],
    },
    Instrument {
        platform: "ace",
        name: "ace_epam",
        description: "ACE energetic particles, 5-minute",
        tags: &[
            tag("realtime", Product::AceText { kind: AceKind::Epam, realtime: true }, "SWPC last 2 hours"),
            tag("historic", Product::AceText { kind: AceKind::Epam, realtime: false }, "Daily archive files"),
        ],
    },
    Instrument {
        platform: "ace",
        name: "ace_sis",
        description: "ACE integral proton flux, 5-minute",
        tags: &[
            tag("realtime", Product::AceText { kind: AceKind::Sis, realtime: true }, "SWPC last 2 hours"),
            tag("historic", Product::AceText { kind: AceKind::Sis, realtime: false }, "Daily archive files"),
        ],
    },
];

/// Every registered instrument.
pub fn instruments() -> &'static [Instrument] {
    INSTRUMENTS
}

/// Lookup by name.
pub fn instrument(name: &str) -> Result<&'static Instrument, RegistryError> {
    INSTRUMENTS
        .iter()
        .find(|i| i.name == name)
        .ok_or_else(|| RegistryError::UnknownInstrument(name.to_string()))
}

impl Instrument {
    pub fn tag(&self, tag: &str) -> Result<&'static Tag, RegistryError> {
        let tags: &'static [Tag] = self.tags;
        tags.iter().find(|t| t.tag == tag).ok_or_else(|| RegistryError::UnknownTag {
            name: self.name.to_string(),
            tag: tag.to_string(),
            known: tags.iter().map(|t| t.tag).collect::<Vec<_>>().join(", "),
        })
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tags.iter().map(|t| t.tag)
    }

    /// First date data exists for `tag`, from the configuration.
    pub fn start_date(&self, tag: &str, config: &Config) -> Option<NaiveDate> {
        config.start_date(self.name, tag)
    }

    fn ace_kind(&self) -> Option<AceKind> {
        self.name.strip_prefix("ace_").and_then(AceKind::from_name)
    }
}

/// Instrument and tag for an id.
pub fn resolve(id: &InstrumentId) -> Result<(&'static Instrument, &'static Tag), RegistryError> {
    let inst = instrument(&id.name)?;
    let tag = inst.tag(&id.tag)?;
    Ok((inst, tag))
}

/// First and last calendar day touched by `range`.
fn date_span(range: &TimeRange) -> (NaiveDate, NaiveDate) {
    let first = range.start.date_naive();
    let last = (range.end - Duration::seconds(1)).date_naive();
    (first, last.max(first))
}

// ─── Entry points ────────────────────────────────────────────────────

/// Cached files for an instrument in file-date order, fallback files included.
pub fn list_files(
    id: &InstrumentId,
    cache: &PayloadCache,
) -> Result<Vec<(NaiveDate, PathBuf)>, RegistryError> {
    let (_, tag) = resolve(id)?;
    let mut files = Vec::new();
    for product in tag.products() {
        files.extend(cache.list(&product)?);
    }
    files.sort_by_key(|(date, _)| *date);
    Ok(files)
}

/// Fetch every product file overlapping `range` into the cache.
///
/// Periods the tag's product lacks are retried with its finer-grained
/// fallback product, restricted to `range`.
pub fn download(
    id: &InstrumentId,
    range: &TimeRange,
    source: &dyn PayloadSource,
    cache: &PayloadCache,
    progress: &dyn DownloadProgress,
) -> Result<DownloadSummary, RegistryError> {
    let (_, tag) = resolve(id)?;
    let (first, last) = date_span(range);
    info!(instrument = %id, product = %tag.product, %first, %last, source = source.name(), "download");
    let mut summary = download_range(&tag.product, first, last, source, cache, progress);

    if let Some(fallback) = tag.product.fallback() {
        let cadence = tag.product.cadence();
        for date in summary.missing_dates.clone() {
            let period = cadence.period(date);
            let (from, to) = (first.max(period.start), last.min(period.last()));
            info!(product = %tag.product, %date, %fallback, "trying fallback files");
            summary.absorb(download_range(&fallback, from, to, source, cache, progress));
        }
    }
    Ok(summary)
}

/// Parse cached files into one series restricted to `range`.
///
/// Files are parsed in date order; where two files hold the same timestamp
/// the later file wins. Missing files leave gaps. For whole-record archives
/// only the newest cached copy is read.
pub fn load(
    id: &InstrumentId,
    range: &TimeRange,
    cache: &PayloadCache,
    parsers: &ParserRegistry,
    config: &Config,
) -> Result<Series, RegistryError> {
    let (inst, tag) = resolve(id)?;
    if range.is_empty() {
        return Err(CombineError::EmptyRange {
            start: range.start,
            end: range.end,
        }
        .into());
    }

    let (first, last) = date_span(range);
    let mut files: Vec<(NaiveDate, Product, PathBuf)> = Vec::new();
    for product in tag.products() {
        let cadence = product.cadence();
        let (earliest, latest) = match cadence {
            FileCadence::Snapshot => {
                let reach = Duration::days(SNAPSHOT_REACH_DAYS);
                (first - reach, last + reach)
            }
            _ => (first, last),
        };
        let listed = cache.list(&product)?;
        if cadence == FileCadence::Archive {
            files.extend(listed.into_iter().next_back().map(|(date, path)| (date, product, path)));
            continue;
        }
        for (date, path) in listed {
            let period = cadence.period(date);
            if period.last() < earliest || period.start > latest {
                continue;
            }
            files.push((date, product, path));
        }
    }
    files.sort_by_key(|(date, _, _)| *date);

    let mut pieces = Vec::new();
    for (date, product, path) in files {
        let text = cache.read(&path)?;
        let ctx = ParseContext::new(&config.fill, tag.tag, date).with_variant(product.variant());
        let mut parsed = parsers
            .parse(product.format(), &text, &ctx)
            .map_err(|source| RegistryError::Parse {
                path: path.clone(),
                source,
            })?;
        match parsed.take(inst.name) {
            Some(series) => pieces.push(series),
            None => debug!(path = %path.display(), index = inst.name, "file holds no records for index"),
        }
    }

    let source = id.source_id();
    if pieces.is_empty() {
        info!(instrument = %id, %first, %last, "no cached data in range");
        return Ok(SeriesBuilder::new(inst.name, source, Duration::days(1))
            .coverage(TimeRange::empty_at(range.start))
            .build()?);
    }

    // Unranked inputs: the later file wins each timestamp.
    let refs: Vec<&Series> = pieces.iter().collect();
    let merged = combine(&refs, &SourcePriority::default(), *range, &CombineOptions::default())?;
    debug!(instrument = %id, files = pieces.len(), records = merged.len(), "loaded");
    Ok(merged.with_source(source))
}

/// How strictly [`clean`] filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanLevel {
    Clean,
    Dusty,
    Dirty,
    None,
}

impl CleanLevel {
    /// Highest ACE status flag kept, `None` when the flags are ignored.
    pub fn ace_max_status(self) -> Option<u8> {
        match self {
            CleanLevel::Clean | CleanLevel::Dusty => Some(0),
            CleanLevel::Dirty => Some(8),
            CleanLevel::None => None,
        }
    }
}

impl FromStr for CleanLevel {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clean" => Ok(CleanLevel::Clean),
            "dusty" => Ok(CleanLevel::Dusty),
            "dirty" => Ok(CleanLevel::Dirty),
            "none" => Ok(CleanLevel::None),
            other => Err(RegistryError::UnknownCleanLevel(other.to_string())),
        }
    }
}

impl fmt::Display for CleanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CleanLevel::Clean => "clean",
            CleanLevel::Dusty => "dusty",
            CleanLevel::Dirty => "dirty",
            CleanLevel::None => "none",
        };
        f.write_str(s)
    }
}

/// Validate a loaded series.
///
/// Values outside a field's declared range become fill. ACE series are also
/// masked by their status flags and rows left without data are dropped.
/// `CleanLevel::None` returns the series untouched.
pub fn clean(id: &InstrumentId, series: Series, level: CleanLevel) -> Result<Series, RegistryError> {
    let (inst, _) = resolve(id)?;
    if level == CleanLevel::None {
        return Ok(series);
    }

    let mut replaced = 0usize;
    let series = series.map_values(|_, fields, values| {
        for (name, value) in values.iter_mut() {
            let Some(meta) = fields.get(name) else { continue };
            if meta.valid_f64(value).is_some_and(|v| !meta.in_range(v)) {
                *value = meta.fill.clone();
                replaced += 1;
            }
        }
    });
    if replaced > 0 {
        debug!(instrument = %id, replaced, "out-of-range values set to fill");
    }

    let Some(kind) = inst.ace_kind() else {
        return Ok(series);
    };
    if level == CleanLevel::Dusty {
        warn!(instrument = %id, "ACE has no dusty level; cleaning as 'clean'");
    }
    match level.ace_max_status() {
        Some(max_status) => Ok(ace::apply_status(series, kind, max_status)),
        None => Ok(series),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{day_start, FieldMeta, Record, Value};
    use crate::download::{LogProgress, MirrorSource, Payload};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const DST_2024: &str = "\
DST2401*01  P020   0  -5  -7  -9 -12 -15 -20 -22 -18 -14 -10  -8  -6  -4  -3  -2  -1   0   1   2   3   2   1   0  -1  -7
";

    #[test]
    fn every_tag_resolves_and_names_are_unique() {
        let mut names: Vec<_> = instruments().iter().map(|i| i.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), instruments().len());
        for inst in instruments() {
            for t in inst.tag_names() {
                let (found, tag) = resolve(&InstrumentId::new(inst.name, t)).unwrap();
                assert_eq!(found.name, inst.name);
                assert_eq!(tag.tag, t);
            }
        }
    }

    #[test]
    fn unknown_ids_are_errors() {
        assert!(matches!(
            resolve(&InstrumentId::new("nope", "def")),
            Err(RegistryError::UnknownInstrument(_))
        ));
        let err = resolve(&InstrumentId::new("kp", "nope")).unwrap_err();
        assert!(err.to_string().contains("def, now, recent"));
    }

    #[test]
    fn start_dates_come_from_config() {
        let config = Config::default();
        assert_eq!(instrument("f107").unwrap().start_date("historic", &config), Some(date(1947, 2, 14)));
        assert_eq!(instrument("hpo").unwrap().start_date("30min", &config), Some(date(1995, 1, 1)));
    }

    #[test]
    fn load_parses_cached_files_in_range() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = PayloadCache::new(tmp.path());
        let payload = Payload {
            text: DST_2024.to_string(),
            origin: "test".into(),
        };
        cache.write(&Product::NoaaDst, date(2024, 1, 1), &payload).unwrap();

        let id = InstrumentId::new("dst", "noaa");
        assert_eq!(list_files(&id, &cache).unwrap().len(), 1);

        let range = TimeRange::new(day_start(date(2024, 1, 1)) + Duration::hours(6), day_start(date(2024, 1, 2)));
        let series = load(&id, &range, &cache, &ParserRegistry::standard(), &Config::default()).unwrap();
        assert_eq!(series.len(), 18);
        assert_eq!(series.source().as_str(), "dst_noaa");
        assert_eq!(series.valid_f64(&series.records()[0], "dst"), Some(-22.0));
        assert_eq!(series.coverage(), range);
    }

    #[test]
    fn load_without_files_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = PayloadCache::new(tmp.path());
        let range = TimeRange::from_dates(date(2020, 1, 1), date(2020, 1, 31));
        let series = load(&InstrumentId::new("kp", "def"), &range, &cache, &ParserRegistry::standard(), &Config::default()).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.index(), "kp");
    }

    #[test]
    fn clean_masks_out_of_range_values() {
        let mut b = SeriesBuilder::new("kp", "kp_def".into(), Duration::hours(3))
            .field("Kp", FieldMeta::new("", "Kp", -1.0).with_range(0.0, 9.0));
        b.push(Record::new(day_start(date(2024, 1, 1))).with("Kp", 3.0));
        b.push(Record::new(day_start(date(2024, 1, 1)) + Duration::hours(3)).with("Kp", 12.0));
        let series = b.build().unwrap();
        let id = InstrumentId::new("kp", "def");

        let untouched = clean(&id, series.clone(), CleanLevel::None).unwrap();
        assert_eq!(untouched, series);

        let cleaned = clean(&id, series, CleanLevel::Clean).unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.records()[1].get("Kp"), Some(&Value::Number(-1.0)));
    }

    #[test]
    fn clean_level_names() {
        assert_eq!("dirty".parse::<CleanLevel>().unwrap(), CleanLevel::Dirty);
        assert_eq!(CleanLevel::Dusty.to_string(), "dusty");
        assert!("filthy".parse::<CleanLevel>().is_err());
        assert_eq!(CleanLevel::Dirty.ace_max_status(), Some(8));
    }

    #[test]
    fn prelim_years_without_an_archive_use_quarterly_files() {
        let mirror_dir = tempfile::tempdir().unwrap();
        for name in ["2023_DSD.txt", "2024Q1_DSD.txt", "2024Q2_DSD.txt"] {
            std::fs::write(mirror_dir.path().join(name), name).unwrap();
        }
        let mirror = MirrorSource::new(mirror_dir.path()).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let cache = PayloadCache::new(tmp.path());
        let id = InstrumentId::new("f107", "prelim");

        let range = TimeRange::from_dates(date(2023, 6, 1), date(2024, 5, 10));
        let summary = download(&id, &range, &mirror, &cache, &LogProgress).unwrap();
        // 2023 and 2024 yearly, then 2024 Q1 and Q2
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.missing_dates, vec![date(2024, 1, 1)]);
        assert!(summary.all_succeeded());

        let files = list_files(&id, &cache).unwrap();
        let dates: Vec<_> = files.iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![date(2023, 1, 1), date(2024, 1, 1), date(2024, 4, 1)]);
        assert!(files[0].1.ends_with("swpc_old_dsd/dsd_yearly_2023-01-01.txt"));
        assert!(files[2].1.ends_with("swpc_old_dsd/dsd_quarterly_2024-04-01.txt"));
    }

    #[test]
    fn archive_load_reads_only_the_newest_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = PayloadCache::new(tmp.path());
        let older = "Flux (1951-11-01 - 2024-05-01)\nDate,2 GHz\n\"1951-11-01\",60.0\n\"2024-05-01\",1.0\n";
        let newer = "Flux (1951-11-01 - 2024-05-02)\nDate,2 GHz\n\"1951-11-01\",61.5\n\"2024-05-02\",2.0\n";
        for (day, text) in [(1, older), (2, newer)] {
            let payload = Payload {
                text: text.to_string(),
                origin: "test".into(),
            };
            cache.write(&Product::NorpDaily, date(2024, 5, day), &payload).unwrap();
        }

        let id = InstrumentId::new("norp", "daily");
        let range = TimeRange::from_dates(date(1951, 11, 1), date(1951, 11, 30));
        let series = load(&id, &range, &cache, &ParserRegistry::standard(), &Config::default()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.valid_f64(&series.records()[0], "2_GHz"), Some(61.5));
        assert_eq!(series.source().as_str(), "norp_daily");
    }
}
