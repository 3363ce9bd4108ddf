//! Format parsers, one per remote product.
//!
//! Parsers are plain functions registered under a format tag in
//! [`ParserRegistry`]. A parser turns one raw payload into one or more
//! [`Series`], keyed by index name, because several products carry more than
//! one index (the SWPC 3-day predictions hold Ap, Kp, F10.7, flare and storm
//! probabilities at once).
//!
//! Missing structural markers are a [`ParseError`]; a payload that has its
//! markers but no data rows parses to empty series.

pub mod ace;
pub mod dsd;
pub mod dst;
pub mod gfz;
pub mod lasp;
pub mod lisird;
pub mod norp;
pub mod swpc;
mod text;

pub use ace::AceKind;

use crate::config::FillDefaults;
use crate::domain::{FieldMeta, Series, SeriesError, SourceId};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{format}: structural marker '{marker}' not found")]
    MissingMarker {
        format: &'static str,
        marker: String,
    },

    #[error("{format}: line {line}: {reason}: '{content}'")]
    MalformedLine {
        format: &'static str,
        line: usize,
        content: String,
        reason: String,
    },

    #[error("{format}: invalid JSON: {source}")]
    Json {
        format: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{format}: {reason}")]
    Invalid {
        format: &'static str,
        reason: String,
    },

    #[error("{format}: {source}")]
    Series {
        format: &'static str,
        #[source]
        source: SeriesError,
    },

    #[error("no parser registered for format '{0}'")]
    UnknownFormat(String),
}

impl ParseError {
    pub(crate) fn malformed(
        format: &'static str,
        line: usize,
        content: &str,
        reason: impl Into<String>,
    ) -> Self {
        ParseError::MalformedLine {
            format,
            line,
            content: content.trim().to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(format: &'static str, marker: &str) -> Self {
        ParseError::MissingMarker {
            format,
            marker: marker.to_string(),
        }
    }

    pub(crate) fn invalid(format: &'static str, reason: impl Into<String>) -> Self {
        ParseError::Invalid {
            format,
            reason: reason.into(),
        }
    }

    /// True when the payload lacked its structural markers entirely.
    pub fn is_missing_marker(&self) -> bool {
        matches!(self, ParseError::MissingMarker { .. })
    }
}

/// Everything a parser needs besides the payload text.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub fill: &'a FillDefaults,
    /// Tag attached to every produced series, e.g. `def` or `forecast`.
    pub tag: &'a str,
    /// Product parameter: GFZ index, ACE instrument, LISIRD dataset, LASP index.
    pub variant: &'a str,
    /// Date the file was requested for; supplies the year where the payload omits it.
    pub file_date: NaiveDate,
}

impl<'a> ParseContext<'a> {
    pub fn new(fill: &'a FillDefaults, tag: &'a str, file_date: NaiveDate) -> Self {
        Self {
            fill,
            tag,
            variant: "",
            file_date,
        }
    }

    pub fn with_variant(mut self, variant: &'a str) -> Self {
        self.variant = variant;
        self
    }

    pub fn source(&self, index: &str) -> SourceId {
        SourceId::new(index, self.tag)
    }

    /// Numeric field metadata with the configured default fill for `format`.
    pub fn meta(&self, format: &str, field: &str, units: &str, desc: &str) -> FieldMeta {
        FieldMeta::new(units, desc, self.fill.get(format, field))
    }
}

/// Output of one parse: series keyed by index name.
#[derive(Debug, Default)]
pub struct Parsed {
    series: BTreeMap<String, Series>,
}

impl Parsed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(series: Series) -> Self {
        let mut out = Self::new();
        out.insert(series);
        out
    }

    pub fn insert(&mut self, series: Series) {
        self.series.insert(series.index().to_string(), series);
    }

    pub fn get(&self, index: &str) -> Option<&Series> {
        self.series.get(index)
    }

    pub fn take(&mut self, index: &str) -> Option<Series> {
        self.series.remove(index)
    }

    pub fn indices(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

pub type ParserFn = fn(&str, &ParseContext<'_>) -> Result<Parsed, ParseError>;

/// Format tag to parser function.
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    parsers: BTreeMap<&'static str, ParserFn>,
}

impl ParserRegistry {
    pub fn empty() -> Self {
        Self {
            parsers: BTreeMap::new(),
        }
    }

    /// Every built-in format.
    pub fn standard() -> Self {
        let mut reg = Self::empty();
        reg.register(swpc::PREDICTIONS_FORMAT, swpc::parse_predictions);
        reg.register(swpc::GEOMAG_FORECAST_FORMAT, swpc::parse_geomag_forecast);
        reg.register(swpc::DGD_FORMAT, swpc::parse_daily_geomag);
        reg.register(swpc::FORTY_FIVE_DAY_FORMAT, swpc::parse_45day);
        reg.register(dsd::FORMAT, dsd::parse_daily_solar_data);
        reg.register(gfz::JSON_FORMAT, gfz::parse_json);
        reg.register(gfz::WDC_FORMAT, gfz::parse_kp_wdc);
        reg.register(dst::FORMAT, dst::parse_wdc_dst);
        reg.register(lasp::FORMAT, lasp::parse_96hr);
        reg.register(lisird::FORMAT, lisird::parse_latis_json);
        reg.register(norp::FORMAT, norp::parse_daily_flux);
        reg.register(ace::FORMAT, ace::parse_ace);
        reg
    }

    pub fn register(&mut self, format: &'static str, parser: ParserFn) {
        self.parsers.insert(format, parser);
    }

    pub fn get(&self, format: &str) -> Option<ParserFn> {
        self.parsers.get(format).copied()
    }

    pub fn formats(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parsers.keys().copied()
    }

    pub fn parse(
        &self,
        format: &str,
        text: &str,
        ctx: &ParseContext<'_>,
    ) -> Result<Parsed, ParseError> {
        let parser = self
            .get(format)
            .ok_or_else(|| ParseError::UnknownFormat(format.to_string()))?;
        parser(text, ctx)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
