//! LASP LISIRD LaTiS JSON: `{dataset: {samples: [{time, ...}, ...]}}`.

use super::{ParseContext, ParseError, Parsed};
use crate::domain::{FieldMeta, Record, SeriesBuilder, Timestamp, Value};
use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

pub const FORMAT: &str = "lisird_json";

#[derive(Debug, Deserialize)]
struct Dataset {
    samples: Vec<BTreeMap<String, serde_json::Value>>,
}

/// Output index and units for each dataset served.
fn dataset_index(name: &str) -> Option<(&'static str, &'static str)> {
    match name {
        "noaa_radio_flux" => Some(("f107", "SFU")),
        "mgii_composite" | "mgii_sorce" => Some(("mgii", "")),
        _ => None,
    }
}

/// Layouts LaTiS has used for the `time` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeLayout {
    /// `20240506`, as a string or a number
    Compact,
    /// `2024 05 06`
    Spaced,
    /// `2024-05-06T12:00:00.000`
    Iso,
}

impl TimeLayout {
    fn detect(sample: &serde_json::Value) -> Option<TimeLayout> {
        [TimeLayout::Compact, TimeLayout::Spaced, TimeLayout::Iso]
            .into_iter()
            .find(|layout| layout.parse(sample).is_some())
    }

    fn parse(self, value: &serde_json::Value) -> Option<Timestamp> {
        let raw = match value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.as_u64()?.to_string(),
            _ => return None,
        };
        let naive = match self {
            TimeLayout::Compact => NaiveDate::parse_from_str(&raw, "%Y%m%d")
                .ok()?
                .and_hms_opt(0, 0, 0)?,
            TimeLayout::Spaced => NaiveDate::parse_from_str(&raw, "%Y %m %d")
                .ok()?
                .and_hms_opt(0, 0, 0)?,
            TimeLayout::Iso => {
                NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f").ok()?
            }
        };
        Some(Utc.from_utc_datetime(&naive))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Numeric,
    Text,
}

/// Type of every non-time column. All-null columns are numeric; a column
/// holding both numbers and text is an error.
fn column_kinds(samples: &[BTreeMap<String, serde_json::Value>]) -> Result<BTreeMap<String, ColumnKind>, ParseError> {
    let mut kinds = BTreeMap::new();
    for (i, sample) in samples.iter().enumerate() {
        for (name, value) in sample.iter().filter(|(k, _)| k.as_str() != "time") {
            let kind = match value {
                serde_json::Value::Number(_) => ColumnKind::Numeric,
                serde_json::Value::String(_) => ColumnKind::Text,
                _ => continue,
            };
            match kinds.entry(name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(kind);
                }
                Entry::Occupied(slot) if *slot.get() != kind => {
                    return Err(ParseError::invalid(
                        FORMAT,
                        format!("sample {i}: column '{name}' mixes numbers and text"),
                    ));
                }
                Entry::Occupied(_) => {}
            }
        }
        for name in sample.keys().filter(|k| k.as_str() != "time") {
            kinds.entry(name.clone()).or_insert(ColumnKind::Numeric);
        }
    }
    Ok(kinds)
}

/// Parse a LaTiS JSON response for the dataset named by `ctx.variant`.
///
/// The time layout is detected on the first sample and then applied to all.
/// Numeric columns get the configured fill; `null` entries become fill.
/// A column must hold either numbers or text throughout.
pub fn parse_latis_json(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    let (index, units) = dataset_index(ctx.variant)
        .ok_or_else(|| ParseError::invalid(FORMAT, format!("unknown LISIRD dataset '{}'", ctx.variant)))?;
    let mut raw: BTreeMap<String, Dataset> =
        serde_json::from_str(payload).map_err(|source| ParseError::Json { format: FORMAT, source })?;
    let dataset = raw
        .remove(ctx.variant)
        .ok_or_else(|| ParseError::missing(FORMAT, ctx.variant))?;

    let mut builder = SeriesBuilder::new(index, ctx.source(index), Duration::days(1));
    let layout = match dataset.samples.first() {
        Some(first) => {
            let time = first.get("time").ok_or_else(|| ParseError::missing(FORMAT, "time"))?;
            Some(
                TimeLayout::detect(time)
                    .ok_or_else(|| ParseError::invalid(FORMAT, format!("unrecognised time layout {time}")))?,
            )
        }
        None => None,
    };

    let kinds = column_kinds(&dataset.samples)?;
    for (name, kind) in &kinds {
        let meta = match kind {
            ColumnKind::Text => FieldMeta::new("", name, ""),
            ColumnKind::Numeric => {
                let field_units = if name == index { units } else { "" };
                ctx.meta(FORMAT, name, field_units, name)
            }
        };
        builder.declare(name, meta);
    }

    for (i, sample) in dataset.samples.iter().enumerate() {
        let time = sample
            .get("time")
            .and_then(|t| layout.and_then(|l| l.parse(t)))
            .ok_or_else(|| ParseError::invalid(FORMAT, format!("sample {i} has a bad time")))?;
        let mut record = Record::new(time);
        for (name, value) in sample.iter().filter(|(k, _)| k.as_str() != "time") {
            let value = match (value, kinds.get(name)) {
                (serde_json::Value::Number(n), _) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
                (serde_json::Value::String(s), _) => Value::from(s.as_str()),
                (serde_json::Value::Null, Some(ColumnKind::Text)) => Value::from(""),
                (serde_json::Value::Null, _) => Value::from(ctx.fill.get(FORMAT, name)),
                (other, _) => {
                    return Err(ParseError::invalid(FORMAT, format!("sample {i}: unexpected {name} {other}")))
                }
            };
            record.set(name, value);
        }
        builder.push(record);
    }

    let series = builder
        .build()
        .map_err(|source| ParseError::Series { format: FORMAT, source })?;
    Ok(Parsed::single(series))
}
