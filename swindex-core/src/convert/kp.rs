//! Kp <-> ap conversion and daily Ap.

use super::table::ConversionTable;
use super::ConversionError;
use crate::domain::{FieldMeta, Series, Timestamp, Value};
use chrono::Duration;
use std::collections::BTreeMap;

/// Number of valid 3-hour values required before a daily Ap is reported.
pub const DAILY_AP_MIN_PERIODS: usize = 8;

/// Kp to ap through the standard table.
pub fn kp_to_ap(kp: f64) -> Result<f64, ConversionError> {
    ConversionTable::kp_ap().forward(kp)
}

/// ap to Kp through the standard table (nearest entry, ties to the lower Kp).
pub fn ap_to_kp(ap: f64) -> Result<f64, ConversionError> {
    ConversionTable::kp_ap().inverse(ap)
}

/// Add `ap_field` derived from `kp_field`. Fill stays fill.
pub fn convert_kp_to_ap(
    series: &Series,
    table: &ConversionTable,
    kp_field: &str,
    ap_field: &str,
) -> Result<Series, ConversionError> {
    derive_field(
        series,
        kp_field,
        ap_field,
        |fill| FieldMeta::new("nT", "3-hour ap index", fill).with_range(0.0, 400.0),
        |v| table.forward(v),
    )
}

/// Add `kp_field` derived from `ap_field`. Fill stays fill.
pub fn convert_ap_to_kp(
    series: &Series,
    table: &ConversionTable,
    ap_field: &str,
    kp_field: &str,
) -> Result<Series, ConversionError> {
    derive_field(
        series,
        ap_field,
        kp_field,
        |fill| FieldMeta::new("", "Kp index derived from ap", fill).with_range(0.0, 9.0),
        |v| table.inverse(v),
    )
}

/// Element-wise derivation shared by the converters.
fn derive_field(
    series: &Series,
    from: &str,
    to: &str,
    meta: impl FnOnce(Value) -> FieldMeta,
    convert: impl Fn(f64) -> Result<f64, ConversionError>,
) -> Result<Series, ConversionError> {
    let src = series
        .field(from)
        .ok_or_else(|| crate::domain::SeriesError::MissingField(from.to_string()))?;
    let fill = src.fill.clone();

    let mut values = Vec::with_capacity(series.len());
    for record in series.records() {
        let raw = record.get(from).cloned().unwrap_or_else(|| fill.clone());
        if src.is_fill(&raw) {
            values.push(fill.clone());
            continue;
        }
        let v = raw.as_f64().ok_or_else(|| ConversionError::NotNumeric {
            field: from.to_string(),
            time: record.time,
        })?;
        let out = convert(v).map_err(|e| ConversionError::AtRecord {
            time: record.time,
            source: Box::new(e),
        })?;
        values.push(Value::Number(out));
    }

    Ok(series.with_field(to, meta(fill), values)?)
}

/// Add `daily_field`: the mean of each UTC day's valid 3-hour ap values.
///
/// Days with fewer than `min_periods` valid values get the ap field's fill.
/// With `running_field`, also add the trailing 24-hour mean ending at each
/// record, held to the same `min_periods`.
pub fn calc_daily_ap(
    series: &Series,
    ap_field: &str,
    daily_field: &str,
    running_field: Option<&str>,
    min_periods: usize,
) -> Result<Series, ConversionError> {
    let src = series
        .field(ap_field)
        .ok_or_else(|| crate::domain::SeriesError::MissingField(ap_field.to_string()))?;
    let fill = src.fill.clone();
    let mean = |values: &[(Timestamp, f64)]| {
        if values.len() >= min_periods && !values.is_empty() {
            Value::Number(values.iter().map(|(_, v)| v).sum::<f64>() / values.len() as f64)
        } else {
            fill.clone()
        }
    };

    let valid: Vec<(Timestamp, f64)> = series
        .valid_values(ap_field)
        .filter_map(|(t, v)| v.map(|v| (t, v)))
        .collect();
    let mut by_day: BTreeMap<chrono::NaiveDate, Vec<(Timestamp, f64)>> = BTreeMap::new();
    for &(time, v) in &valid {
        by_day.entry(time.date_naive()).or_default().push((time, v));
    }

    let values = series
        .records()
        .iter()
        .map(|r| by_day.get(&r.time.date_naive()).map_or_else(|| fill.clone(), |day| mean(day)))
        .collect();
    let meta = FieldMeta::new("nT", "Daily Ap index", fill.clone()).with_range(0.0, 400.0);
    let out = series.with_field(daily_field, meta, values)?;

    let Some(running_field) = running_field else {
        return Ok(out);
    };
    let window = Duration::days(1);
    let running = series
        .records()
        .iter()
        .map(|r| {
            let lo = valid.partition_point(|(t, _)| *t <= r.time - window);
            let hi = valid.partition_point(|(t, _)| *t <= r.time);
            mean(&valid[lo..hi])
        })
        .collect();
    let meta = FieldMeta::new("nT", "24-h running average of 3-hourly ap indices", fill).with_range(0.0, 400.0);
    Ok(out.with_field(running_field, meta, running)?)
}
