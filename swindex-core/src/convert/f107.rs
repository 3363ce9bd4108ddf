use super::ConversionError;
use crate::domain::{FieldMeta, Series, SeriesError, Value};
use chrono::Duration;

/// Half-width of the centred F10.7 averaging window, in days.
const F107A_HALF_WINDOW_DAYS: i64 = 40;

/// Add `f107a_field`: the 81-day centred mean of daily F10.7.
///
/// A window holding fewer than `min_points` valid values yields fill.
pub fn calc_f107a(
    series: &Series,
    f107_field: &str,
    f107a_field: &str,
    min_points: usize,
) -> Result<Series, ConversionError> {
    let src = series
        .field(f107_field)
        .ok_or_else(|| SeriesError::MissingField(f107_field.to_string()))?;
    let fill = src.fill.clone();

    let valid: Vec<(chrono::NaiveDate, f64)> = series
        .valid_values(f107_field)
        .filter_map(|(t, v)| v.map(|v| (t.date_naive(), v)))
        .collect();

    let half = Duration::days(F107A_HALF_WINDOW_DAYS);
    let values = series
        .records()
        .iter()
        .map(|r| {
            let day = r.time.date_naive();
            let lo = valid.partition_point(|(d, _)| *d < day - half);
            let hi = valid.partition_point(|(d, _)| *d <= day + half);
            let window = &valid[lo..hi];
            if window.len() >= min_points && !window.is_empty() {
                let sum: f64 = window.iter().map(|(_, v)| v).sum();
                Value::Number(sum / window.len() as f64)
            } else {
                fill.clone()
            }
        })
        .collect();

    let meta = FieldMeta::new("SFU", "81-day centered average of F10.7", fill);
    Ok(series.with_field(f107a_field, meta, values)?)
}
