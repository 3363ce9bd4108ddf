//! Series export: CSV for tabular tools, JSON for everything else.
//!
//! CSV columns are `time` followed by the series' fields in name order. Fill
//! values are written as empty cells so downstream tools see them as missing.

use crate::domain::Series;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("flush CSV writer: {0}")]
    Flush(String),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Write `series` as CSV. Times are RFC 3339 UTC.
pub fn write_csv<W: Write>(series: &Series, writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let names: Vec<&str> = series.fields().keys().map(String::as_str).collect();
    let mut header = Vec::with_capacity(names.len() + 1);
    header.push("time");
    header.extend(names.iter().copied());
    wtr.write_record(&header)?;

    for record in series.records() {
        let mut row = Vec::with_capacity(names.len() + 1);
        row.push(record.time.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        for name in &names {
            let cell = match (series.field(name), record.get(name)) {
                (Some(meta), Some(v)) if !meta.is_fill(v) => v.to_string(),
                _ => String::new(),
            };
            row.push(cell);
        }
        wtr.write_record(&row)?;
    }

    wtr.flush().map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(())
}

/// CSV as a string.
pub fn to_csv_string(series: &Series) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(series, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a series, field metadata included, to pretty JSON.
pub fn to_json(series: &Series) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(series)?)
}
