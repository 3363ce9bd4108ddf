//! Nobeyama Radio Polarimeters daily flux file `TYKW-NoRP_dailyflux.txt`.
//!
//! ```text
//! Daily solar flux densities with AU correction (1951-11-01 - 2024-05-06)
//! Date,1 GHz,2 GHz,3.75 GHz,9.4 GHz,17 GHz,35 GHz,80 GHz
//! "2024-05-01",71.2,120.4,175.0,288.3,525.1,nan,nan
//! ```

use super::text;
use super::{ParseContext, ParseError, Parsed};
use crate::domain::{day_start, FieldMeta, Record, SeriesBuilder};
use chrono::{Duration, NaiveDate};
use tracing::warn;

pub const FORMAT: &str = "norp_daily";

const INDEX: &str = "norp";

/// Header marker holding the span of the file.
const SPAN_MARKER: &str = "(start - stop)";

/// `(1951-11-01 - 2024-05-06)` at the end of the first line.
fn header_span(line: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (_, tail) = line.rsplit_once('(')?;
    let inner = tail.trim_end().strip_suffix(')')?;
    let parts: Vec<&str> = inner.split_whitespace().collect();
    let [start, "-", stop] = parts.as_slice() else {
        return None;
    };
    Some((
        NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?,
        NaiveDate::parse_from_str(stop, "%Y-%m-%d").ok()?,
    ))
}

/// Parse the whole-record daily flux file.
///
/// Column names have their spaces replaced by underscores (`3.75_GHz`).
/// Values starting with `nan` are fill. A server "not found" page yields an
/// empty series.
pub fn parse_daily_flux(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    let mut builder = SeriesBuilder::new(INDEX, ctx.source(INDEX), Duration::days(1));
    if payload.contains(super::lasp::NOT_FOUND) {
        warn!("NoRP daily flux file not found on server");
        return Ok(Parsed::single(
            builder
                .build()
                .map_err(|source| ParseError::Series { format: FORMAT, source })?,
        ));
    }

    let mut lines = text::numbered_lines(payload).filter(|(_, l)| !text::is_blank(l));
    let (_, header) = lines.next().ok_or_else(|| ParseError::missing(FORMAT, SPAN_MARKER))?;
    let (start, stop) = header_span(header).ok_or_else(|| ParseError::missing(FORMAT, SPAN_MARKER))?;
    let (_, names) = lines.next().ok_or_else(|| ParseError::missing(FORMAT, "column names"))?;

    let columns: Vec<String> = names.split(',').skip(1).map(|c| c.trim().replace(' ', "_")).collect();
    if columns.is_empty() {
        return Err(ParseError::invalid(FORMAT, "no flux columns in header"));
    }
    for name in &columns {
        let freq = name.replace('_', " ");
        builder.declare(
            name,
            FieldMeta::new("SFU", &format!("NoRP solar radio flux {freq} w/AU corr"), f64::NAN)
                .with_range(0.0, f64::INFINITY),
        );
    }

    for (no, line) in lines {
        let cells: Vec<&str> = line.split(',').collect();
        if cells.len() != columns.len() + 1 {
            return Err(ParseError::malformed(
                FORMAT,
                no,
                line,
                format!("expected {} columns", columns.len() + 1),
            ));
        }
        let date = NaiveDate::parse_from_str(cells[0].trim().trim_matches('"'), "%Y-%m-%d")
            .map_err(|_| ParseError::malformed(FORMAT, no, line, "bad date"))?;
        if date < start || date > stop {
            return Err(ParseError::malformed(
                FORMAT,
                no,
                line,
                format!("date outside the file span {start} to {stop}"),
            ));
        }
        let mut record = Record::new(day_start(date));
        for (name, cell) in columns.iter().zip(&cells[1..]) {
            let value = if cell.trim().to_ascii_lowercase().starts_with("nan") {
                f64::NAN
            } else {
                text::number(FORMAT, no, line, cell)?
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
