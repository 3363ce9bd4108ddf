//! LASP "last 96 hours" files for Dst and the auroral electrojet indices.

use super::text;
use super::{ParseContext, ParseError, Parsed};
use crate::domain::{Record, SeriesBuilder};
use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

pub const FORMAT: &str = "lasp_96hr";

/// Body of the server's HTML page for a missing file.
pub const NOT_FOUND: &str = "not found on this server";

const TIME_FORMAT: &str = "%Y/%j-%H:%M:%S";

/// Indices served in this layout and their sample spacing in minutes.
const INDICES: [(&str, &str, i64); 4] = [
    ("dst", "Disturbance storm-time index", 60),
    ("ae", "Auroral electrojet index", 1),
    ("al", "Auroral lower envelope index", 1),
    ("au", "Auroral upper envelope index", 1),
];

/// Parse `{index}_last_96_hrs.txt`. The index comes from `ctx.variant`.
///
/// The first line is a header. Every other non-blank line is a
/// `YYYY/DDD-HH:MM:SS value` pair.
pub fn parse_96hr(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    let (index, desc, cadence) = INDICES
        .iter()
        .copied()
        .find(|(name, _, _)| *name == ctx.variant)
        .ok_or_else(|| ParseError::invalid(FORMAT, format!("unknown LASP index '{}'", ctx.variant)))?;
    let mut builder = SeriesBuilder::new(index, ctx.source(index), Duration::minutes(cadence))
        .field(index, ctx.meta(FORMAT, index, "nT", desc));

    if payload.contains(NOT_FOUND) {
        warn!(index, "LASP last 96 hour file not found on server");
    } else {
        for (no, line) in text::numbered_lines(payload).skip(1) {
            if text::is_blank(line) {
                continue;
            }
            let cols: Vec<&str> = line.split_whitespace().collect();
            let [stamp, value] = cols.as_slice() else {
                return Err(ParseError::malformed(FORMAT, no, line, "expected 2 columns"));
            };
            let time = NaiveDateTime::parse_from_str(stamp, TIME_FORMAT)
                .map_err(|_| ParseError::malformed(FORMAT, no, line, "bad timestamp"))?;
            let value = text::number(FORMAT, no, line, value)?;
            builder.push(Record::new(Utc.from_utc_datetime(&time)).with(index, value));
        }
    }

    let series = builder
        .build()
        .map_err(|source| ParseError::Series { format: FORMAT, source })?;
    Ok(Parsed::single(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FillDefaults;
    use chrono::NaiveDate;

    fn ctx<'a>(fill: &'a FillDefaults, variant: &'a str) -> ParseContext<'a> {
        ParseContext::new(fill, "lasp", NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()).with_variant(variant)
    }

    #[test]
    fn day_of_year_timestamps() {
        let fill = FillDefaults::default();
        let payload = "Time  Dst(nT)\n2024/127-00:00:00  -12.5\n2024/127-01:00:00  -15.0\n";
        let parsed = parse_96hr(payload, &ctx(&fill, "dst")).unwrap();
        let dst = parsed.get("dst").unwrap();
        assert_eq!(dst.len(), 2);
        assert_eq!(dst.records()[0].time, Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap());
        assert_eq!(dst.valid_f64(&dst.records()[1], "dst"), Some(-15.0));
        assert_eq!(dst.source().as_str(), "dst_lasp");
    }

    #[test]
    fn not_found_page_is_empty() {
        let fill = FillDefaults::default();
        let payload = "<html><body>The requested URL was not found on this server.</body></html>";
        let parsed = parse_96hr(payload, &ctx(&fill, "ae")).unwrap();
        assert!(parsed.get("ae").unwrap().is_empty());
    }

    #[test]
    fn extra_columns_are_malformed() {
        let fill = FillDefaults::default();
        let payload = "Time AL\n2024/127-00:00:00 -120 7\n";
        let err = parse_96hr(payload, &ctx(&fill, "al")).unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line: 2, .. }));
    }
}
