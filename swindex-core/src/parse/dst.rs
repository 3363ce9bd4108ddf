//! Hourly Dst in the WDC exchange format, one line per day.
//!
//! ```text
//! DST2401*01  P020   0  -5  -7 ...  -1  -7
//! ^  ^ ^  ^     ^ ^   ^                  ^
//! |  | |  day   | |   24 hourly values   daily mean
//! |  yy mm      | base
//! |             century
//! ```

use super::text;
use super::{ParseContext, ParseError, Parsed};
use crate::domain::{day_start, Record, SeriesBuilder};
use chrono::{Duration, NaiveDate};

pub const FORMAT: &str = "noaa_dst";

const HOURLY_START: usize = 20;
const HOURLY_WIDTH: usize = 4;
const LINE_LEN: usize = HOURLY_START + 24 * HOURLY_WIDTH;

/// Two-digit years without a century column: above this pivot means 19xx.
const CENTURY_PIVOT: i32 = 57;

/// Parse a yearly `dstYYYY.txt` file into an hourly `dst` series.
pub fn parse_wdc_dst(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    let mut dst = SeriesBuilder::new("dst", ctx.source("dst"), Duration::hours(1))
        .field("dst", ctx.meta(FORMAT, "dst", "nT", "Disturbance storm-time index"));

    for (no, line) in text::content_lines(payload) {
        if !line.starts_with("DST") || line.len() < LINE_LEN || !line.is_ascii() {
            return Err(ParseError::malformed(FORMAT, no, line, "not a WDC Dst record"));
        }
        let bad = |what: &str| ParseError::malformed(FORMAT, no, line, format!("bad {what}"));
        let int = |start: usize, end: usize, what: &str| -> Result<i32, ParseError> {
            line[start..end].trim().parse::<i32>().map_err(|_| bad(what))
        };

        let yy = int(3, 5, "year")?;
        let year = match line[14..16].trim() {
            "" if yy > CENTURY_PIVOT => 1900 + yy,
            "" => 2000 + yy,
            _ => int(14, 16, "century")? * 100 + yy,
        };
        let date = NaiveDate::from_ymd_opt(year, int(5, 7, "month")? as u32, int(8, 10, "day")? as u32)
            .ok_or_else(|| bad("date"))?;
        let midnight = day_start(date);

        for hour in 0..24 {
            let start = HOURLY_START + hour * HOURLY_WIDTH;
            let value = text::number(FORMAT, no, line, &line[start..start + HOURLY_WIDTH])?;
            dst.push(Record::new(midnight + Duration::hours(hour as i64)).with("dst", value));
        }
    }

    let series = dst
        .build()
        .map_err(|source| ParseError::Series { format: FORMAT, source })?;
    Ok(Parsed::single(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FillDefaults;

    fn ctx(fill: &FillDefaults) -> ParseContext<'_> {
        ParseContext::new(fill, "noaa", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    const DST: &str = "\
DST2401*01  P020   0  -5  -7  -9 -12 -15 -20 -22 -18 -14 -10  -8  -6  -4  -3  -2  -1   0   1   2   3   2   1   0  -1  -7
DST2401*02  P0     0   3   3   3   3   3   3   3   3   3   3   3   3   3   3   3   3   3   3   3   3   3   3999999999999
";

    #[test]
    fn hourly_values_with_fill() {
        let fill = FillDefaults::default();
        let parsed = parse_wdc_dst(DST, &ctx(&fill)).unwrap();
        let dst = parsed.get("dst").unwrap();
        assert_eq!(dst.len(), 48);
        assert_eq!(dst.source().as_str(), "dst_noaa");
        assert_eq!(dst.valid_f64(&dst.records()[6], "dst"), Some(-22.0));
        // blank century column falls back to the pivot
        assert_eq!(dst.records()[24].time, day_start(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        assert_eq!(dst.valid_f64(&dst.records()[46], "dst"), None);
        assert_eq!(dst.valid_f64(&dst.records()[45], "dst"), Some(3.0));
    }

    #[test]
    fn two_digit_year_pivot() {
        let fill = FillDefaults::default();
        let old = DST.lines().nth(1).unwrap().replacen("DST24", "DST85", 1);
        let parsed = parse_wdc_dst(&old, &ctx(&fill)).unwrap();
        let first = parsed.get("dst").unwrap().records()[0].time;
        assert_eq!(first, day_start(NaiveDate::from_ymd_opt(1985, 1, 2).unwrap()));
    }

    #[test]
    fn truncated_line_is_malformed() {
        let fill = FillDefaults::default();
        let err = parse_wdc_dst("DST2401*01  P020   0  -5  -7\n", &ctx(&fill)).unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line: 1, .. }));
    }
}
