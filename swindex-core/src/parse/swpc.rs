//! SWPC text products: 3-day solar-geophysical predictions, 3-day geomagnetic
//! forecast, daily geomagnetic indices and the 45-day Ap/F10.7 forecast.

use super::text::{self, Block};
use super::{ParseContext, ParseError, Parsed};
use crate::domain::{day_start, FieldMeta, Record, SeriesBuilder, TimeRange, Value};
use chrono::{Duration, NaiveDate};

pub const PREDICTIONS_FORMAT: &str = "swpc_3day_predictions";
pub const GEOMAG_FORECAST_FORMAT: &str = "swpc_3day_geomag_forecast";
pub const DGD_FORMAT: &str = "swpc_dgd";
pub const FORTY_FIVE_DAY_FORMAT: &str = "swpc_45day";

fn numbers(
    format: &'static str,
    line_no: usize,
    line: &str,
    tokens: &[&str],
) -> Result<Vec<f64>, ParseError> {
    tokens
        .iter()
        .map(|t| text::number(format, line_no, line, t))
        .collect()
}

fn build(format: &'static str, builder: SeriesBuilder) -> Result<crate::domain::Series, ParseError> {
    builder
        .build()
        .map_err(|source| ParseError::Series { format, source })
}

/// Start hour of a `00-03UT` style slot label.
fn slot_hour(format: &'static str, line_no: usize, line: &str, label: &str) -> Result<i64, ParseError> {
    label
        .get(..2)
        .and_then(|h| h.parse::<i64>().ok())
        .filter(|h| (0..24).contains(h))
        .ok_or_else(|| ParseError::malformed(format, line_no, line, "bad UT slot"))
}

// ── 3-day solar-geophysical predictions ─────────────────────────────

/// Parse `3-day-solar-geomag-predictions.txt`.
///
/// Produces `ap`, `kp`, `stormprob`, `f107`, `flare` and `polarcap` series.
pub fn parse_predictions(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    const F: &str = PREDICTIONS_FORMAT;
    let blocks = text::colon_blocks(payload);
    let require = |name: &str| require_block(&blocks, name);

    let dates_block = require("Prediction_dates")?;
    let dates = prediction_dates(dates_block)?;
    let coverage = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => TimeRange::from_dates(*first, *last),
        _ => return Err(ParseError::missing(F, "prediction dates")),
    };
    let n = dates.len();
    let day = Duration::days(1);
    let mut out = Parsed::new();

    // Ap
    let mut ap = SeriesBuilder::new("ap", ctx.source("ap"), day).coverage(coverage);
    for &(no, line) in &require("Geomagnetic_A_indices")?.rows {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, vals) = split_row(F, no, line, &tokens, n)?;
        let station = name.strip_prefix("A_").unwrap_or(name);
        let field = match station {
            "Planetary" => "daily_Ap".to_string(),
            other => format!("{}_Ap", other.to_ascii_lowercase()),
        };
        let desc = format!("Predicted daily A index ({station})");
        ap.declare(&field, ctx.meta(F, &field, "nT", &desc));
        for (date, v) in dates.iter().zip(numbers(F, no, line, vals)?) {
            ap.upsert(day_start(*date), &field, v);
        }
    }
    out.insert(build(F, ap)?);

    // Kp, mid latitude required, high latitude when present
    let mut kp = SeriesBuilder::new("kp", ctx.source("kp"), Duration::hours(3)).coverage(coverage);
    let kp_blocks = [("Pred_Mid_k", "mid_lat_Kp", true), ("Pred_High_k", "high_lat_Kp", false)];
    for (block_name, field, required) in kp_blocks {
        let block = match text::block(&blocks, block_name) {
            Some(b) => b,
            None if required => return Err(ParseError::missing(F, &format!(":{block_name}:"))),
            None => continue,
        };
        kp.declare(field, ctx.meta(F, field, "", "Predicted 3-hour K index").with_range(0.0, 9.0));
        for &(no, line) in &block.rows {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (label, vals) = split_row(F, no, line, &tokens, n)?;
            let slot = label.rsplit('/').next().unwrap_or(label);
            let hour = slot_hour(F, no, line, slot)?;
            for (date, v) in dates.iter().zip(numbers(F, no, line, vals)?) {
                kp.upsert(day_start(*date) + Duration::hours(hour), field, v);
            }
        }
    }
    out.insert(build(F, kp)?);

    // Storm probabilities
    let mut storm = SeriesBuilder::new("stormprob", ctx.source("stormprob"), day).coverage(coverage);
    for (block_name, required) in [("Prob_Mid", true), ("Prob_High", false)] {
        let block = match text::block(&blocks, block_name) {
            Some(b) => b,
            None if required => return Err(ParseError::missing(F, &format!(":{block_name}:"))),
            None => continue,
        };
        for &(no, line) in &block.rows {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (label, vals) = split_row(F, no, line, &tokens, n)?;
            let field = storm_field(label);
            storm.declare(&field, ctx.meta(F, &field, "%", "Probability of geomagnetic activity"));
            for (date, v) in dates.iter().zip(numbers(F, no, line, vals)?) {
                storm.upsert(day_start(*date), &field, v);
            }
        }
    }
    out.insert(build(F, storm)?);

    // Polar cap absorption
    let polar = require("Polar_cap")?;
    let mut pc = SeriesBuilder::new("polarcap", ctx.source("polarcap"), day)
        .coverage(coverage)
        .field("absorption_forecast", FieldMeta::new("", "Polar cap absorption forecast", ""));
    if let Some(&(no, line)) = polar.rows.first() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let per_day: Vec<&str> = match tokens.len() {
            1 => vec![tokens[0]; n],
            len if len == n => tokens,
            _ => return Err(ParseError::malformed(F, no, line, "expected one status per day")),
        };
        for (date, status) in dates.iter().zip(per_day) {
            pc.push(Record::new(day_start(*date)).with("absorption_forecast", status));
        }
    }
    out.insert(build(F, pc)?);

    // F10.7
    let flux = require("10cm_flux")?;
    let mut f107 = SeriesBuilder::new("f107", ctx.source("f107"), day)
        .coverage(coverage)
        .field("f107", ctx.meta(F, "f107", "SFU", "Predicted 10.7 cm solar radio flux"));
    if let Some(&(no, line)) = flux.rows.first() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != n {
            return Err(ParseError::malformed(F, no, line, format!("expected {n} flux values")));
        }
        for (date, v) in dates.iter().zip(numbers(F, no, line, &tokens)?) {
            f107.push(Record::new(day_start(*date)).with("f107", v));
        }
    }
    out.insert(build(F, f107)?);

    // Flare probabilities: whole-disk rows, then optional per-region rows
    let whole_disk = require("Whole_Disk_Flare_Prob")?;
    let mut flare = SeriesBuilder::new("flare", ctx.source("flare"), day).coverage(coverage);
    let region_rows = text::block(&blocks, "Reg_Prob").map(|b| b.rows.as_slice()).unwrap_or(&[]);
    for &(no, line) in whole_disk.rows.iter().chain(region_rows) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() == n + 1 && tokens[0].parse::<f64>().is_err() {
            let field = format!("whole_disk_{}", tokens[0].to_ascii_lowercase());
            flare.declare(&field, ctx.meta(F, &field, "%", "Whole-disk flare probability"));
            for (date, v) in dates.iter().zip(numbers(F, no, line, &tokens[1..])?) {
                flare.upsert(day_start(*date), &field, v);
            }
        } else if tokens.len() == 5 {
            let region = tokens[0];
            let probs = numbers(F, no, line, &tokens[1..])?;
            for (class, v) in ["c", "m", "x", "p"].iter().zip(probs) {
                let field = format!("region_{region}_class_{class}");
                flare.declare(&field, ctx.meta(F, &field, "%", "Regional flare probability"));
                flare.upsert(day_start(dates[0]), &field, v);
            }
        } else {
            return Err(ParseError::malformed(F, no, line, "unexpected flare probability row"));
        }
    }
    out.insert(build(F, flare)?);

    Ok(out)
}

fn require_block<'b, 'a>(blocks: &'b [Block<'a>], name: &str) -> Result<&'b Block<'a>, ParseError> {
    text::block(blocks, name).ok_or_else(|| ParseError::missing(PREDICTIONS_FORMAT, &format!(":{name}:")))
}

fn prediction_dates(block: &Block<'_>) -> Result<Vec<NaiveDate>, ParseError> {
    const F: &str = PREDICTIONS_FORMAT;
    let tokens: Vec<&str> = block.header_rest.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() % 3 != 0 {
        return Err(ParseError::malformed(
            F,
            block.line,
            block.header_rest,
            "prediction dates must be 'YYYY Mon DD' triples",
        ));
    }
    tokens
        .chunks(3)
        .map(|c| {
            NaiveDate::parse_from_str(&c.join(" "), "%Y %b %d").map_err(|_| {
                ParseError::malformed(F, block.line, block.header_rest, "bad prediction date")
            })
        })
        .collect()
}

/// Split a `label v1 v2 ...` row, requiring exactly `n` values.
fn split_row<'t>(
    format: &'static str,
    line_no: usize,
    line: &str,
    tokens: &'t [&'t str],
    n: usize,
) -> Result<(&'t str, &'t [&'t str]), ParseError> {
    match tokens.split_first() {
        Some((label, vals)) if vals.len() == n => Ok((label, vals)),
        _ => Err(ParseError::malformed(format, line_no, line, format!("expected a label and {n} values"))),
    }
}

/// `Mid/Major-Severe_Storm` -> `mid_lat_major_severe_storm`
fn storm_field(label: &str) -> String {
    let (region, kind) = label.split_once('/').unwrap_or(("", label));
    let kind = kind.to_ascii_lowercase().replace('-', "_");
    match region {
        "" => kind,
        r => format!("{}_lat_{kind}", r.to_ascii_lowercase()),
    }
}

// ── 3-day geomagnetic forecast ──────────────────────────────────────

const AP_MARKER: &str = "NOAA Ap Index Forecast";
const PROB_MARKER: &str = "NOAA Geomagnetic Activity Probabilities";
const KP_MARKER: &str = "NOAA Kp index forecast";

/// Parse `3-day-geomag-forecast.txt` into `ap`, `kp` and `stormprob` series.
pub fn parse_geomag_forecast(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    const F: &str = GEOMAG_FORECAST_FORMAT;
    let lines: Vec<(usize, &str)> = text::numbered_lines(payload).collect();
    let find = |marker: &str| {
        lines
            .iter()
            .position(|(_, l)| l.trim_start().starts_with(marker))
            .ok_or_else(|| ParseError::missing(F, marker))
    };
    let ap_at = find(AP_MARKER)?;
    let prob_at = find(PROB_MARKER)?;
    let kp_at = find(KP_MARKER)?;
    let reference = text::issued(payload)
        .map(|t| t.date())
        .unwrap_or(ctx.file_date);


    // Ap: observed, estimated, predicted
    let day = Duration::days(1);
    let mut ap = SeriesBuilder::new("ap", ctx.source("ap"), day)
        .field("daily_Ap", ctx.meta(F, "daily_Ap", "nT", "Daily Ap index"))
        .field("ap_kind", FieldMeta::new("", "observed, estimated or predicted", ""));
    for (no, line) in section(&lines, ap_at) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [kind @ ("Observed" | "Estimated"), "Ap", d, m, v] => {
                let date = forecast_day(no, line, d, m, reference)?;
                let v = text::number(F, no, line, v)?;
                ap.push(
                    Record::new(day_start(date))
                        .with("daily_Ap", v)
                        .with("ap_kind", kind.to_ascii_lowercase()),
                );
            }
            ["Predicted", "Ap", d, m, .., vals] => {
                let start = forecast_day(no, line, d, m, reference)?;
                let vals: Vec<&str> = vals.split('-').collect();
                for (i, v) in numbers(F, no, line, &vals)?.into_iter().enumerate() {
                    ap.push(
                        Record::new(day_start(start) + Duration::days(i as i64))
                            .with("daily_Ap", v)
                            .with("ap_kind", "predicted"),
                    );
                }
            }
            _ => return Err(ParseError::malformed(F, no, line, "unexpected Ap forecast row")),
        }
    }

    // Storm probabilities: the header carries the first date
    let (prob_no, prob_line) = lines[prob_at];
    let prob_tokens: Vec<&str> = prob_line.split_whitespace().collect();
    let prob_start = match prob_tokens.get(4..6) {
        Some([d, m]) => forecast_day(prob_no, prob_line, d, m, reference)?,
        _ => return Err(ParseError::malformed(F, prob_no, prob_line, "missing probability dates")),
    };
    let mut storm = SeriesBuilder::new("stormprob", ctx.source("stormprob"), day);
    for (no, line) in section(&lines, prob_at) {
        let (label, vals) = line
            .trim()
            .rsplit_once(char::is_whitespace)
            .ok_or_else(|| ParseError::malformed(F, no, line, "expected label and a/b/c"))?;
        let field = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_ascii_lowercase()
            .replace('-', "_");
        storm.declare(&field, ctx.meta(F, &field, "%", "Probability of geomagnetic activity"));
        let vals: Vec<&str> = vals.split('/').collect();
        for (i, v) in numbers(F, no, line, &vals)?.into_iter().enumerate() {
            storm.upsert(day_start(prob_start) + Duration::days(i as i64), &field, v);
        }
    }

    // Kp: a month/day header row, then one row per 3-hour slot
    let mut kp_rows = section(&lines, kp_at);
    let (hdr_no, hdr) = kp_rows
        .next()
        .ok_or_else(|| ParseError::missing(F, "Kp forecast date header"))?;
    let hdr_tokens: Vec<&str> = hdr.split_whitespace().collect();
    if hdr_tokens.is_empty() || hdr_tokens.len() % 2 != 0 {
        return Err(ParseError::malformed(F, hdr_no, hdr, "expected 'Mon DD' column headers"));
    }
    let kp_dates = hdr_tokens
        .chunks(2)
        .map(|c| forecast_day(hdr_no, hdr, c[1], c[0], reference))
        .collect::<Result<Vec<_>, _>>()?;
    let mut kp = SeriesBuilder::new("kp", ctx.source("kp"), Duration::hours(3))
        .field("Kp", ctx.meta(F, "Kp", "", "Forecast planetary K index").with_range(0.0, 9.0));
    for (no, line) in kp_rows {
        let tokens: Vec<&str> = line
            .split_whitespace()
            .filter(|t| !t.starts_with('('))
            .collect();
        let (label, vals) = split_row(F, no, line, &tokens, kp_dates.len())?;
        if !label.ends_with("UT") {
            return Err(ParseError::malformed(F, no, line, "expected a UT slot label"));
        }
        let hour = slot_hour(F, no, line, label)?;
        for (date, v) in kp_dates.iter().zip(numbers(F, no, line, vals)?) {
            kp.push(Record::new(day_start(*date) + Duration::hours(hour)).with("Kp", v));
        }
    }

    let mut out = Parsed::new();
    out.insert(build(F, ap)?);
    out.insert(build(F, kp)?);
    out.insert(build(F, storm)?);
    Ok(out)
}

/// Rows after the marker at `start`, up to the next blank line.
fn section<'l>(
    lines: &'l [(usize, &'l str)],
    start: usize,
) -> impl Iterator<Item = (usize, &'l str)> + 'l {
    lines[start + 1..]
        .iter()
        .copied()
        .skip_while(|(_, l)| text::is_blank(l))
        .take_while(|(_, l)| !text::is_blank(l))
        .filter(|(_, l)| !text::is_comment(l))
}

/// `07 May` (or `07 May-09`) placed in the year nearest `reference`.
fn forecast_day(
    no: usize,
    line: &str,
    day: &str,
    month: &str,
    reference: NaiveDate,
) -> Result<NaiveDate, ParseError> {
    let d = day.parse::<u32>().ok();
    let m = text::month_number(month.split('-').next().unwrap_or(month));
    d.zip(m)
        .and_then(|(d, m)| text::nearest_year(d, m, reference))
        .ok_or_else(|| ParseError::malformed(GEOMAG_FORECAST_FORMAT, no, line, "bad day and month"))
}

// ── Daily geomagnetic indices ───────────────────────────────────────

/// `(A columns, K columns)` for Fredericksburg, College and planetary.
const DGD_COLUMNS: [((usize, usize), (usize, Option<usize>)); 3] = [
    ((10, 17), (17, Some(33))),
    ((33, 40), (40, Some(56))),
    ((56, 63), (63, None)),
];
const DGD_FIELDS: [(&str, &str); 3] = [
    ("mid_lat_Ap", "mid_lat_Kp"),
    ("high_lat_Ap", "high_lat_Kp"),
    ("daily_Ap", "Kp"),
];

/// Parse `daily-geomagnetic-indices.txt` into `kp` and `ap` series.
pub fn parse_daily_geomag(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    const F: &str = DGD_FORMAT;
    let has_header = text::numbered_lines(payload)
        .any(|(_, l)| text::is_comment(l) && l.contains("Date"));
    if !has_header {
        return Err(ParseError::missing(F, "#  Date"));
    }

    let mut kp = SeriesBuilder::new("kp", ctx.source("kp"), Duration::hours(3));
    let mut ap = SeriesBuilder::new("ap", ctx.source("ap"), Duration::days(1));
    for (ap_field, kp_field) in DGD_FIELDS {
        ap.declare(ap_field, ctx.meta(F, ap_field, "nT", "Daily A index"));
        kp.declare(kp_field, ctx.meta(F, kp_field, "", "3-hour K index").with_range(0.0, 9.0));
    }

    for (no, line) in text::content_lines(payload).filter(|(_, l)| !l.starts_with(':')) {
        let date = text::columns(line, 0, Some(10))
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y %m %d").ok())
            .ok_or_else(|| ParseError::malformed(F, no, line, "bad date"))?;
        let midnight = day_start(date);

        let mut daily = Record::new(midnight);
        for (((a0, a1), (k0, k1)), (ap_field, kp_field)) in DGD_COLUMNS.iter().zip(DGD_FIELDS) {
            let a = text::columns(line, *a0, Some(*a1))
                .ok_or_else(|| ParseError::malformed(F, no, line, "line too short"))?;
            daily.set(ap_field, text::number(F, no, line, a)?);

            let k = text::columns(line, *k0, *k1)
                .ok_or_else(|| ParseError::malformed(F, no, line, "line too short"))?;
            for (slot, v) in k_values(F, no, line, k)?.into_iter().enumerate() {
                kp.upsert(midnight + Duration::hours(3 * slot as i64), kp_field, v);
            }
        }
        ap.push(daily);
    }

    let mut out = Parsed::new();
    out.insert(build(F, kp)?);
    out.insert(build(F, ap)?);
    Ok(out)
}

/// Eight K values: decimals split on whitespace, integers in 2-character cells.
fn k_values(format: &'static str, no: usize, line: &str, chunk: &str) -> Result<Vec<f64>, ParseError> {
    let values: Vec<f64> = if chunk.contains('.') {
        let tokens: Vec<&str> = chunk.split_whitespace().collect();
        numbers(format, no, line, &tokens)?
    } else {
        let chars: Vec<char> = chunk.chars().collect();
        chars
            .chunks(2)
            .map(|c| c.iter().collect::<String>())
            .filter(|c| !c.trim().is_empty())
            .map(|c| text::number(format, no, line, &c))
            .collect::<Result<_, _>>()?
    };
    if values.len() != 8 {
        return Err(ParseError::malformed(format, no, line, "expected 8 K values"));
    }
    Ok(values)
}

// ── 45-day Ap and F10.7 forecast ────────────────────────────────────

const AP45_MARKER: &str = "45-DAY AP FORECAST";
const F107_45_MARKER: &str = "45-DAY F10.7 CM FLUX FORECAST";

/// Parse `45-day-ap-forecast.txt` into `ap` and `f107` series.
pub fn parse_45day(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    const F: &str = FORTY_FIVE_DAY_FORMAT;
    let lines: Vec<(usize, &str)> = text::numbered_lines(payload).collect();
    let find = |marker: &str| {
        lines
            .iter()
            .position(|(_, l)| l.trim_start().starts_with(marker))
            .ok_or_else(|| ParseError::missing(F, marker))
    };
    let ap_at = find(AP45_MARKER)?;
    let f107_at = find(F107_45_MARKER)?;
    if f107_at < ap_at {
        return Err(ParseError::invalid(F, "F10.7 block precedes the Ap block"));
    }

    let day = Duration::days(1);
    let mut ap = SeriesBuilder::new("ap", ctx.source("ap"), day)
        .field("daily_Ap", ctx.meta(F, "daily_Ap", "nT", "45-day forecast daily Ap"));
    let mut f107 = SeriesBuilder::new("f107", ctx.source("f107"), day)
        .field("f107", ctx.meta(F, "f107", "SFU", "45-day forecast F10.7"));

    let blocks = [
        (&lines[ap_at + 1..f107_at], &mut ap, "daily_Ap"),
        (&lines[f107_at + 1..], &mut f107, "f107"),
    ];
    for (block, builder, field) in blocks {
        for &(no, line) in block {
            let trimmed = line.trim();
            if trimmed.is_empty() || text::is_comment(line) {
                continue;
            }
            if ["FORECASTER", "99999", "NNNN"].iter().any(|t| trimmed.starts_with(*t)) {
                break;
            }
            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            if tokens.len() % 2 != 0 {
                return Err(ParseError::malformed(F, no, line, "expected date/value pairs"));
            }
            for pair in tokens.chunks(2) {
                let date = NaiveDate::parse_from_str(pair[0], "%d%b%y")
                    .map_err(|_| ParseError::malformed(F, no, line, "bad date"))?;
                let v = text::number(F, no, line, pair[1])?;
                builder.push(Record::new(day_start(date)).with(field, v));
            }
        }
    }

    let mut out = Parsed::new();
    out.insert(build(F, ap)?);
    out.insert(build(F, f107)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FillDefaults;

    fn ctx<'a>(fill: &'a FillDefaults, tag: &'a str) -> ParseContext<'a> {
        ParseContext::new(fill, tag, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap())
    }

    const GEOMAG_FORECAST: &str = "\
:Product: Geomagnetic Forecast
:Issued: 2024 May 06 2205 UTC
# Prepared by the U.S. Dept. of Commerce, NOAA, Space Weather Prediction Center
#
NOAA Ap Index Forecast
Observed Ap 05 May 011
Estimated Ap 06 May 015
Predicted Ap 07 May-09 May 012-008-005

NOAA Geomagnetic Activity Probabilities 07 May-09 May
Active                25/20/10
Minor storm           10/05/01
Moderate storm        01/01/01
Strong-Extreme storm  01/01/01

NOAA Kp index forecast 07 May - 09 May
             May 07    May 08    May 09
00-03UT        3.00      2.67      2.00
03-06UT        2.33      2.33      1.67
06-09UT        2.00      2.00      1.67
09-12UT        2.00      1.67      1.33
12-15UT        2.33      1.67      1.33
15-18UT        2.67      2.00      1.67
18-21UT        5.00 (G1) 2.33      2.00
21-00UT        3.00      2.00      1.67
";

    #[test]
    fn geomag_forecast_sections() {
        let fill = FillDefaults::default();
        let mut parsed = parse_geomag_forecast(GEOMAG_FORECAST, &ctx(&fill, "forecast")).unwrap();

        let ap = parsed.take("ap").unwrap();
        let vals: Vec<_> = ap.valid_values("daily_Ap").map(|(_, v)| v.unwrap()).collect();
        assert_eq!(vals, vec![11.0, 15.0, 12.0, 8.0, 5.0]);
        assert_eq!(ap.records()[0].get("ap_kind"), Some(&Value::from("observed")));
        assert_eq!(ap.records()[0].time, day_start(NaiveDate::from_ymd_opt(2024, 5, 5).unwrap()));

        let kp = parsed.take("kp").unwrap();
        assert_eq!(kp.len(), 24);
        assert_eq!(kp.source().as_str(), "kp_forecast");
        let storm_slot = day_start(NaiveDate::from_ymd_opt(2024, 5, 7).unwrap()) + Duration::hours(18);
        assert_eq!(kp.get(storm_slot).and_then(|r| r.get("Kp")), Some(&Value::Number(5.0)));

        let storm = parsed.take("stormprob").unwrap();
        assert_eq!(storm.len(), 3);
        assert!(storm.field("strong_extreme_storm").is_some());
        assert_eq!(storm.valid_f64(&storm.records()[1], "active"), Some(20.0));
    }

    #[test]
    fn geomag_forecast_without_kp_block_is_malformed() {
        let fill = FillDefaults::default();
        let cut = GEOMAG_FORECAST.split("NOAA Kp index").next().unwrap();
        let err = parse_geomag_forecast(cut, &ctx(&fill, "forecast")).unwrap_err();
        assert!(err.is_missing_marker());
    }

    const DGD: &str = "\
:Product: Daily Geomagnetic Data          DGD.txt
:Issued: 0225 UT 07 May 2024
#
#                Middle Latitude        - High Latitude -            - Estimated -
#              - Fredericksburg -         ---- College ----           --- Planetary ---
#  Date        A     K-indices        A     K-indices        A     K-indices
2024 05 05      5 1 1 2 2 1 1 1 2      4 1 0 1 3 1 0 0 1      6  1.67 1.33 2.00 2.33 1.00 1.00 1.33 2.00
2024 05 06     -1-1-1-1-1-1-1-1-1      9 2 2 3 3 2 1 1 2     10  2.00 2.00 3.00 3.00 2.33 1.67 1.33 2.67
";

    #[test]
    fn daily_geomag_fixed_columns() {
        let fill = FillDefaults::default();
        let mut parsed = parse_daily_geomag(DGD, &ctx(&fill, "recent")).unwrap();
        let ap = parsed.take("ap").unwrap();
        assert_eq!(ap.len(), 2);
        assert_eq!(ap.valid_f64(&ap.records()[0], "daily_Ap"), Some(6.0));
        assert_eq!(ap.valid_f64(&ap.records()[1], "mid_lat_Ap"), None);

        let kp = parsed.take("kp").unwrap();
        assert_eq!(kp.len(), 16);
        assert_eq!(kp.valid_f64(&kp.records()[3], "Kp"), Some(2.33));
        assert_eq!(kp.valid_f64(&kp.records()[3], "high_lat_Kp"), Some(3.0));
        assert_eq!(kp.valid_f64(&kp.records()[8], "mid_lat_Kp"), None);
    }

    #[test]
    fn daily_geomag_header_only_is_empty() {
        let fill = FillDefaults::default();
        let header: String = DGD.lines().take(6).map(|l| format!("{l}\n")).collect();
        let parsed = parse_daily_geomag(&header, &ctx(&fill, "recent")).unwrap();
        assert!(parsed.get("kp").unwrap().is_empty());
    }

    #[test]
    fn daily_geomag_bad_date_is_malformed() {
        let fill = FillDefaults::default();
        let bad = DGD.replace("2024 05 06", "2024 13 06");
        let err = parse_daily_geomag(&bad, &ctx(&fill, "recent")).unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line: 8, .. }));
    }

    const FORTY_FIVE: &str = "\
:Product: 45 Day AP Forecast  45DF.txt
:Issued: 2024 May 06 2110 UTC
# Prepared by the U.S. Air Force.
#
45-DAY AP FORECAST
07May24 012 08May24 008 09May24 005 10May24 005 11May24 005
12May24 010
45-DAY F10.7 CM FLUX FORECAST
07May24 165 08May24 160 09May24 155 10May24 150 11May24 150
12May24 145
FORECASTER:  SMITH
99999
NNNN
";

    #[test]
    fn forty_five_day_blocks() {
        let fill = FillDefaults::default();
        let mut parsed = parse_45day(FORTY_FIVE, &ctx(&fill, "45day")).unwrap();
        let ap = parsed.take("ap").unwrap();
        let f107 = parsed.take("f107").unwrap();
        assert_eq!(ap.len(), 6);
        assert_eq!(f107.len(), 6);
        assert_eq!(f107.valid_f64(&f107.records()[5], "f107"), Some(145.0));
        assert_eq!(f107.source().as_str(), "f107_45day");
    }

    #[test]
    fn forty_five_day_odd_tokens_are_malformed() {
        let fill = FillDefaults::default();
        let bad = FORTY_FIVE.replace("12May24 010", "12May24");
        assert!(matches!(
            parse_45day(&bad, &ctx(&fill, "45day")).unwrap_err(),
            ParseError::MalformedLine { .. }
        ));
    }

    const PREDICTIONS: &str = "\
:Product: 3-Day Solar-Geophysical Predictions  3DPR.txt
:Issued: 2024 May 06 2200 UTC
# Prepared by the U.S. Dept. of Commerce, NOAA, Space Weather Prediction Center
#
:Prediction_dates:   2024 May 07  2024 May 08  2024 May 09
:Geomagnetic_A_indices:
A_Fredericksburg   10   7   5
A_Planetary         8   5   5
:Pred_Mid_k:
Mid/00-03UT        2         2         2
Mid/03-06UT        3         2         1
Mid/06-09UT        2         2         1
Mid/09-12UT        2         1         1
Mid/12-15UT        2         1         1
Mid/15-18UT        2         2         1
Mid/18-21UT        3         2         2
Mid/21-00UT        3         2         2
:Prob_Mid:
Mid/Active             15        10         5
Mid/Minor_Storm         5         1         1
Mid/Major-Severe_Storm  1         1         1
:Polar_cap:
green
:10cm_flux:
  165   160   155
:Whole_Disk_Flare_Prob:
Class_M  30  30  30
Class_X   5   5   5
Proton    5   5   5
:Reg_Prob: 2024 May 07  2024 May 08
# Region   C   M   X   P
  3663    99  60  10   5
";

    #[test]
    fn predictions_split_into_indices() {
        let fill = FillDefaults::default();
        let mut parsed = parse_predictions(PREDICTIONS, &ctx(&fill, "prediction")).unwrap();
        assert_eq!(
            parsed.indices().collect::<Vec<_>>(),
            vec!["ap", "f107", "flare", "kp", "polarcap", "stormprob"]
        );

        let ap = parsed.take("ap").unwrap();
        let daily: Vec<_> = ap.valid_values("daily_Ap").map(|(_, v)| v.unwrap()).collect();
        assert_eq!(daily, vec![8.0, 5.0, 5.0]);
        assert!(ap.field("fredericksburg_Ap").is_some());

        let kp = parsed.take("kp").unwrap();
        assert_eq!(kp.len(), 24);
        assert_eq!(kp.valid_f64(&kp.records()[1], "mid_lat_Kp"), Some(3.0));
        assert!(kp.field("high_lat_Kp").is_none());

        let pc = parsed.take("polarcap").unwrap();
        assert_eq!(pc.len(), 3);
        assert_eq!(pc.records()[2].get("absorption_forecast"), Some(&Value::from("green")));

        let flare = parsed.take("flare").unwrap();
        let first = &flare.records()[0];
        assert_eq!(flare.valid_f64(first, "whole_disk_class_m"), Some(30.0));
        assert_eq!(flare.valid_f64(first, "region_3663_class_c"), Some(99.0));
        assert_eq!(flare.valid_f64(&flare.records()[1], "region_3663_class_c"), None);

        let storm = parsed.take("stormprob").unwrap();
        assert_eq!(storm.valid_f64(&storm.records()[0], "mid_lat_major_severe_storm"), Some(1.0));
        assert_eq!(storm.coverage().end, day_start(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()));
    }

    #[test]
    fn predictions_without_dates_are_missing_marker() {
        let fill = FillDefaults::default();
        let cut = PREDICTIONS.replace(":Prediction_dates:", ":Dates:");
        let err = parse_predictions(&cut, &ctx(&fill, "prediction")).unwrap_err();
        assert!(err.is_missing_marker());
    }

    #[test]
    fn storm_field_names() {
        assert_eq!(storm_field("Mid/Major-Severe_Storm"), "mid_lat_major_severe_storm");
        assert_eq!(storm_field("High/Active"), "high_lat_active");
    }
}
