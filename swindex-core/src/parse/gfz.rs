//! GFZ Potsdam geomagnetic indices: the JSON web service and the WDC-format
//! `Kp_def`/`Kp_now` yearly files.

use super::text;
use super::{ParseContext, ParseError, Parsed};
use crate::domain::{day_start, FieldMeta, Record, SeriesBuilder};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

pub const JSON_FORMAT: &str = "gfz_json";
pub const WDC_FORMAT: &str = "gfz_kp_wdc";

const JSON_TIME: &str = "%Y-%m-%dT%H:%M:%SZ";

/// How one GFZ JSON index lands in a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GfzIndex {
    /// Name used by the web service, e.g. `Hp30`.
    pub name: &'static str,
    /// Series the values belong to.
    pub series: &'static str,
    pub field: &'static str,
    pub cadence_minutes: i64,
    pub units: &'static str,
    pub range: Option<(f64, f64)>,
    pub desc: &'static str,
}

const fn idx(
    name: &'static str,
    series: &'static str,
    field: &'static str,
    cadence_minutes: i64,
    units: &'static str,
    range: Option<(f64, f64)>,
    desc: &'static str,
) -> GfzIndex {
    GfzIndex {
        name,
        series,
        field,
        cadence_minutes,
        units,
        range,
        desc,
    }
}

pub const GFZ_INDICES: [GfzIndex; 12] = [
    idx("Kp", "kp", "Kp", 180, "", Some((0.0, 9.0)), "Planetary K index"),
    idx("ap", "ap", "ap", 180, "nT", Some((0.0, 400.0)), "3-hour equivalent planetary amplitude"),
    idx("Ap", "ap", "Ap", 1440, "nT", Some((0.0, 400.0)), "Daily equivalent planetary amplitude"),
    idx("Cp", "cp", "Cp", 1440, "", Some((0.0, 2.5)), "Daily planetary character figure"),
    idx("C9", "cp", "C9", 1440, "", Some((0.0, 9.0)), "C9 daily magnetic activity"),
    idx("Hp30", "hpo", "Hp30", 30, "", Some((0.0, f64::INFINITY)), "Half-hourly Hpo index"),
    idx("Hp60", "hpo", "Hp60", 60, "", Some((0.0, f64::INFINITY)), "Hourly Hpo index"),
    idx("ap30", "apo", "ap30", 30, "nT", Some((0.0, f64::INFINITY)), "Half-hourly apo index"),
    idx("ap60", "apo", "ap60", 60, "nT", Some((0.0, f64::INFINITY)), "Hourly apo index"),
    idx("SN", "ssn", "ssn", 1440, "", Some((0.0, f64::INFINITY)), "International sunspot number"),
    idx("Fobs", "f107", "f107", 1440, "SFU", None, "Observed 10.7 cm solar radio flux"),
    idx("Fadj", "f107", "f107_adj", 1440, "SFU", None, "Adjusted 10.7 cm solar radio flux"),
];

/// Lookup by web-service name.
pub fn gfz_index(name: &str) -> Option<&'static GfzIndex> {
    GFZ_INDICES.iter().find(|i| i.name == name)
}

// ─── JSON web service ───────────────────────────────────────────────

/// One web-service response: `datetime`, the requested index column and an
/// optional `status` column.
#[derive(Debug, Deserialize)]
struct JsonResponse {
    datetime: Option<Vec<String>>,
    status: Option<Vec<String>>,
    #[serde(flatten)]
    columns: BTreeMap<String, serde_json::Value>,
}

/// Parse one JSON response. The index name comes from `ctx.variant`.
///
/// Null entries are stored as fill. A `status` array, when present, is kept
/// as a text field.
pub fn parse_json(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    const F: &str = JSON_FORMAT;
    let index = gfz_index(ctx.variant)
        .ok_or_else(|| ParseError::invalid(F, format!("unknown GFZ index '{}'", ctx.variant)))?;

    let mut raw: JsonResponse =
        serde_json::from_str(payload).map_err(|source| ParseError::Json { format: F, source })?;
    let times = raw.datetime.ok_or_else(|| ParseError::missing(F, "datetime"))?;
    let column = raw
        .columns
        .remove(index.name)
        .ok_or_else(|| ParseError::missing(F, index.name))?;
    let values: Vec<Option<f64>> = serde_json::from_value(column)
        .map_err(|e| ParseError::invalid(F, format!("'{}' is not an array of numbers: {e}", index.name)))?;
    if values.len() != times.len() {
        return Err(ParseError::invalid(
            F,
            format!("{} datetimes but {} {} values", times.len(), values.len(), index.name),
        ));
    }
    if raw.status.as_ref().is_some_and(|s| s.len() != times.len()) {
        return Err(ParseError::invalid(F, "status does not match datetime"));
    }

    let mut meta = ctx.meta(F, index.field, index.units, index.desc);
    if let Some((min, max)) = index.range {
        meta = meta.with_range(min, max);
    }
    let fill = meta.fill.clone();
    let mut builder = SeriesBuilder::new(
        index.series,
        ctx.source(index.series),
        Duration::minutes(index.cadence_minutes),
    )
    .field(index.field, meta);
    if raw.status.is_some() {
        builder.declare("status", FieldMeta::new("", "def (definitive) or now (nowcast)", ""));
    }

    for (i, (time, value)) in times.iter().zip(values).enumerate() {
        let stamp = NaiveDateTime::parse_from_str(time, JSON_TIME)
            .map_err(|_| ParseError::invalid(F, format!("bad datetime '{time}'")))?;
        let mut record = Record::new(Utc.from_utc_datetime(&stamp));
        match value {
            Some(v) => record.set(index.field, v),
            None => record.set(index.field, fill.clone()),
        }
        if let Some(status) = &raw.status {
            record.set("status", status[i].as_str());
        }
        builder.push(record);
    }

    let series = builder
        .build()
        .map_err(|source| ParseError::Series { format: F, source })?;
    Ok(Parsed::single(series))
}

// ─── WDC Kp files ───────────────────────────────────────────────────

const WDC_LINE_LEN: usize = 62;

fn thirds(c: char) -> Option<f64> {
    match c {
        '0' => Some(0.0),
        '3' => Some(1.0 / 3.0),
        '7' => Some(2.0 / 3.0),
        _ => None,
    }
}

/// Ones digit (blank reads as zero) followed by a thirds character.
fn kp_cell(ones: &str, third: char) -> Option<f64> {
    let ones = match ones.trim() {
        "" => 0.0,
        s => s.parse::<f64>().ok()?,
    };
    Some(ones + thirds(third)?)
}

/// Parse a `Kp_defYYYY.wdc` or `Kp_nowYYYY.wdc` file into `kp`, `ap` and `cp`.
///
/// Two-digit years take their century from `ctx.file_date`.
pub fn parse_kp_wdc(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    const F: &str = WDC_FORMAT;
    let century = ctx.file_date.year() / 100 * 100;
    let three_hours = Duration::hours(3);

    let mut kp = SeriesBuilder::new("kp", ctx.source("kp"), three_hours)
        .field("Kp", ctx.meta(F, "Kp", "", "Planetary K index").with_range(0.0, 9.0))
        .field("Bartels_solar_rotation_num", FieldMeta::new("", "Bartels solar rotation number", -1.0))
        .field("day_within_Bartels_rotation", FieldMeta::new("", "Day within Bartels rotation", -1.0))
        .field("daily_Kp_sum", ctx.meta(F, "daily_Kp_sum", "", "Sum of the day's eight Kp values"));
    let mut ap = SeriesBuilder::new("ap", ctx.source("ap"), three_hours)
        .field("ap", ctx.meta(F, "ap", "nT", "3-hour equivalent planetary amplitude").with_range(0.0, 400.0))
        .field("daily_Ap", ctx.meta(F, "daily_Ap", "nT", "Daily equivalent planetary amplitude"));
    let mut cp = SeriesBuilder::new("cp", ctx.source("cp"), Duration::days(1))
        .field("Cp", ctx.meta(F, "Cp", "", "Daily planetary character figure").with_range(0.0, 2.5))
        .field("C9", ctx.meta(F, "C9", "", "C9 daily magnetic activity").with_range(0.0, 9.0));

    for (no, line) in text::content_lines(payload) {
        if line.len() < WDC_LINE_LEN || !line.is_ascii() {
            return Err(ParseError::malformed(F, no, line, "not a WDC Kp record"));
        }
        let bad = move |what: &str| ParseError::malformed(F, no, line, format!("bad {what}"));
        let field = move |start: usize, end: usize| line.get(start..end).ok_or_else(|| bad("columns"));
        let int = move |start: usize, end: usize, what: &str| -> Result<i32, ParseError> {
            field(start, end)?.trim().parse().map_err(|_| bad(what))
        };

        let date = NaiveDate::from_ymd_opt(
            century + int(0, 2, "year")?,
            int(2, 4, "month")? as u32,
            int(4, 6, "day")? as u32,
        )
        .ok_or_else(|| bad("date"))?;
        let midnight = day_start(date);
        let bartels = f64::from(int(6, 10, "Bartels rotation")?);
        let bartels_day = f64::from(int(10, 12, "Bartels day")?);
        let cells = line.as_bytes();
        let kp_sum = kp_cell(field(28, 30)?, char::from(cells[30])).ok_or_else(|| bad("Kp sum"))?;
        let daily_ap = f64::from(int(55, 58, "Ap")?);
        let cp_value: f64 = field(58, 61)?.trim().parse().map_err(|_| bad("Cp"))?;
        let c9 = f64::from(int(61, 62, "C9")?);

        for slot in 0..8 {
            let ones = field(12 + 2 * slot, 13 + 2 * slot)?;
            let kp_value = kp_cell(ones, char::from(cells[13 + 2 * slot])).ok_or_else(|| bad("Kp"))?;
            let ap_value = f64::from(int(31 + 3 * slot, 34 + 3 * slot, "ap")?);
            let time = midnight + Duration::hours(3 * slot as i64);
            kp.push(
                Record::new(time)
                    .with("Kp", kp_value)
                    .with("Bartels_solar_rotation_num", bartels)
                    .with("day_within_Bartels_rotation", bartels_day)
                    .with("daily_Kp_sum", kp_sum),
            );
            ap.push(Record::new(time).with("ap", ap_value).with("daily_Ap", daily_ap));
        }
        cp.push(Record::new(midnight).with("Cp", cp_value).with("C9", c9));
    }

    let mut out = Parsed::new();
    for builder in [kp, ap, cp] {
        out.insert(
            builder
                .build()
                .map_err(|source| ParseError::Series { format: F, source })?,
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FillDefaults;
    use crate::domain::Value;

    fn ctx<'a>(fill: &'a FillDefaults, tag: &'a str, variant: &'a str) -> ParseContext<'a> {
        ParseContext::new(fill, tag, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).with_variant(variant)
    }

    const WDC: &str = "\
#                         PURPOSE: This file distributes the Kp index
#  YYMMDD BBBB DD KP...
2401012597 110131720232730 7153  4  5  6  7  9 12 15  3  80.42
2401022597 20003071010130703 53  0  2  3  4  4  5  3  2  30.10
";

    #[test]
    fn wdc_lines_expand_to_three_hour_records() {
        let fill = FillDefaults::default();
        let mut parsed = parse_kp_wdc(WDC, &ctx(&fill, "def", "")).unwrap();

        let kp = parsed.take("kp").unwrap();
        assert_eq!(kp.len(), 16);
        assert_eq!(kp.source().as_str(), "kp_def");
        let values: Vec<f64> = kp.valid_values("Kp").take(8).map(|(_, v)| v.unwrap()).collect();
        let expected = [1.0, 4.0 / 3.0, 5.0 / 3.0, 2.0, 7.0 / 3.0, 8.0 / 3.0, 3.0, 2.0 / 3.0];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-12);
        }
        let first = &kp.records()[0];
        assert_eq!(first.get("Bartels_solar_rotation_num"), Some(&Value::Number(2597.0)));
        let sum = kp.valid_f64(first, "daily_Kp_sum").unwrap();
        assert!((sum - (15.0 + 1.0 / 3.0)).abs() < 1e-12);

        let ap = parsed.take("ap").unwrap();
        assert_eq!(ap.valid_f64(&ap.records()[6], "ap"), Some(15.0));
        assert_eq!(ap.valid_f64(&ap.records()[9], "daily_Ap"), Some(3.0));

        let cp = parsed.take("cp").unwrap();
        assert_eq!(cp.len(), 2);
        assert_eq!(cp.valid_f64(&cp.records()[0], "Cp"), Some(0.4));
        assert_eq!(cp.valid_f64(&cp.records()[0], "C9"), Some(2.0));
        assert_eq!(cp.records()[1].time, day_start(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
    }

    #[test]
    fn wdc_short_line_is_malformed() {
        let fill = FillDefaults::default();
        let err = parse_kp_wdc("2401012597 1101317\n", &ctx(&fill, "def", "")).unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn wdc_bad_thirds_character_is_malformed() {
        let fill = FillDefaults::default();
        let bad = WDC.replace("2401012597 11013", "2401012597 11015");
        assert!(parse_kp_wdc(&bad, &ctx(&fill, "def", "")).is_err());
    }

    #[test]
    fn json_with_nulls_and_status() {
        let fill = FillDefaults::default();
        let payload = r#"{
            "meta": "CC BY 4.0",
            "datetime": ["2024-01-01T00:00:00Z", "2024-01-01T03:00:00Z", "2024-01-01T06:00:00Z"],
            "Kp": [1.333, null, 2.0],
            "status": ["def", "def", "now"]
        }"#;
        let parsed = parse_json(payload, &ctx(&fill, "now", "Kp")).unwrap();
        let kp = parsed.get("kp").unwrap();
        assert_eq!(kp.len(), 3);
        assert_eq!(kp.records()[1].get("Kp"), Some(&Value::Number(-1.0)));
        assert_eq!(kp.valid_f64(&kp.records()[1], "Kp"), None);
        assert_eq!(kp.records()[2].get("status"), Some(&Value::from("now")));
        assert_eq!(kp.coverage().end, Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn json_index_mapping() {
        let fill = FillDefaults::default();
        let payload = r#"{"datetime": ["2024-01-01T00:30:00Z"], "Hp30": [0.667]}"#;
        let parsed = parse_json(payload, &ctx(&fill, "now", "Hp30")).unwrap();
        let hpo = parsed.get("hpo").unwrap();
        assert!(hpo.field("Hp30").is_some());
        assert!(hpo.field("status").is_none());
        assert_eq!(gfz_index("Fadj").map(|i| i.field), Some("f107_adj"));
    }

    #[test]
    fn json_empty_arrays_are_empty_series() {
        let fill = FillDefaults::default();
        let parsed = parse_json(r#"{"datetime": [], "ap": []}"#, &ctx(&fill, "def", "ap")).unwrap();
        assert!(parsed.get("ap").unwrap().is_empty());
    }

    #[test]
    fn json_missing_keys_are_rejected() {
        let fill = FillDefaults::default();
        let err = parse_json(r#"{"datetime": []}"#, &ctx(&fill, "def", "Kp")).unwrap_err();
        assert!(err.is_missing_marker());
        let err = parse_json("{not json", &ctx(&fill, "def", "Kp")).unwrap_err();
        assert!(matches!(err, ParseError::Json { .. }));
        let err = parse_json(r#"{"datetime": [], "Kp": []}"#, &ctx(&fill, "def", "nope")).unwrap_err();
        assert!(matches!(err, ParseError::Invalid { .. }));
        let err = parse_json(r#"{"Kp": [1.0]}"#, &ctx(&fill, "def", "Kp")).unwrap_err();
        assert!(err.is_missing_marker());
    }

    #[test]
    fn json_non_numeric_values_are_rejected() {
        let fill = FillDefaults::default();
        let payload = r#"{"datetime": ["2024-01-01T00:00:00Z"], "Kp": ["high"]}"#;
        let err = parse_json(payload, &ctx(&fill, "def", "Kp")).unwrap_err();
        assert!(matches!(err, ParseError::Invalid { .. }));

        let payload = r#"{"datetime": ["2024-01-01T00:00:00Z"], "Kp": [1.0], "status": []}"#;
        let err = parse_json(payload, &ctx(&fill, "def", "Kp")).unwrap_err();
        assert!(matches!(err, ParseError::Invalid { .. }));
    }
}
