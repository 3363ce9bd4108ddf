//! ACE SWEPAM normalisation to the hourly OMNI plasma scale.
//!
//! Density is scaled by a factor that depends on bulk speed and on the
//! fractional years since 1998.0; 2019 to 2021 use a speed-independent
//! power law instead. Temperature is a power law with separate coefficients
//! for 2019. Coefficients are those published with the OMNI processing notes
//! (<https://omniweb.gsfc.nasa.gov/html/omni_min_data.html>).

use super::ConversionError;
use crate::domain::{FieldMeta, Series, SeriesError, Timestamp, Value};
use chrono::{Datelike, NaiveDate, TimeZone, Utc};

/// Output field suffix.
const NORM_SUFFIX: &str = "_norm";

const SLOW_WIND: f64 = 395.0;
const FAST_WIND: f64 = 405.0;

/// Calendar span (decimal years, inclusive) of the speed-independent density fit.
const DENS_FIT_YEARS: (f64, f64) = (2019.0, 2021.0);
/// Calendar span (decimal years, inclusive) of the alternate temperature fit.
const TEMP_FIT_YEARS: (f64, f64) = (2019.0, 2020.0);

fn year_start(year: i32) -> Option<Timestamp> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| Utc.from_utc_datetime(&d))
}

/// `2024-07-02T00:00Z` is about 2024.5.
fn decimal_year(time: Timestamp) -> f64 {
    let year = time.year();
    match (year_start(year), year_start(year + 1)) {
        (Some(start), Some(next)) => {
            let elapsed = (time - start).num_seconds() as f64;
            let length = (next - start).num_seconds() as f64;
            year as f64 + elapsed / length
        }
        _ => year as f64,
    }
}

fn within((lo, hi): (f64, f64), year: f64) -> bool {
    (lo..=hi).contains(&year)
}

/// Normalised proton density, or `None` when an input is missing.
fn norm_density(dens: Option<f64>, speed: Option<f64>, year: f64) -> Option<f64> {
    let n = dens?;
    if within(DENS_FIT_YEARS, year) {
        return Some(10f64.powf(-0.010 + 1.006 * n.log10()));
    }
    let v = speed?;
    let yt = year - 1998.0;
    let factor = if v < SLOW_WIND {
        0.925 + 0.0039 * yt
    } else if v <= FAST_WIND {
        (74.02 - 0.164 * v + 0.0171 * v * yt - 6.72 * yt) / 10.0
    } else {
        0.761 + 0.0210 * yt
    };
    Some(n * factor)
}

fn norm_temperature(temp: Option<f64>, year: f64) -> Option<f64> {
    let t = temp?;
    let (a, b) = if within(TEMP_FIT_YEARS, year) {
        (0.266, 0.947)
    } else {
        (-0.069, 1.024)
    };
    Some(10f64.powf(a + b * t.log10()))
}

fn norm_meta(src: &FieldMeta) -> FieldMeta {
    let mut meta = src.clone();
    meta.desc = format!("{}, normalized for hourly OMNI", src.desc);
    meta
}

/// Add `{dens_field}_norm` and `{temp_field}_norm` to a SWEPAM series.
///
/// Records where an input is fill get the source field's fill. The source
/// fields are kept unchanged.
pub fn ace_swepam_hourly_omni_norm(
    series: &Series,
    speed_field: &str,
    dens_field: &str,
    temp_field: &str,
) -> Result<Series, ConversionError> {
    let mut metas = Vec::with_capacity(3);
    for name in [speed_field, dens_field, temp_field] {
        metas.push(
            series
                .field(name)
                .ok_or_else(|| SeriesError::MissingField(name.to_string()))?,
        );
    }
    let (dens_meta, temp_meta) = (metas[1], metas[2]);

    let mut dens_norm = Vec::with_capacity(series.len());
    let mut temp_norm = Vec::with_capacity(series.len());
    for record in series.records() {
        let year = decimal_year(record.time);
        let speed = series.valid_f64(record, speed_field);
        let dens = series.valid_f64(record, dens_field);
        let temp = series.valid_f64(record, temp_field);
        dens_norm.push(norm_density(dens, speed, year).map_or_else(|| dens_meta.fill.clone(), Value::Number));
        temp_norm.push(norm_temperature(temp, year).map_or_else(|| temp_meta.fill.clone(), Value::Number));
    }

    let out = series.with_field(&format!("{dens_field}{NORM_SUFFIX}"), norm_meta(dens_meta), dens_norm)?;
    Ok(out.with_field(&format!("{temp_field}{NORM_SUFFIX}"), norm_meta(temp_meta), temp_norm)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Record, SeriesBuilder};
    use chrono::Duration;

    const DENS: &str = "sw_proton_dens";
    const SPEED: &str = "sw_bulk_speed";
    const TEMP: &str = "sw_ion_temp";

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn swepam(rows: &[(Timestamp, f64, f64, f64)]) -> Series {
        let mut b = SeriesBuilder::new("ace_swepam", "ace_swepam_historic".into(), Duration::minutes(1))
            .field(DENS, FieldMeta::new("p/cc", "Solar wind proton density", -9999.9))
            .field(SPEED, FieldMeta::new("km/s", "Solar wind bulk speed", -9999.9))
            .field(TEMP, FieldMeta::new("K", "Solar wind ion temperature", -1.0e5));
        for &(time, n, v, t) in rows {
            b.push(Record::new(time).with(DENS, n).with(SPEED, v).with(TEMP, t));
        }
        b.build().unwrap()
    }

    fn close(got: Option<f64>, want: f64, tol: f64) {
        let got = got.unwrap_or_else(|| panic!("expected {want}, got fill"));
        assert!((got - want).abs() < tol, "got {got}, want {want}");
    }

    #[test]
    fn density_scales_by_speed_band() {
        let s = swepam(&[
            (at(2024, 1, 1), 5.0, 350.0, 1.0e5),
            (at(2024, 1, 1) + Duration::minutes(1), 5.0, 400.0, 1.0e5),
            (at(2024, 1, 1) + Duration::minutes(2), 5.0, 500.0, 1.0e5),
        ]);
        let out = ace_swepam_hourly_omni_norm(&s, SPEED, DENS, TEMP).unwrap();
        let norm = |i: usize| out.valid_f64(&out.records()[i], "sw_proton_dens_norm");
        // 26 years after 1998.0
        close(norm(0), 5.0 * 1.0264, 1e-6);
        close(norm(1), 5.0 * 1.154, 1e-6);
        close(norm(2), 5.0 * 1.307, 1e-6);
        assert_eq!(out.valid_f64(&out.records()[0], DENS), Some(5.0));
    }

    #[test]
    fn band_edges_use_the_middle_fit() {
        let s = swepam(&[(at(2024, 1, 1), 2.0, SLOW_WIND, 1.0e5), (at(2024, 1, 2), 2.0, FAST_WIND, 1.0e5)]);
        let out = ace_swepam_hourly_omni_norm(&s, SPEED, DENS, TEMP).unwrap();
        let yt = decimal_year(at(2024, 1, 2)) - 1998.0;
        let mid = |v: f64, yt: f64| (74.02 - 0.164 * v + 0.0171 * v * yt - 6.72 * yt) / 10.0;
        close(out.valid_f64(&out.records()[0], "sw_proton_dens_norm"), 2.0 * mid(SLOW_WIND, 26.0), 1e-9);
        close(out.valid_f64(&out.records()[1], "sw_proton_dens_norm"), 2.0 * mid(FAST_WIND, yt), 1e-9);
    }

    #[test]
    fn temperature_and_density_fits_by_year() {
        let s = swepam(&[
            (at(2020, 6, 1), 10.0, 600.0, 1.0e5),
            (at(2021, 1, 1), 10.0, 600.0, 1.0e5),
            (at(2024, 1, 1), 10.0, 600.0, 1.0e5),
        ]);
        let out = ace_swepam_hourly_omni_norm(&s, SPEED, DENS, TEMP).unwrap();
        let dens = |i: usize| out.valid_f64(&out.records()[i], "sw_proton_dens_norm");
        let temp = |i: usize| out.valid_f64(&out.records()[i], "sw_ion_temp_norm");

        // speed-independent density fit for 2019.0 to 2021.0
        close(dens(0), 9.90832, 1e-4);
        close(dens(1), 9.90832, 1e-4);
        close(dens(2), 10.0 * 1.307, 1e-6);
        // alternate temperature fit only through 2020.0
        close(temp(0), 112_460.4, 1.0);
        close(temp(1), 112_460.4, 1.0);
        close(temp(2), 112_460.4, 1.0);

        let early = swepam(&[(at(2019, 6, 1), 10.0, 600.0, 1.0e5)]);
        let out = ace_swepam_hourly_omni_norm(&early, SPEED, DENS, TEMP).unwrap();
        close(out.valid_f64(&out.records()[0], "sw_ion_temp_norm"), 100_230.5, 1.0);
    }

    #[test]
    fn fill_inputs_give_fill_outputs() {
        let s = swepam(&[(at(2024, 1, 1), 5.0, -9999.9, -1.0e5), (at(2020, 1, 1), 5.0, -9999.9, 1.0e5)]);
        let out = ace_swepam_hourly_omni_norm(&s, SPEED, DENS, TEMP).unwrap();
        let first = &out.records()[0];
        assert_eq!(first.get("sw_proton_dens_norm"), Some(&Value::Number(-9999.9)));
        assert_eq!(first.get("sw_ion_temp_norm"), Some(&Value::Number(-1.0e5)));
        // the 2019 to 2021 density fit ignores speed
        assert!(out.valid_f64(&out.records()[1], "sw_proton_dens_norm").is_some());
        assert!(out.field("sw_ion_temp_norm").unwrap().desc.ends_with("normalized for hourly OMNI"));
    }

    #[test]
    fn missing_input_field_is_an_error() {
        let mut b = SeriesBuilder::new("ace_swepam", "ace_swepam_historic".into(), Duration::minutes(1))
            .field(DENS, FieldMeta::new("p/cc", "density", -9999.9));
        b.push(Record::new(at(2024, 1, 1)).with(DENS, 1.0));
        let err = ace_swepam_hourly_omni_norm(&b.build().unwrap(), SPEED, DENS, TEMP).unwrap_err();
        assert_eq!(err, ConversionError::Series(SeriesError::MissingField(SPEED.to_string())));
    }

    #[test]
    fn decimal_year_midpoint() {
        assert_eq!(decimal_year(at(2024, 1, 1)), 2024.0);
        let mid = decimal_year(Utc.with_ymd_and_hms(2023, 7, 2, 12, 0, 0).unwrap());
        assert!((mid - 2023.5).abs() < 1e-9);
    }
}
