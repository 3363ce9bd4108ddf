//! Ready-made combinations for the indices that have several latency tiers.

use super::{combine, CombineError, CombineOptions};
use crate::domain::{Series, SourcePriority, TimeRange};

/// 3-hourly Kp from definitive, nowcast, recent and forecast tiers.
pub fn combine_kp(inputs: &[&Series], range: TimeRange) -> Result<Series, CombineError> {
    combine(
        inputs,
        &SourcePriority::kp_default(),
        range,
        &CombineOptions::fields(["Kp"]),
    )
}

/// Daily F10.7 from historic, preliminary, daily and forecast tiers.
pub fn combine_f107(inputs: &[&Series], range: TimeRange) -> Result<Series, CombineError> {
    combine(
        inputs,
        &SourcePriority::f107_default(),
        range,
        &CombineOptions::fields(["f107"]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldMeta, Record, SeriesBuilder};
    use chrono::{Duration, NaiveDate};

    fn f107(source: &str, days: &[(u32, f64)]) -> Series {
        let mut b = SeriesBuilder::new("f107", source.into(), Duration::days(1))
            .field("f107", FieldMeta::new("SFU", "F10.7", -99999.0));
        for (d, v) in days {
            let date = NaiveDate::from_ymd_opt(2024, 5, *d).unwrap();
            b.push(Record::new(crate::domain::day_start(date)).with("f107", *v));
        }
        b.build().unwrap()
    }

    #[test]
    fn historic_then_forecast() {
        let historic = f107("f107_historic", &[(1, 150.0), (2, 151.0)]);
        let forecast = f107("f107_forecast", &[(2, 170.0), (3, 172.0), (4, 175.0)]);
        let range = TimeRange::from_dates(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
        );
        let out = combine_f107(&[&forecast, &historic], range).unwrap();
        let vals: Vec<_> = out.valid_values("f107").map(|(_, v)| v.unwrap()).collect();
        assert_eq!(vals, vec![150.0, 151.0, 172.0]);
        assert_eq!(out.source().as_str(), "f107_combined");
    }

    #[test]
    fn kp_requires_a_kp_field() {
        let s = f107("kp_def", &[(1, 1.0)]);
        let range = TimeRange::from_dates(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
        );
        assert_eq!(
            combine_kp(&[&s], range).unwrap_err(),
            CombineError::MissingField("Kp".into())
        );
    }
}
