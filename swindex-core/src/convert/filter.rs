use crate::domain::Series;
use chrono::Duration;

/// Drop records of `target` that follow disturbed geomagnetic conditions.
///
/// Every valid Kp value outside `[min_kp, max_kp]` at time `t` removes the
/// target records in `[t, t + filter_hours)`. Fill Kp values are ignored.
pub fn filter_geomag(
    target: &Series,
    kp: &Series,
    kp_field: &str,
    min_kp: f64,
    max_kp: f64,
    filter_hours: i64,
) -> Series {
    let window = Duration::hours(filter_hours);
    let disturbed: Vec<_> = kp
        .valid_values(kp_field)
        .filter_map(|(t, v)| v.filter(|v| *v < min_kp || *v > max_kp).map(|_| t))
        .collect();

    target.retain(|r| !disturbed.iter().any(|t| *t <= r.time && r.time < *t + window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldMeta, Record, SeriesBuilder, SourceId};
    use chrono::{TimeZone, Utc};

    fn hourly(name: &str, field: &str, n: i64, step: i64, value: impl Fn(i64) -> f64) -> Series {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let source = SourceId(format!("{name}_test"));
        let mut b = SeriesBuilder::new(name, source, Duration::hours(step))
            .field(field, FieldMeta::new("", field, -1.0));
        for i in 0..n {
            b.push(Record::new(start + Duration::hours(i * step)).with(field, value(i)));
        }
        b.build().unwrap()
    }

    #[test]
    fn removes_window_after_storm() {
        let target = hourly("dst", "dst", 12, 1, |i| i as f64);
        // Kp 7 in the second 3-hour slot (03:00)
        let kp = hourly("kp", "Kp", 4, 3, |i| if i == 1 { 7.0 } else { 1.0 });
        let out = filter_geomag(&target, &kp, "Kp", 0.0, 3.0, 3);
        let hours: Vec<_> = out.valid_values("dst").map(|(_, v)| v.unwrap()).collect();
        assert_eq!(hours, vec![0.0, 1.0, 2.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn fill_kp_never_filters() {
        let target = hourly("dst", "dst", 6, 1, |i| i as f64);
        let kp = hourly("kp", "Kp", 2, 3, |_| -1.0);
        assert_eq!(filter_geomag(&target, &kp, "Kp", 0.0, 3.0, 3).len(), 6);
    }
}
