//! Series: time-ordered records for one index from one source.
//!
//! Invariants held by every constructed `Series`:
//! - record timestamps are strictly increasing
//! - every timestamp lies inside the coverage interval `[start, end)`
//! - every record carries every declared field (absent fields are stored as fill)

use super::ids::SourceId;
use super::value::Value;
use super::Timestamp;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("timestamps not strictly increasing: {next} follows {prev}")]
    NotIncreasing { prev: Timestamp, next: Timestamp },

    #[error("record at {time} lies outside coverage [{start}, {end})")]
    OutsideCoverage {
        time: Timestamp,
        start: Timestamp,
        end: Timestamp,
    },

    #[error("record at {time} carries undeclared field '{field}'")]
    UndeclaredField { time: Timestamp, field: String },

    #[error("field '{0}' is not present in the series")]
    MissingField(String),

    #[error("field '{0}' already exists")]
    FieldExists(String),

    #[error("expected {expected} values for field '{field}', got {actual}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn empty_at(at: Timestamp) -> Self {
        Self { start: at, end: at }
    }

    /// Whole days from `first` through `last` inclusive.
    pub fn from_dates(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: super::day_start(first),
            end: super::day_start(last) + Duration::days(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t < self.end
    }

    pub fn intersect(&self, other: &TimeRange) -> TimeRange {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end <= start {
            TimeRange::empty_at(start)
        } else {
            TimeRange { start, end }
        }
    }

    /// Smallest interval containing both. Empty ranges are ignored.
    pub fn hull(&self, other: &TimeRange) -> TimeRange {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => *other,
            (_, true) => *self,
            _ => TimeRange {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            },
        }
    }
}

/// Per-field metadata, including the fill marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub units: String,
    pub desc: String,
    pub fill: Value,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldMeta {
    pub fn new(units: &str, desc: &str, fill: impl Into<Value>) -> Self {
        Self {
            units: units.to_string(),
            desc: desc.to_string(),
            fill: fill.into(),
            min: None,
            max: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// True for the declared fill value and for NaN.
    pub fn is_fill(&self, value: &Value) -> bool {
        *value == self.fill || matches!(value, Value::Number(v) if v.is_nan())
    }

    /// Numeric value if it is not fill.
    pub fn valid_f64(&self, value: &Value) -> Option<f64> {
        if self.is_fill(value) {
            None
        } else {
            value.as_f64()
        }
    }

    pub fn in_range(&self, v: f64) -> bool {
        self.min.map_or(true, |m| v >= m) && self.max.map_or(true, |m| v <= m)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub time: Timestamp,
    pub values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(time: Timestamp) -> Self {
        Self {
            time,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.values.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    index: String,
    source: SourceId,
    coverage: TimeRange,
    fields: BTreeMap<String, FieldMeta>,
    records: Vec<Record>,
}

impl Series {
    /// Build a series, checking ordering and coverage and filling absent fields.
    pub fn new(
        index: impl Into<String>,
        source: SourceId,
        coverage: TimeRange,
        fields: BTreeMap<String, FieldMeta>,
        mut records: Vec<Record>,
    ) -> Result<Self, SeriesError> {
        let mut prev: Option<Timestamp> = None;
        for record in &mut records {
            if let Some(p) = prev {
                if record.time <= p {
                    return Err(SeriesError::NotIncreasing {
                        prev: p,
                        next: record.time,
                    });
                }
            }
            prev = Some(record.time);

            if !coverage.contains(record.time) {
                return Err(SeriesError::OutsideCoverage {
                    time: record.time,
                    start: coverage.start,
                    end: coverage.end,
                });
            }
            if let Some(field) = record.values.keys().find(|k| !fields.contains_key(*k)) {
                return Err(SeriesError::UndeclaredField {
                    time: record.time,
                    field: field.clone(),
                });
            }
            for (name, meta) in &fields {
                record
                    .values
                    .entry(name.clone())
                    .or_insert_with(|| meta.fill.clone());
            }
        }

        Ok(Self {
            index: index.into(),
            source,
            coverage,
            fields,
            records,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn coverage(&self) -> TimeRange {
        self.coverage
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldMeta> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.get(name)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, time: Timestamp) -> Option<&Record> {
        self.records
            .binary_search_by_key(&time, |r| r.time)
            .ok()
            .map(|i| &self.records[i])
    }

    /// Numeric value of `field` in `record`, `None` when it is fill or not numeric.
    pub fn valid_f64(&self, record: &Record, field: &str) -> Option<f64> {
        let meta = self.fields.get(field)?;
        record.get(field).and_then(|v| meta.valid_f64(v))
    }

    /// `(time, value)` pairs for one field with fill mapped to `None`.
    pub fn valid_values<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = (Timestamp, Option<f64>)> + 'a {
        self.records
            .iter()
            .map(move |r| (r.time, self.valid_f64(r, field)))
    }

    /// Copy restricted to `range`. Coverage becomes the intersection.
    pub fn bounded(&self, range: &TimeRange) -> Series {
        let coverage = self.coverage.intersect(range);
        Series {
            index: self.index.clone(),
            source: self.source.clone(),
            coverage,
            fields: self.fields.clone(),
            records: self
                .records
                .iter()
                .filter(|r| coverage.contains(r.time))
                .cloned()
                .collect(),
        }
    }

    /// Copy with an extra field, one value per record in order.
    pub fn with_field(
        &self,
        name: &str,
        meta: FieldMeta,
        values: Vec<Value>,
    ) -> Result<Series, SeriesError> {
        if self.fields.contains_key(name) {
            return Err(SeriesError::FieldExists(name.to_string()));
        }
        if values.len() != self.records.len() {
            return Err(SeriesError::LengthMismatch {
                field: name.to_string(),
                expected: self.records.len(),
                actual: values.len(),
            });
        }
        let mut out = self.clone();
        out.fields.insert(name.to_string(), meta);
        for (record, value) in out.records.iter_mut().zip(values) {
            record.values.insert(name.to_string(), value);
        }
        Ok(out)
    }

    /// Keep only records matching `keep`. Coverage is unchanged.
    pub fn retain(&self, mut keep: impl FnMut(&Record) -> bool) -> Series {
        let mut out = self.clone();
        out.records.retain(|r| keep(r));
        out
    }

    /// Rewrite record values in place. Timestamps cannot be touched.
    pub fn map_values(
        mut self,
        mut f: impl FnMut(Timestamp, &BTreeMap<String, FieldMeta>, &mut BTreeMap<String, Value>),
    ) -> Series {
        for record in &mut self.records {
            f(record.time, &self.fields, &mut record.values);
        }
        self
    }

    pub fn with_source(mut self, source: SourceId) -> Series {
        self.source = source;
        self
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Incremental construction used by the parsers.
#[derive(Debug)]
pub struct SeriesBuilder {
    index: String,
    source: SourceId,
    cadence: Duration,
    coverage: Option<TimeRange>,
    fields: BTreeMap<String, FieldMeta>,
    records: Vec<Record>,
}

impl SeriesBuilder {
    /// `cadence` is the sample spacing; it closes the coverage after the last record.
    pub fn new(index: &str, source: SourceId, cadence: Duration) -> Self {
        Self {
            index: index.to_string(),
            source,
            cadence,
            coverage: None,
            fields: BTreeMap::new(),
            records: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, meta: FieldMeta) -> Self {
        self.declare(name, meta);
        self
    }

    pub fn declare(&mut self, name: &str, meta: FieldMeta) {
        self.fields.entry(name.to_string()).or_insert(meta);
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn coverage(mut self, range: TimeRange) -> Self {
        self.coverage = Some(range);
        self
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Merge values into the record at `time`, creating it if needed.
    pub fn upsert(&mut self, time: Timestamp, field: &str, value: impl Into<Value>) {
        match self.records.iter_mut().rev().find(|r| r.time == time) {
            Some(record) => record.set(field, value),
            None => self.records.push(Record::new(time).with(field, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn build(mut self) -> Result<Series, SeriesError> {
        self.records.sort_by_key(|r| r.time);
        let coverage = match (self.coverage, self.records.first(), self.records.last()) {
            (Some(c), _, _) => c,
            (None, Some(first), Some(last)) => TimeRange::new(first.time, last.time + self.cadence),
            _ => TimeRange::empty_at(DateTime::<Utc>::MIN_UTC),
        };
        Series::new(self.index, self.source, coverage, self.fields, self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    fn kp_fields() -> BTreeMap<String, FieldMeta> {
        let mut f = BTreeMap::new();
        f.insert("Kp".to_string(), FieldMeta::new("", "Kp", -1.0).with_range(0.0, 9.0));
        f
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let records = vec![Record::new(t(0)).with("Kp", 1.0), Record::new(t(0)).with("Kp", 2.0)];
        let err = Series::new("kp", "kp_def".into(), TimeRange::new(t(0), t(3)), kp_fields(), records)
            .unwrap_err();
        assert!(matches!(err, SeriesError::NotIncreasing { .. }));
    }

    #[test]
    fn rejects_records_outside_coverage() {
        let records = vec![Record::new(t(6)).with("Kp", 1.0)];
        let err = Series::new("kp", "kp_def".into(), TimeRange::new(t(0), t(6)), kp_fields(), records)
            .unwrap_err();
        assert!(matches!(err, SeriesError::OutsideCoverage { .. }));
    }

    #[test]
    fn rejects_undeclared_fields() {
        let records = vec![Record::new(t(0)).with("Ap", 4.0)];
        let err = Series::new("kp", "kp_def".into(), TimeRange::new(t(0), t(3)), kp_fields(), records)
            .unwrap_err();
        assert!(matches!(err, SeriesError::UndeclaredField { .. }));
    }

    #[test]
    fn absent_fields_are_stored_as_fill() {
        let mut fields = kp_fields();
        fields.insert("Ap".into(), FieldMeta::new("nT", "ap", f64::NAN));
        let records = vec![Record::new(t(0)).with("Kp", 1.0)];
        let s = Series::new("kp", "kp_def".into(), TimeRange::new(t(0), t(3)), fields, records)
            .unwrap();
        assert_eq!(s.records()[0].get("Ap"), Some(&Value::nan()));
        assert_eq!(s.valid_f64(&s.records()[0], "Ap"), None);
    }

    #[test]
    fn fill_is_never_a_valid_value() {
        let records = vec![Record::new(t(0)).with("Kp", -1.0), Record::new(t(3)).with("Kp", 2.0)];
        let s = Series::new("kp", "kp_def".into(), TimeRange::new(t(0), t(6)), kp_fields(), records)
            .unwrap();
        let vals: Vec<_> = s.valid_values("Kp").map(|(_, v)| v).collect();
        assert_eq!(vals, vec![None, Some(2.0)]);
    }

    #[test]
    fn builder_sorts_and_closes_coverage_with_cadence() {
        let mut b = SeriesBuilder::new("kp", "kp_def".into(), Duration::hours(3))
            .field("Kp", FieldMeta::new("", "Kp", -1.0));
        b.push(Record::new(t(3)).with("Kp", 2.0));
        b.push(Record::new(t(0)).with("Kp", 1.0));
        let s = b.build().unwrap();
        assert_eq!(s.records()[0].time, t(0));
        assert_eq!(s.coverage(), TimeRange::new(t(0), t(6)));
    }

    #[test]
    fn empty_builder_yields_empty_series() {
        let s = SeriesBuilder::new("kp", "kp_def".into(), Duration::hours(3))
            .field("Kp", FieldMeta::new("", "Kp", -1.0))
            .build()
            .unwrap();
        assert!(s.is_empty());
        assert!(s.coverage().is_empty());
    }

    #[test]
    fn bounded_intersects_coverage() {
        let records = (0..4).map(|i| Record::new(t(i * 3)).with("Kp", i as f64)).collect();
        let s = Series::new("kp", "kp_def".into(), TimeRange::new(t(0), t(12)), kp_fields(), records)
            .unwrap();
        let b = s.bounded(&TimeRange::new(t(3), t(9)));
        assert_eq!(b.len(), 2);
        assert_eq!(b.coverage(), TimeRange::new(t(3), t(9)));
    }

    #[test]
    fn with_field_refuses_overwrite() {
        let s = Series::new("kp", "kp_def".into(), TimeRange::new(t(0), t(3)), kp_fields(), vec![])
            .unwrap();
        let err = s.with_field("Kp", FieldMeta::new("", "", -1.0), vec![]).unwrap_err();
        assert_eq!(err, SeriesError::FieldExists("Kp".into()));
    }

    #[test]
    fn range_hull_ignores_empty() {
        let a = TimeRange::new(t(0), t(3));
        let e = TimeRange::empty_at(t(20));
        assert_eq!(a.hull(&e), a);
        assert_eq!(a.hull(&TimeRange::new(t(6), t(9))), TimeRange::new(t(0), t(9)));
    }
}
