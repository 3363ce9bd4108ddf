//! Multi-source combination of same-index series.
//!
//! Inputs are ranked by an explicit [`SourcePriority`]; inputs the priority
//! does not distinguish are ranked by list position, later entries winning.
//! Each output timestamp takes the whole record of the best-ranked input that
//! has valid data there. Nothing is interpolated: a timestamp no input carries
//! is absent from the output.

mod presets;

pub use presets::{combine_f107, combine_kp};

use crate::domain::{
    FieldMeta, Record, Series, SeriesError, SourceId, SourcePriority, TimeRange, Timestamp, Value,
};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum CombineError {
    #[error("no input series to combine")]
    NoInputs,

    #[error("date range is zero or negative: start {start} is not before end {end}")]
    EmptyRange { start: Timestamp, end: Timestamp },

    #[error("field '{0}' is missing from every input series")]
    MissingField(String),

    #[error("cannot combine index '{found}' with index '{expected}'")]
    MixedIndices { expected: String, found: String },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Which fields to carry and how to mark missing values in the output.
#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    /// Fields to carry. Empty means every field declared by any input.
    pub fields: Vec<String>,
    /// Output fill marker. `None` keeps the fill of the best-ranked input declaring each field.
    pub fill: Option<Value>,
}

impl CombineOptions {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            fill: None,
        }
    }

    pub fn with_fill(mut self, fill: impl Into<Value>) -> Self {
        self.fill = Some(fill.into());
        self
    }
}

/// Merge `inputs` over `range` (`[start, end)`).
pub fn combine(
    inputs: &[&Series],
    priority: &SourcePriority,
    range: TimeRange,
    options: &CombineOptions,
) -> Result<Series, CombineError> {
    let first = inputs.first().ok_or(CombineError::NoInputs)?;
    if range.start >= range.end {
        return Err(CombineError::EmptyRange {
            start: range.start,
            end: range.end,
        });
    }
    if let Some(other) = inputs.iter().find(|s| s.index() != first.index()) {
        return Err(CombineError::MixedIndices {
            expected: first.index().to_string(),
            found: other.index().to_string(),
        });
    }

    let ranked = rank_inputs(inputs, priority);
    let fields = output_fields(&ranked, options)?;

    // An input declaring none of the output fields has nothing to contribute.
    let (ranked, skipped): (Vec<&Series>, Vec<&Series>) = ranked
        .into_iter()
        .partition(|s| fields.keys().any(|name| s.field(name).is_some()));
    for series in &skipped {
        debug!(source = %series.source(), "input carries none of the requested fields, skipped");
    }

    let hull = ranked
        .iter()
        .fold(TimeRange::empty_at(range.start), |acc, s| acc.hull(&s.coverage()));
    let coverage = range.intersect(&hull);

    // Best-ranked inputs are visited first; a vacant slot takes the record,
    // an occupied slot is only replaced when it held nothing but fill.
    let mut merged: BTreeMap<Timestamp, (Record, bool)> = BTreeMap::new();
    for series in &ranked {
        for record in series.records() {
            if !coverage.contains(record.time) {
                continue;
            }
            let translated = translate(series, record, &fields);
            let has_data = fields
                .iter()
                .any(|(name, meta)| translated.get(name).is_some_and(|v| !meta.is_fill(v)));
            match merged.entry(record.time) {
                Entry::Vacant(slot) => {
                    slot.insert((translated, has_data));
                }
                Entry::Occupied(mut slot) => {
                    if !slot.get().1 && has_data {
                        slot.insert((translated, true));
                    }
                }
            }
        }
    }

    debug!(
        index = first.index(),
        inputs = inputs.len(),
        records = merged.len(),
        "combined series"
    );

    let source = if inputs.len() == 1 {
        first.source().clone()
    } else {
        SourceId(format!("{}_combined", first.index()))
    };
    let records = merged.into_values().map(|(r, _)| r).collect();
    Ok(Series::new(first.index(), source, coverage, fields, records)?)
}

/// Inputs ordered best first: priority, then later list position.
fn rank_inputs<'a>(inputs: &[&'a Series], priority: &SourcePriority) -> Vec<&'a Series> {
    let mut indexed: Vec<(usize, &'a Series)> = inputs.iter().copied().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| match priority.compare(a.source(), b.source()) {
        Ordering::Equal => ib.cmp(ia),
        other => other.reverse(),
    });
    indexed.into_iter().map(|(_, s)| s).collect()
}

fn output_fields(
    ranked: &[&Series],
    options: &CombineOptions,
) -> Result<BTreeMap<String, FieldMeta>, CombineError> {
    let names: Vec<String> = if options.fields.is_empty() {
        let mut all: Vec<String> = ranked
            .iter()
            .flat_map(|s| s.fields().keys().cloned())
            .collect();
        all.sort();
        all.dedup();
        all
    } else {
        options.fields.clone()
    };

    let mut fields = BTreeMap::new();
    for name in names {
        let mut meta = ranked
            .iter()
            .find_map(|s| s.field(&name))
            .cloned()
            .ok_or_else(|| CombineError::MissingField(name.clone()))?;
        if let Some(fill) = &options.fill {
            meta.fill = fill.clone();
        }
        fields.insert(name, meta);
    }
    Ok(fields)
}

/// Copy the requested fields, mapping each input's fill onto the output fill.
fn translate(series: &Series, record: &Record, fields: &BTreeMap<String, FieldMeta>) -> Record {
    let mut out = Record::new(record.time);
    for (name, meta) in fields {
        let value = match (series.field(name), record.get(name)) {
            (Some(src), Some(v)) if !src.is_fill(v) => v.clone(),
            _ => meta.fill.clone(),
        };
        out.values.insert(name.clone(), value);
    }
    out
}
