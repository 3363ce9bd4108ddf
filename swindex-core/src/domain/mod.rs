//! Domain types shared by every adapter: values with fill markers, records,
//! series with coverage, source identifiers and priorities.

pub mod ids;
pub mod priority;
pub mod series;
pub mod value;

pub use ids::{InstrumentId, SourceId};
pub use priority::SourcePriority;
pub use series::{FieldMeta, Record, Series, SeriesBuilder, SeriesError, TimeRange};
pub use value::Value;

/// UTC timestamp, minute resolution or coarser.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Midnight UTC of a calendar date.
pub fn day_start(date: chrono::NaiveDate) -> Timestamp {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
