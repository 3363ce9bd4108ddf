//! Index unit converters.
//!
//! Everything here is a pure function of its inputs. Series converters never
//! overwrite a source field: the derived field is added under a new name.

pub mod ace;
pub mod f107;
pub mod filter;
pub mod kp;
pub mod table;

pub use ace::ace_swepam_hourly_omni_norm;
pub use f107::calc_f107a;
pub use filter::filter_geomag;
pub use kp::{
    ap_to_kp, calc_daily_ap, convert_ap_to_kp, convert_kp_to_ap, kp_to_ap, DAILY_AP_MIN_PERIODS,
};
pub use table::ConversionTable;

use crate::domain::{SeriesError, Timestamp};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConversionError {
    #[error("{table}: {value} is not on the input scale (multiples of 1/{steps_per_unit} in [0, {max}])")]
    NotOnScale {
        table: &'static str,
        value: f64,
        steps_per_unit: f64,
        max: f64,
    },

    #[error("{table}: {value} is outside the inverse domain [{min}, {max}]")]
    OutOfRange {
        table: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("field '{field}' at {time} is not numeric")]
    NotNumeric { field: String, time: Timestamp },

    #[error("record at {time}: {source}")]
    AtRecord {
        time: Timestamp,
        #[source]
        source: Box<ConversionError>,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}
