//! Explicit source ranking used by the combiner.

use super::ids::SourceId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Total order over source identifiers, highest priority first.
///
/// Sources not listed rank below every listed source and tie with each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePriority {
    order: Vec<SourceId>,
}

impl SourcePriority {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SourceId>,
    {
        let mut seen = Vec::new();
        for id in order.into_iter().map(Into::into) {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        Self { order: seen }
    }

    /// Definitive, then nowcast, recent and 3-hourly forecast.
    ///
    /// The prediction product carries only mid- and high-latitude Kp, so it is
    /// not a planetary Kp tier.
    pub fn kp_default() -> Self {
        Self::new(["kp_def", "kp_now", "kp_recent", "kp_forecast"])
    }

    /// Historic beats preliminary beats daily beats 45-day beats 3-day forecast.
    pub fn f107_default() -> Self {
        Self::new([
            "f107_historic",
            "f107_prelim",
            "f107_daily",
            "f107_45day",
            "f107_forecast",
        ])
    }

    /// Position in the order, `None` for unlisted sources.
    pub fn rank(&self, source: &SourceId) -> Option<usize> {
        self.order.iter().position(|s| s == source)
    }

    /// `Ordering::Greater` when `a` outranks `b`.
    pub fn compare(&self, a: &SourceId, b: &SourceId) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(ra), Some(rb)) => rb.cmp(&ra),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }

    pub fn sources(&self) -> &[SourceId] {
        &self.order
    }
}
