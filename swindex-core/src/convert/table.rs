use super::ConversionError;

/// ap value for each Kp step 0, 0+, 1-, 1, ... 9- , 9 (thirds of a unit).
const KP_AP_VALUES: [f64; 28] = [
    0.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 9.0, 12.0, 15.0, 18.0, 22.0, 27.0, 32.0, 39.0, 48.0, 56.0,
    67.0, 80.0, 94.0, 111.0, 132.0, 154.0, 179.0, 207.0, 236.0, 300.0, 400.0,
];

/// Distance from the nearest step, in steps, still accepted as that step.
/// Covers two-decimal renderings such as 2.33 and 2.67.
const STEP_TOLERANCE: f64 = 0.05;

/// Mapping from a discretised input scale to output values.
///
/// Input step `i` is the value `i / steps_per_unit`; the table covers every
/// step from zero up to the last entry, so it spans the full legal domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionTable {
    name: &'static str,
    steps_per_unit: f64,
    outputs: &'static [f64],
}

impl ConversionTable {
    /// The standard Kp (thirds, 0..9) to ap (nT) table.
    pub const fn kp_ap() -> Self {
        Self {
            name: "Kp->ap",
            steps_per_unit: 3.0,
            outputs: &KP_AP_VALUES,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn input_max(&self) -> f64 {
        (self.outputs.len().saturating_sub(1)) as f64 / self.steps_per_unit
    }

    /// Legal input values in ascending order.
    pub fn inputs(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.outputs.len()).map(move |i| i as f64 / self.steps_per_unit)
    }

    /// Look up the output for an input on the scale.
    pub fn forward(&self, value: f64) -> Result<f64, ConversionError> {
        let not_on_scale = || ConversionError::NotOnScale {
            table: self.name,
            value,
            steps_per_unit: self.steps_per_unit,
            max: self.input_max(),
        };
        if !value.is_finite() {
            return Err(not_on_scale());
        }
        let scaled = value * self.steps_per_unit;
        let step = scaled.round();
        if (scaled - step).abs() > STEP_TOLERANCE || step < 0.0 {
            return Err(not_on_scale());
        }
        self.outputs
            .get(step as usize)
            .copied()
            .ok_or_else(not_on_scale)
    }

    /// Nearest table entry; ties resolve toward the lower input.
    pub fn inverse(&self, value: f64) -> Result<f64, ConversionError> {
        let (min, max) = match (self.outputs.first(), self.outputs.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => {
                return Err(ConversionError::OutOfRange {
                    table: self.name,
                    value,
                    min: f64::NAN,
                    max: f64::NAN,
                })
            }
        };
        if !value.is_finite() || value < min || value > max {
            return Err(ConversionError::OutOfRange {
                table: self.name,
                value,
                min,
                max,
            });
        }

        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, out) in self.outputs.iter().enumerate() {
            let dist = (out - value).abs();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }
        Ok(best as f64 / self.steps_per_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KP_AP: ConversionTable = ConversionTable::kp_ap();

    #[test]
    fn table_has_28_steps() {
        assert_eq!(KP_AP.len(), 28);
        assert_eq!(KP_AP.input_max(), 9.0);
    }

    #[test]
    fn forward_accepts_rounded_thirds() {
        assert_eq!(KP_AP.forward(0.0).unwrap(), 0.0);
        assert_eq!(KP_AP.forward(2.33).unwrap(), 9.0);
        assert_eq!(KP_AP.forward(2.67).unwrap(), 12.0);
        assert_eq!(KP_AP.forward(0.333).unwrap(), 2.0);
        assert_eq!(KP_AP.forward(9.0).unwrap(), 400.0);
    }

    #[test]
    fn forward_rejects_off_scale_values() {
        for bad in [2.5, 0.3, -1.0, 9.34, f64::NAN, f64::INFINITY] {
            assert!(KP_AP.forward(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn inverse_picks_nearest_entry() {
        assert_eq!(KP_AP.inverse(0.0).unwrap(), 0.0);
        assert_eq!(KP_AP.inverse(1.0).unwrap(), 0.0);
        assert_eq!(KP_AP.inverse(153.0).unwrap(), 22.0 / 3.0);
        assert_eq!(KP_AP.inverse(140.0).unwrap(), 7.0);
    }

    #[test]
    fn inverse_ties_go_to_lower_kp() {
        // 2.5 is halfway between ap 2 (0+) and ap 3 (1-)
        assert_eq!(KP_AP.inverse(2.5).unwrap(), 1.0 / 3.0);
        // 350 is halfway between 300 (9-) and 400 (9)
        assert_eq!(KP_AP.inverse(350.0).unwrap(), 26.0 / 3.0);
    }

    #[test]
    fn inverse_rejects_outside_domain() {
        for bad in [-1.0, 460.0, f64::NAN, f64::NEG_INFINITY] {
            assert!(KP_AP.inverse(bad).is_err(), "{bad} should be rejected");
        }
    }
}
