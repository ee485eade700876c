//! Author: [Seclususs](https://github.com/seclususs)

use crate::config::sensor_info::FormulaOption;

/// Combine `(reading, coefficient)` pairs from the linked physical
/// sensors of a virtual sensor. Callers have already dropped unreadable
/// sensors and NaN coefficients.
pub fn combine(formula: FormulaOption, parts: &[(f32, f32)]) -> f32 {
    match formula {
        FormulaOption::WeightedAvg => parts.iter().map(|(r, c)| r * c).sum(),
        FormulaOption::Maximum => parts
            .iter()
            .map(|(r, c)| r * c)
            .fold(f32::NEG_INFINITY, f32::max),
        FormulaOption::Minimum => parts
            .iter()
            .map(|(r, c)| r * c)
            .fold(f32::INFINITY, f32::min),
        FormulaOption::CountThreshold => parts
            .iter()
            .filter(|(r, c)| if *c < 0.0 { *r < -*c } else { *r >= *c })
            .count() as f32,
    }
}
