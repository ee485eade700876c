//! Author: [Seclususs](https://github.com/seclususs)

use crate::config::sensor_info::{SEVERITY_COUNT, Severity};

/// Classify a reading into `(hot, cold)` severities.
///
/// Thresholds are scanned from SHUTDOWN down to LIGHT so the first match
/// is the highest qualifying level; NaN entries never match. A severity
/// is only released once the reading leaves the hysteresis band below a
/// hot threshold (above a cold one), otherwise the hysteresis candidate
/// is returned instead of the raw one.
pub fn severity_from_thresholds(
    hot_thresholds: &[f32; SEVERITY_COUNT],
    cold_thresholds: &[f32; SEVERITY_COUNT],
    hot_hysteresis: &[f32; SEVERITY_COUNT],
    cold_hysteresis: &[f32; SEVERITY_COUNT],
    prev_hot_severity: Severity,
    prev_cold_severity: Severity,
    value: f32,
) -> (Severity, Severity) {
    let mut ret_hot = Severity::None;
    let mut ret_hot_hysteresis = Severity::None;
    let mut ret_cold = Severity::None;
    let mut ret_cold_hysteresis = Severity::None;

    for i in (1..SEVERITY_COUNT).rev() {
        if !hot_thresholds[i].is_nan() && hot_thresholds[i] <= value && ret_hot == Severity::None {
            ret_hot = Severity::from_index(i);
        }
        if !hot_thresholds[i].is_nan()
            && (hot_thresholds[i] - hot_hysteresis[i]) < value
            && ret_hot_hysteresis == Severity::None
        {
            ret_hot_hysteresis = Severity::from_index(i);
        }
        if !cold_thresholds[i].is_nan() && cold_thresholds[i] >= value && ret_cold == Severity::None
        {
            ret_cold = Severity::from_index(i);
        }
        if !cold_thresholds[i].is_nan()
            && (cold_thresholds[i] + cold_hysteresis[i]) > value
            && ret_cold_hysteresis == Severity::None
        {
            ret_cold_hysteresis = Severity::from_index(i);
        }
    }
    if ret_hot < prev_hot_severity {
        ret_hot = ret_hot_hysteresis;
    }
    if ret_cold < prev_cold_severity {
        ret_cold = ret_cold_hysteresis;
    }

    (ret_hot, ret_cold)
}
