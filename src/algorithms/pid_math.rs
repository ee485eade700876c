//! Author: [Seclususs](https://github.com/seclususs)

use crate::config::sensor_info::{SensorInfo, Severity, ThrottleType};

/// PID memory for one sensor. `prev_err` is NaN until the first sample
/// inside a PID-active severity, which disables the derivative term.
#[derive(Debug, Clone, Copy)]
pub struct PidState {
    pub err_integral: f32,
    pub prev_err: f32,
}

impl PidState {
    pub fn new() -> Self {
        Self {
            err_integral: 0.0,
            prev_err: f32::NAN,
        }
    }
    pub fn reset(&mut self) {
        self.err_integral = 0.0;
        self.prev_err = f32::NAN;
    }
}

impl Default for PidState {
    fn default() -> Self {
        Self::new()
    }
}

/// Power budget in mW for one sample.
///
/// The target severity is the lowest PID-typed severity above the
/// current one, falling back to the highest PID-typed severity overall.
/// Without a target, or at severity NONE, the controller resets and
/// hands back an unbounded budget.
pub fn power_budget(
    value: f32,
    current_severity: Severity,
    info: &SensorInfo,
    state: &mut PidState,
    time_elapsed_ms: u64,
) -> f32 {
    let throttling = &info.throttling;
    let mut target_state = 0_usize;

    for severity in Severity::iter() {
        let s = severity.index();
        if throttling.throttle_type[s] != ThrottleType::Pid {
            continue;
        }
        target_state = s;
        if severity > current_severity {
            break;
        }
    }

    log::debug!("PID target state={}", target_state);
    if target_state == 0 || current_severity == Severity::None {
        state.reset();
        return f32::MAX;
    }

    let err = info.hot_thresholds[target_state] - value;
    let p = err * if err < 0.0 {
        throttling.k_po[target_state]
    } else {
        throttling.k_pu[target_state]
    };
    let mut i = state.err_integral * throttling.k_i[target_state];
    if err < throttling.i_cutoff[target_state] {
        let i_next = i + err * throttling.k_i[target_state];
        if i_next.abs() < throttling.i_max[target_state] {
            i = i_next;
            state.err_integral += err;
        }
    }
    // Back-to-back uevents can land in the same millisecond.
    let dt_ms = time_elapsed_ms.max(1) as f32;
    let d = if !state.prev_err.is_nan() {
        throttling.k_d[target_state] * (err - state.prev_err) / dt_ms
    } else {
        0.0
    };
    state.prev_err = err;

    let mut power_budget = throttling.s_power[target_state] + p + i + d;
    if power_budget < throttling.min_alloc_power[target_state] {
        power_budget = throttling.min_alloc_power[target_state];
    }
    if power_budget > throttling.max_alloc_power[target_state] {
        power_budget = throttling.max_alloc_power[target_state];
    }

    log::debug!(
        "power_budget={} err={} err_integral={} s_power={} time_elapsed_ms={} p={} i={} d={}",
        power_budget,
        err,
        state.err_integral,
        throttling.s_power[target_state],
        time_elapsed_ms,
        p,
        i,
        d
    );

    power_budget
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sensor_info::SEVERITY_COUNT;

    fn pid_sensor() -> SensorInfo {
        let mut info = SensorInfo::default();
        info.hot_thresholds = [f32::NAN, 45.0, 55.0, 65.0, 75.0, 85.0, 95.0];
        let t = &mut info.throttling;
        let m = Severity::Moderate.index();
        t.throttle_type[m] = ThrottleType::Pid;
        t.k_pu[m] = 20.0;
        t.k_po[m] = 40.0;
        t.s_power[m] = 1000.0;
        t.i_max[m] = 300.0;
        t.i_cutoff[m] = 2.0;
        t.min_alloc_power[m] = 0.0;
        t.max_alloc_power[m] = 2000.0;
        info
    }

    #[test]
    fn budget_matches_proportional_only_case() {
        let info = pid_sensor();
        let mut state = PidState::new();
        // err = 55 - 60 = -5, overshoot gain k_po applies.
        let budget = power_budget(60.0, Severity::Moderate, &info, &mut state, 1000);
        assert_eq!(budget, 1000.0 + (55.0 - 60.0) * 40.0);
    }

    #[test]
    fn undershoot_uses_k_pu() {
        let mut info = pid_sensor();
        info.throttling.i_cutoff[Severity::Moderate.index()] = 0.0;
        let mut state = PidState::new();
        // err = 55 - 54 = 1, blocked from the integral by the cutoff.
        let budget = power_budget(54.0, Severity::Moderate, &info, &mut state, 1000);
        assert_eq!(budget, 1000.0 + 20.0);
        assert_eq!(state.err_integral, 0.0);
    }

    #[test]
    fn severity_none_resets_and_returns_unbounded() {
        let info = pid_sensor();
        let mut state = PidState {
            err_integral: 12.0,
            prev_err: 3.0,
        };
        let budget = power_budget(30.0, Severity::None, &info, &mut state, 1000);
        assert_eq!(budget, f32::MAX);
        assert_eq!(state.err_integral, 0.0);
        assert!(state.prev_err.is_nan());
    }

    #[test]
    fn no_pid_severity_returns_unbounded() {
        let mut info = pid_sensor();
        info.throttling.throttle_type = [ThrottleType::None; SEVERITY_COUNT];
        let mut state = PidState::new();
        let budget = power_budget(60.0, Severity::Moderate, &info, &mut state, 1000);
        assert_eq!(budget, f32::MAX);
    }

    #[test]
    fn integral_stays_inside_i_max() {
        let mut info = pid_sensor();
        let m = Severity::Moderate.index();
        info.throttling.k_i[m] = 5.0;
        info.throttling.i_cutoff[m] = 100.0;
        info.throttling.max_alloc_power[m] = f32::MAX;
        let mut state = PidState::new();
        for _ in 0..1000 {
            power_budget(52.0, Severity::Moderate, &info, &mut state, 1000);
            let scaled = state.err_integral * info.throttling.k_i[m];
            assert!(scaled.abs() < info.throttling.i_max[m]);
        }
    }

    #[test]
    fn derivative_disabled_on_first_sample() {
        let mut info = pid_sensor();
        let m = Severity::Moderate.index();
        info.throttling.k_d[m] = 1000.0;
        info.throttling.i_cutoff[m] = 0.0;
        let mut state = PidState::new();
        let first = power_budget(60.0, Severity::Moderate, &info, &mut state, 1000);
        assert_eq!(first, 1000.0 + (55.0 - 60.0) * 40.0);
        assert_eq!(state.prev_err, -5.0);
        // Second sample sees prev_err and contributes k_d * delta / dt.
        let second = power_budget(61.0, Severity::Moderate, &info, &mut state, 1000);
        let expected = 1000.0 + (55.0 - 61.0) * 40.0 + 1000.0 * (-6.0 - -5.0) / 1000.0;
        assert_eq!(second, expected);
    }

    #[test]
    fn budget_is_clamped_to_alloc_bounds() {
        let mut info = pid_sensor();
        let m = Severity::Moderate.index();
        info.throttling.min_alloc_power[m] = 200.0;
        info.throttling.max_alloc_power[m] = 1100.0;
        let mut state = PidState::new();
        // Deep overshoot drives the raw budget far negative.
        let low = power_budget(120.0, Severity::Moderate, &info, &mut state, 1000);
        assert_eq!(low, 200.0);
        let mut state = PidState::new();
        // Undershoot with a large error saturates at the ceiling.
        let high = power_budget(40.0, Severity::Moderate, &info, &mut state, 1000);
        assert_eq!(high, 1100.0);
    }

    #[test]
    fn target_prefers_lowest_pid_severity_above_current() {
        let mut info = pid_sensor();
        let t = &mut info.throttling;
        t.throttle_type[Severity::Severe.index()] = ThrottleType::Pid;
        t.s_power[Severity::Severe.index()] = 500.0;
        t.k_pu[Severity::Severe.index()] = 0.0;
        t.k_po[Severity::Severe.index()] = 0.0;
        t.i_cutoff[Severity::Severe.index()] = 0.0;
        t.max_alloc_power[Severity::Severe.index()] = 2000.0;
        let mut state = PidState::new();
        // Current LIGHT: the MODERATE loop is the active target, not SEVERE.
        let budget = power_budget(55.0, Severity::Light, &info, &mut state, 1000);
        assert_eq!(budget, 1000.0);
        // Current SEVERE: both PID levels are at or below, so the
        // highest one (SEVERE) is targeted.
        let mut state = PidState::new();
        let budget = power_budget(65.0, Severity::Severe, &info, &mut state, 1000);
        assert_eq!(budget, 500.0);
    }
}
