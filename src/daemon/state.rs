//! Author: [Seclususs](https://github.com/seclususs)

use crate::algorithms::pid_math::PidState;
use crate::config::sensor_info::Severity;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

pub static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Severity memory published to snapshot readers through the
/// readers-writer lock. The watcher is the only writer.
#[derive(Debug, Clone, Copy)]
pub struct SensorSeverity {
    pub severity: Severity,
    pub prev_hot_severity: Severity,
    pub prev_cold_severity: Severity,
    pub prev_hint_severity: Severity,
}

impl SensorSeverity {
    pub const fn new() -> Self {
        Self {
            severity: Severity::None,
            prev_hot_severity: Severity::None,
            prev_cold_severity: Severity::None,
            prev_hint_severity: Severity::None,
        }
    }
}

impl Default for SensorSeverity {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-sensor throttling state owned by the control loop. Never crosses
/// the severity lock; `severity` is the loop's working copy of the last
/// committed value.
pub struct SensorThrottling {
    pub severity: Severity,
    pub pid: PidState,
    pub pid_request_map: HashMap<String, i32>,
    pub hard_limit_request_map: HashMap<String, i32>,
    pub last_update_time: Duration,
}

impl SensorThrottling {
    pub fn new() -> Self {
        Self {
            severity: Severity::None,
            pid: PidState::new(),
            pid_request_map: HashMap::new(),
            hard_limit_request_map: HashMap::new(),
            last_update_time: Duration::ZERO,
        }
    }
}

impl Default for SensorThrottling {
    fn default() -> Self {
        Self::new()
    }
}

/// Requests one cooling device has collected from its sensors, plus the
/// state last pushed to sysfs so unchanged aggregates are not rewritten.
pub struct CdevRequestStatus {
    pub requests: HashMap<String, i32>,
    pub last_written: Option<i32>,
}

impl CdevRequestStatus {
    pub fn new() -> Self {
        Self {
            requests: HashMap::new(),
            last_written: None,
        }
    }
    pub fn max_request(&self) -> i32 {
        self.requests.values().copied().max().unwrap_or(0)
    }
}

impl Default for CdevRequestStatus {
    fn default() -> Self {
        Self::new()
    }
}
