//! Author: [Seclususs](https://github.com/seclususs)

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::config::loop_settings::MIN_POLL_INTERVAL_MS;

pub const SEVERITY_COUNT: usize = 7;
/// Maximum number of physical sensors a virtual sensor may combine.
pub const COMBINATION_COUNT: usize = 10;

/// Throttling severity, ordered from no action to forced shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(usize)]
pub enum Severity {
    None = 0,
    Light,
    Moderate,
    Severe,
    Critical,
    Emergency,
    Shutdown,
}

impl Severity {
    pub const fn index(self) -> usize {
        self as usize
    }
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Severity::None,
            1 => Severity::Light,
            2 => Severity::Moderate,
            3 => Severity::Severe,
            4 => Severity::Critical,
            5 => Severity::Emergency,
            _ => Severity::Shutdown,
        }
    }
    /// Ascending, NONE first.
    pub fn iter() -> impl Iterator<Item = Severity> {
        (0..SEVERITY_COUNT).map(Severity::from_index)
    }
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Light => "LIGHT",
            Severity::Moderate => "MODERATE",
            Severity::Severe => "SEVERE",
            Severity::Critical => "CRITICAL",
            Severity::Emergency => "EMERGENCY",
            Severity::Shutdown => "SHUTDOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-severity throttling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleType {
    None,
    Limit,
    Pid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaOption {
    CountThreshold,
    WeightedAvg,
    Maximum,
    Minimum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    Unknown,
    Cpu,
    Gpu,
    Battery,
    Skin,
    UsbPort,
    PowerAmplifier,
    BclVoltage,
    BclCurrent,
    BclPercentage,
    Npu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoolingType {
    Fan,
    Battery,
    Cpu,
    Gpu,
    Modem,
    Npu,
    Component,
}

/// How a virtual sensor derives its value from physical zones.
#[derive(Debug, Clone)]
pub struct VirtualSensorInfo {
    /// Physical zone whose uevent wakes this sensor up.
    pub trigger_sensor: String,
    /// Up to `COMBINATION_COUNT` entries; `"NAN"` or empty slots are skipped.
    pub linked_sensors: Vec<String>,
    pub coefficients: Vec<f32>,
    pub formula: FormulaOption,
}

/// PID gains, hard-limit tables and cooling-device wiring for one sensor.
/// All per-severity arrays are indexed by `Severity::index()`.
#[derive(Debug, Clone)]
pub struct ThrottlingInfo {
    pub throttle_type: [ThrottleType; SEVERITY_COUNT],
    pub k_po: [f32; SEVERITY_COUNT],
    pub k_pu: [f32; SEVERITY_COUNT],
    pub k_i: [f32; SEVERITY_COUNT],
    pub k_d: [f32; SEVERITY_COUNT],
    pub i_max: [f32; SEVERITY_COUNT],
    pub i_cutoff: [f32; SEVERITY_COUNT],
    pub s_power: [f32; SEVERITY_COUNT],
    pub min_alloc_power: [f32; SEVERITY_COUNT],
    pub max_alloc_power: [f32; SEVERITY_COUNT],
    pub cdev_request: Vec<String>,
    pub cdev_weight: Vec<f32>,
    pub limit_info: HashMap<String, [i32; SEVERITY_COUNT]>,
}

impl Default for ThrottlingInfo {
    fn default() -> Self {
        Self {
            throttle_type: [ThrottleType::None; SEVERITY_COUNT],
            k_po: [0.0; SEVERITY_COUNT],
            k_pu: [0.0; SEVERITY_COUNT],
            k_i: [0.0; SEVERITY_COUNT],
            k_d: [0.0; SEVERITY_COUNT],
            i_max: [0.0; SEVERITY_COUNT],
            i_cutoff: [0.0; SEVERITY_COUNT],
            s_power: [0.0; SEVERITY_COUNT],
            min_alloc_power: [0.0; SEVERITY_COUNT],
            max_alloc_power: [f32::MAX; SEVERITY_COUNT],
            cdev_request: Vec::new(),
            cdev_weight: Vec::new(),
            limit_info: HashMap::new(),
        }
    }
}

/// Immutable sensor record built from configuration. `polling_delay` and
/// `passive_delay` may still be rewritten once at startup when trip-point
/// programming fails and the sensor falls back to plain polling.
#[derive(Debug, Clone)]
pub struct SensorInfo {
    pub sensor_type: SensorType,
    pub is_monitor: bool,
    pub send_cb: bool,
    pub send_powerhint: bool,
    /// Scale from the raw sysfs integer to degrees Celsius.
    pub multiplier: f32,
    pub polling_delay: Duration,
    pub passive_delay: Duration,
    pub hot_thresholds: [f32; SEVERITY_COUNT],
    pub cold_thresholds: [f32; SEVERITY_COUNT],
    pub hot_hysteresis: [f32; SEVERITY_COUNT],
    pub cold_hysteresis: [f32; SEVERITY_COUNT],
    pub vr_threshold: f32,
    pub virtual_sensor: Option<VirtualSensorInfo>,
    pub throttling: ThrottlingInfo,
}

impl SensorInfo {
    pub fn is_virtual(&self) -> bool {
        self.virtual_sensor.is_some()
    }
}

impl Default for SensorInfo {
    fn default() -> Self {
        Self {
            sensor_type: SensorType::Unknown,
            is_monitor: false,
            send_cb: false,
            send_powerhint: false,
            multiplier: 1.0,
            polling_delay: Duration::from_millis(MIN_POLL_INTERVAL_MS),
            passive_delay: Duration::from_millis(MIN_POLL_INTERVAL_MS),
            hot_thresholds: [f32::NAN; SEVERITY_COUNT],
            cold_thresholds: [f32::NAN; SEVERITY_COUNT],
            hot_hysteresis: [0.0; SEVERITY_COUNT],
            cold_hysteresis: [0.0; SEVERITY_COUNT],
            vr_threshold: f32::NAN,
            virtual_sensor: None,
            throttling: ThrottlingInfo::default(),
        }
    }
}

/// Immutable cooling-device record. `power2state[i]` is the power budget
/// in mW above which state `i` is sufficient; the table is non-increasing
/// and state 0 means no throttling.
#[derive(Debug, Clone)]
pub struct CdevInfo {
    pub cooling_type: CoolingType,
    pub power2state: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order_is_total() {
        assert!(Severity::None < Severity::Light);
        assert!(Severity::Light < Severity::Moderate);
        assert!(Severity::Emergency < Severity::Shutdown);
        assert_eq!(Severity::iter().count(), SEVERITY_COUNT);
    }

    #[test]
    fn severity_index_round_trips() {
        for severity in Severity::iter() {
            assert_eq!(Severity::from_index(severity.index()), severity);
        }
    }

    #[test]
    fn severity_strings_match_hint_encoding() {
        assert_eq!(Severity::None.to_string(), "NONE");
        assert_eq!(Severity::Shutdown.to_string(), "SHUTDOWN");
    }
}
