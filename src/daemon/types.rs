//! Author: [Seclususs](https://github.com/seclususs)

use crate::config::sensor_info::{CoolingType, SEVERITY_COUNT, SensorType, Severity};

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ThermalError {
    IoError(io::Error),
    ConfigError(String),
    ParseError(String),
    SensorMissing(String),
    PowerHalError(String),
    InvalidInput(String),
}

impl fmt::Display for ThermalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThermalError::IoError(e) => write!(f, "I/O Error: {}", e),
            ThermalError::ConfigError(s) => write!(f, "Config Error: {}", s),
            ThermalError::ParseError(s) => write!(f, "Parse Error: {}", s),
            ThermalError::SensorMissing(s) => write!(f, "Sensor Missing: {}", s),
            ThermalError::PowerHalError(s) => write!(f, "Power HAL Error: {}", s),
            ThermalError::InvalidInput(s) => write!(f, "Invalid Input: {}", s),
        }
    }
}

impl From<io::Error> for ThermalError {
    fn from(err: io::Error) -> Self {
        ThermalError::IoError(err)
    }
}

/// One sensor reading, scaled to degrees and classified.
#[derive(Debug, Clone)]
pub struct Temperature {
    pub sensor_type: SensorType,
    pub name: String,
    pub value: f32,
    pub throttling_status: Severity,
}

#[derive(Debug, Clone)]
pub struct TemperatureThreshold {
    pub sensor_type: SensorType,
    pub name: String,
    pub hot_thresholds: [f32; SEVERITY_COUNT],
    pub cold_thresholds: [f32; SEVERITY_COUNT],
    pub vr_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct CoolingDeviceState {
    pub cooling_type: CoolingType,
    pub name: String,
    pub value: i32,
}

/// Invoked from the watcher thread for every severity transition on a
/// sensor with `send_cb` set.
pub type NotificationCallback = Box<dyn Fn(&Temperature) + Send + Sync>;
