//! Author: [Seclususs](https://github.com/seclususs)

use std::path::PathBuf;

pub const K_THERMAL_SENSORS_ROOT: &str = "/sys/devices/virtual/thermal";
pub const K_CPU_ONLINE_ROOT: &str = "/sys/devices/system/cpu";
pub const K_CPU_PRESENT_FILE: &str = "/sys/devices/system/cpu/present";
pub const K_CPU_USAGE_FILE: &str = "/proc/stat";
pub const K_CPU_ONLINE_FILE_SUFFIX: &str = "online";

pub const K_SENSOR_PREFIX: &str = "thermal_zone";
pub const K_COOLING_DEVICE_PREFIX: &str = "cooling_device";
pub const K_THERMAL_NAME_FILE: &str = "type";
pub const K_SENSOR_POLICY_FILE: &str = "policy";
pub const K_SENSOR_TEMP_SUFFIX: &str = "temp";
pub const K_SENSOR_TRIP_POINT_TEMP_ZERO_FILE: &str = "trip_point_0_temp";
pub const K_SENSOR_TRIP_POINT_HYST_ZERO_FILE: &str = "trip_point_0_hyst";
pub const K_USER_SPACE_SUFFIX: &str = "user_space";
pub const K_COOLING_DEVICE_CUR_STATE_SUFFIX: &str = "cur_state";

pub const K_CONFIG_PROPERTY: &str = "vendor.thermal.config";
pub const K_CONFIG_DEFAULT_FILE_NAME: &str = "thermal_info_config.json";

/// Filesystem roots the core reads from, collected so tests and bring-up
/// rigs can point the helper at a scratch tree.
#[derive(Debug, Clone)]
pub struct ThermalPaths {
    pub thermal_root: PathBuf,
    pub cpu_online_root: PathBuf,
    pub cpu_present_file: PathBuf,
    pub cpu_usage_file: PathBuf,
}

impl Default for ThermalPaths {
    fn default() -> Self {
        Self {
            thermal_root: PathBuf::from(K_THERMAL_SENSORS_ROOT),
            cpu_online_root: PathBuf::from(K_CPU_ONLINE_ROOT),
            cpu_present_file: PathBuf::from(K_CPU_PRESENT_FILE),
            cpu_usage_file: PathBuf::from(K_CPU_USAGE_FILE),
        }
    }
}
