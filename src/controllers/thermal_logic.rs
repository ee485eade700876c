//! Author: [Seclususs](https://github.com/seclususs)

use crate::algorithms::alloc_math;
use crate::config::sensor_info::{CdevInfo, SensorInfo, Severity};
use crate::daemon::state::{CdevRequestStatus, SensorThrottling};

use std::collections::HashMap;

/// Split a PID power budget across the sensor's cooling devices by
/// weight and record the resulting state requests. Returns false when
/// the weights sum to zero, leaving any prior requests untouched.
pub fn request_cdev_by_power(
    sensor_name: &str,
    status: &mut SensorThrottling,
    info: &SensorInfo,
    cdev_info_map: &HashMap<String, CdevInfo>,
    total_power_budget: f32,
) -> bool {
    let throttling = &info.throttling;
    let total_weight: f32 = throttling.cdev_weight.iter().sum();
    if total_weight == 0.0 {
        log::error!("Sensor: {} total weight value is zero", sensor_name);
        return false;
    }
    for (i, cdev_name) in throttling.cdev_request.iter().enumerate() {
        if cdev_name.is_empty() {
            continue;
        }
        let weight = throttling.cdev_weight.get(i).copied().unwrap_or(0.0);
        let cdev_power_budget = total_power_budget * (weight / total_weight);
        let Some(cdev_info) = cdev_info_map.get(cdev_name) else {
            // Unreachable after startup validation.
            log::error!("Unknown cooling device {} requested by {}", cdev_name, sensor_name);
            continue;
        };
        let state = alloc_math::state_for_budget(&cdev_info.power2state, cdev_power_budget);
        status
            .pid_request_map
            .insert(cdev_name.clone(), state as i32);
        log::debug!(
            "Power allocator: sensor {} allocates {}mW to {}, state {}",
            sensor_name,
            cdev_power_budget,
            cdev_name,
            state
        );
    }
    true
}

/// Tabular hard limit: look up the per-device states at the highest
/// LIMIT-typed severity at or below the sensor's current one.
pub fn request_cdev_by_severity(
    sensor_name: &str,
    status: &mut SensorThrottling,
    info: &SensorInfo,
    severity: Severity,
) {
    let target_state = alloc_math::hard_limit_target(&info.throttling.throttle_type, severity);
    log::debug!("Hard limit target state={}", target_state);
    for (cdev_name, states) in &info.throttling.limit_info {
        status
            .hard_limit_request_map
            .insert(cdev_name.clone(), states[target_state]);
        log::debug!(
            "Hard limit: sensor {} update cdev {} to {}",
            sensor_name,
            cdev_name,
            states[target_state]
        );
    }
}

/// Fold one sensor's PID and hard-limit requests into the shared
/// cooling-device table. Returns the devices whose entry for this
/// sensor changed and therefore need a write-back pass.
pub fn aggregate_cdev_requests(
    sensor_name: &str,
    status: &SensorThrottling,
    cdev_status_map: &mut HashMap<String, CdevRequestStatus>,
) -> Vec<String> {
    let mut updated = Vec::new();
    if status.pid_request_map.is_empty() && status.hard_limit_request_map.is_empty() {
        return updated;
    }
    for (cdev_name, cdev_status) in cdev_status_map.iter_mut() {
        let Some(entry) = cdev_status.requests.get_mut(sensor_name) else {
            continue;
        };
        let pid_request = status.pid_request_map.get(cdev_name).copied().unwrap_or(0);
        let limit_request = status
            .hard_limit_request_map
            .get(cdev_name)
            .copied()
            .unwrap_or(0);
        let request_state = pid_request.max(limit_request);
        log::debug!(
            "Sensor {}: {} aggregation result is {}",
            sensor_name,
            cdev_name,
            request_state
        );
        if *entry != request_state {
            *entry = request_state;
            updated.push(cdev_name.clone());
        }
    }
    updated
}
