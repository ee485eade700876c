//! Author: [Seclususs](https://github.com/seclususs)

use crate::algorithms::{pid_math, poll_math, severity_math, virtual_math};
use crate::config::loop_settings::MIN_POLL_INTERVAL_MS;
use crate::config::sensor_info::{
    CdevInfo, COMBINATION_COUNT, CoolingType, SEVERITY_COUNT, SensorInfo, SensorType, Severity,
};
use crate::controllers::thermal_logic;
use crate::daemon::state::{CdevRequestStatus, SensorSeverity, SensorThrottling};
use crate::daemon::types::{
    CoolingDeviceState, NotificationCallback, Temperature, TemperatureThreshold, ThermalError,
};
use crate::daemon::watcher::ThermalWatcher;
use crate::hal::filesystem;
use crate::hal::power_hal::{PowerExtConnector, PowerHalService};
use crate::hal::sysfs::SysfsFileMap;
use crate::hal::uevent::UeventMonitor;
use crate::monitors::cpu_usage::{CpuUsage, CpuUsageMonitor};
use crate::resources::discovery;
use crate::resources::sys_paths::{
    K_COOLING_DEVICE_CUR_STATE_SUFFIX, K_COOLING_DEVICE_PREFIX, K_SENSOR_POLICY_FILE,
    K_SENSOR_PREFIX, K_SENSOR_TEMP_SUFFIX, K_SENSOR_TRIP_POINT_HYST_ZERO_FILE,
    K_SENSOR_TRIP_POINT_TEMP_ZERO_FILE, K_USER_SPACE_SUFFIX, ThermalPaths,
};
use crate::utils::clock;

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Mutable control-loop state. Locked by the watcher alone; snapshot
/// readers never touch it.
struct LoopState {
    throttling: HashMap<String, SensorThrottling>,
    cdev_status: HashMap<String, CdevRequestStatus>,
}

/// The thermal control core: classifies sensor readings, runs the PID
/// and hard-limit policies and drives cooling devices. One instance per
/// daemon, shared between the watcher thread and snapshot callers.
pub struct ThermalHelper {
    sensor_info_map: HashMap<String, SensorInfo>,
    cdev_info_map: HashMap<String, CdevInfo>,
    sensor_files: SysfsFileMap,
    cdev_files: SysfsFileMap,
    severity_map: RwLock<HashMap<String, SensorSeverity>>,
    loop_state: Mutex<LoopState>,
    supported_powerhint_map: Mutex<HashMap<String, [Severity; SEVERITY_COUNT]>>,
    power_hal: PowerHalService,
    cpu_monitor: CpuUsageMonitor,
    monitored_sensors: BTreeSet<String>,
    callback: Option<NotificationCallback>,
}

impl ThermalHelper {
    pub fn new(
        mut sensor_info_map: HashMap<String, SensorInfo>,
        cdev_info_map: HashMap<String, CdevInfo>,
        paths: ThermalPaths,
        callback: Option<NotificationCallback>,
        power_connector: PowerExtConnector,
    ) -> Result<Self, ThermalError> {
        // Every cooling device referenced by a sensor must be configured.
        for (name, info) in &sensor_info_map {
            for cdev_name in info
                .throttling
                .cdev_request
                .iter()
                .chain(info.throttling.limit_info.keys())
            {
                if !cdev_info_map.contains_key(cdev_name) {
                    return Err(ThermalError::ConfigError(format!(
                        "Could not find {} in cooling device info map (sensor {})",
                        cdev_name, name
                    )));
                }
            }
        }
        for (name, cdev_info) in &cdev_info_map {
            if cdev_info.power2state.is_empty() {
                return Err(ThermalError::ConfigError(format!(
                    "{} has an empty power2state table",
                    name
                )));
            }
            if cdev_info.power2state.windows(2).any(|w| w[1] > w[0]) {
                return Err(ThermalError::ConfigError(format!(
                    "{} power2state table is not non-increasing",
                    name
                )));
            }
        }

        let tz_map = discovery::parse_thermal_path_map(&paths.thermal_root, K_SENSOR_PREFIX);
        let cdev_path_map =
            discovery::parse_thermal_path_map(&paths.thermal_root, K_COOLING_DEVICE_PREFIX);

        // A sensor missing from the scan is dropped from monitoring; a
        // missing cooling device leaves nothing safe to drive.
        let mut sensor_files = SysfsFileMap::new();
        sensor_info_map.retain(|name, info| {
            let zone_name = info
                .virtual_sensor
                .as_ref()
                .map_or(name.as_str(), |v| v.trigger_sensor.as_str());
            match tz_map.get(zone_name) {
                Some(zone_path) => {
                    sensor_files.add_file(name, zone_path.join(K_SENSOR_TEMP_SUFFIX));
                    true
                }
                None => {
                    log::error!("Could not find {} in sysfs, dropping sensor {}", zone_name, name);
                    false
                }
            }
        });
        let mut cdev_files = SysfsFileMap::new();
        for name in cdev_info_map.keys() {
            let Some(cdev_path) = cdev_path_map.get(name) else {
                return Err(ThermalError::ConfigError(format!(
                    "Could not find {} in sysfs",
                    name
                )));
            };
            cdev_files.add_file(name, cdev_path.join(K_COOLING_DEVICE_CUR_STATE_SUFFIX));
        }

        let mut severity_map = HashMap::new();
        let mut throttling_map = HashMap::new();
        let mut cdev_status_map: HashMap<String, CdevRequestStatus> = HashMap::new();
        for (name, info) in &sensor_info_map {
            let mut status = SensorThrottling::new();
            for cdev_name in &info.throttling.cdev_request {
                status.pid_request_map.insert(cdev_name.clone(), 0);
                cdev_status_map
                    .entry(cdev_name.clone())
                    .or_default()
                    .requests
                    .insert(name.clone(), 0);
            }
            for cdev_name in info.throttling.limit_info.keys() {
                status.hard_limit_request_map.insert(cdev_name.clone(), 0);
                cdev_status_map
                    .entry(cdev_name.clone())
                    .or_default()
                    .requests
                    .insert(name.clone(), 0);
            }
            severity_map.insert(name.clone(), SensorSeverity::new());
            throttling_map.insert(name.clone(), status);
        }

        let mut monitored_sensors = BTreeSet::new();
        Self::initialize_trip(&mut sensor_info_map, &tz_map, &mut monitored_sensors);

        let cpu_monitor = CpuUsageMonitor::new(
            paths.cpu_usage_file.clone(),
            paths.cpu_online_root.clone(),
            &paths.cpu_present_file,
        );

        let helper = Self {
            sensor_info_map,
            cdev_info_map,
            sensor_files,
            cdev_files,
            severity_map: RwLock::new(severity_map),
            loop_state: Mutex::new(LoopState {
                throttling: throttling_map,
                cdev_status: cdev_status_map,
            }),
            supported_powerhint_map: Mutex::new(HashMap::new()),
            power_hal: PowerHalService::new(power_connector),
            cpu_monitor,
            monitored_sensors,
            callback,
        };
        if !helper.power_hal.connect() {
            log::error!("Fail to connect to power HAL");
        } else {
            helper.update_supported_power_hints();
        }
        Ok(helper)
    }

    /// Sensors eligible for uevent wake-up after trip programming.
    pub fn monitored_sensors(&self) -> &BTreeSet<String> {
        &self.monitored_sensors
    }

    pub fn current_severity(&self, sensor_name: &str) -> Option<Severity> {
        let severity_map = self.severity_map.read().ok()?;
        severity_map.get(sensor_name).map(|s| s.severity)
    }

    /// Wire the helper to a uevent transport and spawn the watcher.
    pub fn start_watching(
        self: &Arc<Self>,
        mut monitor: Box<dyn UeventMonitor>,
    ) -> Result<ThermalWatcher, ThermalError> {
        monitor.register_files_to_watch(&self.monitored_sensors)?;
        let helper = Arc::clone(self);
        ThermalWatcher::start(
            monitor,
            Box::new(move |triggered| helper.thermal_watcher_callback(triggered)),
        )
        .map_err(ThermalError::IoError)
    }

    /// Program the zone-0 trip point of every monitored physical sensor
    /// whose policy is user_space; everything else falls back to plain
    /// polling at the floor interval.
    fn initialize_trip(
        sensor_info_map: &mut HashMap<String, SensorInfo>,
        tz_map: &HashMap<String, PathBuf>,
        monitored_sensors: &mut BTreeSet<String>,
    ) {
        for (name, info) in sensor_info_map.iter_mut() {
            if !info.is_monitor || info.is_virtual() {
                continue;
            }
            let Some(tz_path) = tz_map.get(name) else {
                continue;
            };
            let mut support_uevent = false;
            let policy_path = tz_path.join(K_SENSOR_POLICY_FILE);
            match fs::read_to_string(&policy_path) {
                Err(e) => {
                    log::error!(
                        "{} could not open tz policy file {}: {}",
                        name,
                        policy_path.display(),
                        e
                    );
                }
                Ok(policy) => {
                    if policy.trim() != K_USER_SPACE_SUFFIX {
                        log::error!("{} does not support uevent notify", name);
                    } else {
                        support_uevent = true;
                    }
                }
            }
            if support_uevent {
                support_uevent = Self::program_trip_point(name, info, tz_path);
            }
            if support_uevent {
                monitored_sensors.insert(name.clone());
            } else {
                log::info!(
                    "config sensor: {} to default polling interval: {}ms",
                    name,
                    MIN_POLL_INTERVAL_MS
                );
                info.polling_delay = Duration::from_millis(MIN_POLL_INTERVAL_MS);
                info.passive_delay = Duration::from_millis(MIN_POLL_INTERVAL_MS);
            }
        }
    }

    /// Write the lowest fully-specified hot threshold and its hysteresis
    /// into the kernel trip files, scaled back to raw units.
    fn program_trip_point(name: &str, info: &SensorInfo, tz_path: &Path) -> bool {
        for i in 0..SEVERITY_COUNT {
            if info.hot_thresholds[i].is_nan() || info.hot_hysteresis[i].is_nan() {
                continue;
            }
            let threshold = ((info.hot_thresholds[i] / info.multiplier) as i32).to_string();
            let temp_path = tz_path.join(K_SENSOR_TRIP_POINT_TEMP_ZERO_FILE);
            if let Err(e) = filesystem::write_value(&temp_path, &threshold) {
                log::error!(
                    "fail to update {} trip point: {} to {}: {}",
                    name,
                    temp_path.display(),
                    threshold,
                    e
                );
                return false;
            }
            let hysteresis = ((info.hot_hysteresis[i] / info.multiplier) as i32).to_string();
            let hyst_path = tz_path.join(K_SENSOR_TRIP_POINT_HYST_ZERO_FILE);
            if let Err(e) = filesystem::write_value(&hyst_path, &hysteresis) {
                log::error!("fail to update {} trip hyst {}: {}", name, hysteresis, e);
                return false;
            }
            return true;
        }
        log::error!("{}: all thresholds are NAN", name);
        false
    }

    pub fn read_temperature(&self, sensor_name: &str) -> Result<Temperature, ThermalError> {
        self.read_temperature_with_status(sensor_name)
            .map(|(temperature, _)| temperature)
    }

    /// Read and classify one sensor without committing any state. Takes
    /// the severity lock shared, so watcher and snapshot callers can
    /// both use it.
    fn read_temperature_with_status(
        &self,
        sensor_name: &str,
    ) -> Result<(Temperature, (Severity, Severity)), ThermalError> {
        let Some(info) = self.sensor_info_map.get(sensor_name) else {
            return Err(ThermalError::SensorMissing(format!(
                "sensor not found: {}",
                sensor_name
            )));
        };
        let raw = if info.is_virtual() {
            self.check_virtual_sensor(sensor_name, info)?
        } else {
            self.sensor_files.read_file(sensor_name)?
        };
        if raw.is_empty() {
            return Err(ThermalError::ParseError(format!(
                "failed to read sensor: {}",
                sensor_name
            )));
        }
        let reading: f32 = raw.parse().map_err(|_| {
            ThermalError::ParseError(format!("bad reading '{}' from {}", raw, sensor_name))
        })?;
        let value = reading * info.multiplier;

        let mut status = (Severity::None, Severity::None);
        if info.is_monitor {
            let (prev_hot, prev_cold) = if let Ok(severity_map) = self.severity_map.read() {
                severity_map
                    .get(sensor_name)
                    .map(|s| (s.prev_hot_severity, s.prev_cold_severity))
                    .unwrap_or((Severity::None, Severity::None))
            } else {
                (Severity::None, Severity::None)
            };
            status = severity_math::severity_from_thresholds(
                &info.hot_thresholds,
                &info.cold_thresholds,
                &info.hot_hysteresis,
                &info.cold_hysteresis,
                prev_hot,
                prev_cold,
                value,
            );
        }
        let throttling_status = status.0.max(status.1);
        Ok((
            Temperature {
                sensor_type: info.sensor_type,
                name: sensor_name.to_string(),
                value,
                throttling_status,
            },
            status,
        ))
    }

    /// Combine the linked physical readings of a virtual sensor. The
    /// result stays a raw string so the caller's multiplier applies the
    /// same way it does for physical zones.
    fn check_virtual_sensor(
        &self,
        sensor_name: &str,
        info: &SensorInfo,
    ) -> Result<String, ThermalError> {
        let Some(virtual_info) = info.virtual_sensor.as_ref() else {
            return Err(ThermalError::ConfigError(format!(
                "{} is not a virtual sensor",
                sensor_name
            )));
        };
        let mut parts = Vec::new();
        for (i, linked) in virtual_info
            .linked_sensors
            .iter()
            .take(COMBINATION_COUNT)
            .enumerate()
        {
            if linked == "NAN" || linked.is_empty() {
                continue;
            }
            let Some(coefficient) = virtual_info.coefficients.get(i).copied() else {
                continue;
            };
            if coefficient.is_nan() {
                continue;
            }
            let Ok(data) = self.sensor_files.read_file(linked) else {
                continue;
            };
            let Ok(reading) = data.parse::<f32>() else {
                continue;
            };
            parts.push((reading, coefficient));
        }
        Ok(virtual_math::combine(virtual_info.formula, &parts).to_string())
    }

    /// One control-loop pass. `uevent_sensors` holds the zones that
    /// fired; an empty set means the timer elapsed. Returns how long the
    /// watcher may sleep.
    pub fn thermal_watcher_callback(&self, uevent_sensors: &BTreeSet<String>) -> Duration {
        let now = clock::boottime_now();
        let mut temps: Vec<Temperature> = Vec::new();
        let mut cooling_devices_to_update: Vec<String> = Vec::new();
        let mut sleep_vote = poll_math::SleepVote::new();

        let Ok(mut guard) = self.loop_state.lock() else {
            return Duration::from_millis(MIN_POLL_INTERVAL_MS);
        };
        let LoopState {
            throttling,
            cdev_status,
        } = &mut *guard;

        for (sensor_name, status) in throttling.iter_mut() {
            let Some(info) = self.sensor_info_map.get(sensor_name) else {
                continue;
            };
            if !info.is_monitor {
                continue;
            }
            let uevent_sensor_name = info
                .virtual_sensor
                .as_ref()
                .map_or(sensor_name.as_str(), |v| v.trigger_sensor.as_str());

            let time_elapsed = now.saturating_sub(status.last_update_time);
            let mut sleep_duration = poll_math::due_interval(info, status.severity);
            if time_elapsed < sleep_duration
                && (uevent_sensors.is_empty() || !uevent_sensors.contains(uevent_sensor_name))
            {
                sleep_vote.vote(sleep_duration - time_elapsed);
                continue;
            }

            let (temp, throttling_status) = match self.read_temperature_with_status(sensor_name) {
                Ok(result) => result,
                Err(e) => {
                    log::error!("error reading temperature for sensor {}: {}", sensor_name, e);
                    continue;
                }
            };

            // Commit the hysteresis memory and, on a transition, the new
            // severity, under the writer lock.
            if let Ok(mut severity_map) = self.severity_map.write()
                && let Some(entry) = severity_map.get_mut(sensor_name)
            {
                entry.prev_hot_severity = throttling_status.0;
                entry.prev_cold_severity = throttling_status.1;
                if temp.throttling_status != status.severity {
                    status.severity = temp.throttling_status;
                    entry.severity = status.severity;
                    temps.push(temp.clone());
                    sleep_duration = poll_math::due_interval(info, status.severity);
                }
            }

            if status.severity != Severity::None {
                log::info!("{}: {} degC", temp.name, temp.value);
            }

            let severity = status.severity;
            if !status.pid_request_map.is_empty() {
                let budget = pid_math::power_budget(
                    temp.value,
                    severity,
                    info,
                    &mut status.pid,
                    time_elapsed.as_millis() as u64,
                );
                if !thermal_logic::request_cdev_by_power(
                    sensor_name,
                    status,
                    info,
                    &self.cdev_info_map,
                    budget,
                ) {
                    log::error!("Sensor {} PID request cdev failed", temp.name);
                }
            }
            if !status.hard_limit_request_map.is_empty() {
                thermal_logic::request_cdev_by_severity(sensor_name, status, info, severity);
            }
            cooling_devices_to_update.extend(thermal_logic::aggregate_cdev_requests(
                sensor_name,
                status,
                cdev_status,
            ));

            sleep_vote.vote(sleep_duration);
            status.last_update_time = now;
        }

        if !cooling_devices_to_update.is_empty() {
            self.update_cooling_devices(&cooling_devices_to_update, cdev_status);
        }
        drop(guard);

        for temperature in &temps {
            let Some(info) = self.sensor_info_map.get(&temperature.name) else {
                continue;
            };
            if info.send_cb && let Some(cb) = self.callback.as_ref() {
                cb(temperature);
            }
            if info.send_powerhint && self.ensure_power_hal() {
                self.send_power_ext_hint(temperature);
            }
        }

        sleep_vote.resolve()
    }

    /// Push the aggregated max of each flagged cooling device, skipping
    /// devices whose max matches what sysfs already holds.
    fn update_cooling_devices(
        &self,
        updated_cdevs: &[String],
        cdev_status_map: &mut HashMap<String, CdevRequestStatus>,
    ) {
        for cdev_name in updated_cdevs {
            let Some(status) = cdev_status_map.get_mut(cdev_name) else {
                continue;
            };
            let max_state = status.max_request();
            if status.last_written == Some(max_state) {
                continue;
            }
            match self.cdev_files.write_file(cdev_name, &max_state.to_string()) {
                Ok(()) => {
                    status.last_written = Some(max_state);
                    log::debug!("Successfully update cdev {} sysfs to {}", cdev_name, max_state);
                }
                Err(e) => {
                    log::error!("Failed to update cdev {} sysfs: {}", cdev_name, e);
                }
            }
        }
    }

    fn ensure_power_hal(&self) -> bool {
        if self.power_hal.is_connected() {
            return true;
        }
        if self.power_hal.connect() {
            self.update_supported_power_hints();
            return true;
        }
        false
    }

    /// For every hint-enabled sensor, map each severity to the highest
    /// severity the power service actually supports at or below it.
    fn update_supported_power_hints(&self) {
        let Ok(mut supported) = self.supported_powerhint_map.lock() else {
            return;
        };
        for (name, info) in &self.sensor_info_map {
            if !info.send_powerhint {
                continue;
            }
            let mut current = Severity::None;
            let mut table = [Severity::None; SEVERITY_COUNT];
            for severity in Severity::iter() {
                if severity == Severity::None {
                    continue;
                }
                if self.power_hal.is_mode_supported(name, severity) {
                    current = severity;
                }
                table[severity.index()] = current;
            }
            supported.insert(name.clone(), table);
        }
    }

    /// Swap the active hint when the effective severity moved: clear the
    /// old one, raise the new one, remember what was sent.
    fn send_power_ext_hint(&self, temperature: &Temperature) {
        let current_hint = {
            let Ok(supported) = self.supported_powerhint_map.lock() else {
                return;
            };
            supported
                .get(&temperature.name)
                .map(|table| table[temperature.throttling_status.index()])
                .unwrap_or(Severity::None)
        };
        let Ok(mut severity_map) = self.severity_map.write() else {
            return;
        };
        let Some(entry) = severity_map.get_mut(&temperature.name) else {
            return;
        };
        if entry.prev_hint_severity == current_hint {
            return;
        }
        if entry.prev_hint_severity != Severity::None {
            self.power_hal
                .set_mode(&temperature.name, entry.prev_hint_severity, false);
        }
        if current_hint != Severity::None {
            self.power_hal.set_mode(&temperature.name, current_hint, true);
        }
        entry.prev_hint_severity = current_hint;
    }

    /// Best-effort temperature snapshot; unreadable sensors are logged
    /// and skipped.
    pub fn fill_current_temperatures(&self, filter_type: Option<SensorType>) -> Vec<Temperature> {
        let mut ret = Vec::new();
        for (name, info) in &self.sensor_info_map {
            if let Some(wanted) = filter_type
                && info.sensor_type != wanted
            {
                continue;
            }
            match self.read_temperature(name) {
                Ok(temperature) => ret.push(temperature),
                Err(e) => log::error!("error reading temperature for sensor {}: {}", name, e),
            }
        }
        ret
    }

    pub fn fill_temperature_thresholds(
        &self,
        filter_type: Option<SensorType>,
    ) -> Vec<TemperatureThreshold> {
        let mut ret = Vec::new();
        for (name, info) in &self.sensor_info_map {
            if let Some(wanted) = filter_type
                && info.sensor_type != wanted
            {
                continue;
            }
            ret.push(TemperatureThreshold {
                sensor_type: info.sensor_type,
                name: name.clone(),
                hot_thresholds: info.hot_thresholds,
                cold_thresholds: info.cold_thresholds,
                vr_threshold: info.vr_threshold,
            });
        }
        ret
    }

    pub fn read_cooling_device(&self, cdev_name: &str) -> Result<CoolingDeviceState, ThermalError> {
        let Some(info) = self.cdev_info_map.get(cdev_name) else {
            return Err(ThermalError::SensorMissing(format!(
                "cooling device not found: {}",
                cdev_name
            )));
        };
        let data = self.cdev_files.read_file(cdev_name)?;
        let value: i32 = data.parse().map_err(|_| {
            ThermalError::ParseError(format!("bad state '{}' from {}", data, cdev_name))
        })?;
        Ok(CoolingDeviceState {
            cooling_type: info.cooling_type,
            name: cdev_name.to_string(),
            value,
        })
    }

    pub fn fill_current_cooling_devices(
        &self,
        filter_type: Option<CoolingType>,
    ) -> Vec<CoolingDeviceState> {
        let mut ret = Vec::new();
        for (name, info) in &self.cdev_info_map {
            if let Some(wanted) = filter_type
                && info.cooling_type != wanted
            {
                continue;
            }
            match self.read_cooling_device(name) {
                Ok(state) => ret.push(state),
                Err(e) => log::error!("error reading cooling device {}: {}", name, e),
            }
        }
        ret
    }

    pub fn fill_cpu_usages(&self) -> Vec<CpuUsage> {
        self.cpu_monitor.fill_cpu_usages()
    }
}
