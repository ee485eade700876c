//! Author: [Seclususs](https://github.com/seclususs)

use crate::config::sensor_info::Severity;
use crate::daemon::types::ThermalError;

use std::sync::Mutex;

/// Contract presented by the platform power service. The binder plumbing
/// behind it is not part of this crate.
pub trait PowerExtProxy: Send {
    fn is_mode_supported(&self, mode: &str) -> Result<bool, ThermalError>;
    fn set_mode(&self, mode: &str, enabled: bool) -> Result<(), ThermalError>;
}

/// Produces a fresh proxy, or None while the peer is unreachable.
pub type PowerExtConnector = Box<dyn Fn() -> Option<Box<dyn PowerExtProxy>> + Send + Sync>;

pub fn power_hint(sensor: &str, severity: Severity) -> String {
    format!("THERMAL_{}_{}", sensor, severity)
}

/// Connection keeper for the power service. Any RPC failure drops the
/// proxy; the next `connect` call re-dials the peer.
pub struct PowerHalService {
    connector: PowerExtConnector,
    proxy: Mutex<Option<Box<dyn PowerExtProxy>>>,
}

impl PowerHalService {
    pub fn new(connector: PowerExtConnector) -> Self {
        Self {
            connector,
            proxy: Mutex::new(None),
        }
    }

    pub fn connect(&self) -> bool {
        let Ok(mut guard) = self.proxy.lock() else {
            return false;
        };
        if guard.is_some() {
            return true;
        }
        match (self.connector)() {
            Some(proxy) => {
                *guard = Some(proxy);
                true
            }
            None => {
                log::error!("Cannot get power HAL extension");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.proxy.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    pub fn is_mode_supported(&self, sensor: &str, severity: Severity) -> bool {
        let hint = power_hint(sensor, severity);
        let Ok(mut guard) = self.proxy.lock() else {
            return false;
        };
        let Some(proxy) = guard.as_ref() else {
            return false;
        };
        match proxy.is_mode_supported(&hint) {
            Ok(supported) => supported,
            Err(e) => {
                log::error!("Fail to check supported mode, hint: {}: {}", hint, e);
                *guard = None;
                false
            }
        }
    }

    pub fn set_mode(&self, sensor: &str, severity: Severity, enabled: bool) {
        let hint = power_hint(sensor, severity);
        let Ok(mut guard) = self.proxy.lock() else {
            return;
        };
        let Some(proxy) = guard.as_ref() else {
            return;
        };
        log::info!("Send hint {} enable: {}", hint, enabled);
        if let Err(e) = proxy.set_mode(&hint, enabled) {
            log::error!("Fail to set mode, hint: {}: {}", hint, e);
            *guard = None;
        }
    }
}
