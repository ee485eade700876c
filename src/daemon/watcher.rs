//! Author: [Seclususs](https://github.com/seclususs)

use crate::config::loop_settings::{MIN_POLL_INTERVAL_MS, WATCHER_ERROR_BACKOFF_MS};
use crate::daemon::state::SHUTDOWN_REQUESTED;
use crate::hal::uevent::UeventMonitor;

use std::collections::BTreeSet;
use std::io;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

/// Invoked with the set of uevent-triggered sensors (empty on a timer
/// expiry); returns how long the watcher may sleep before the next pass.
pub type WatcherCallback = Box<dyn FnMut(&BTreeSet<String>) -> Duration + Send>;

/// Long-lived thread driving the control loop off uevents and timers.
pub struct ThermalWatcher {
    handle: Option<thread::JoinHandle<()>>,
}

impl ThermalWatcher {
    pub fn start(
        mut monitor: Box<dyn UeventMonitor>,
        mut callback: WatcherCallback,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("thermal_watcher".to_string())
            .spawn(move || {
                let floor = Duration::from_millis(MIN_POLL_INTERVAL_MS);
                let mut sleep = floor;
                while !SHUTDOWN_REQUESTED.load(Ordering::Acquire) {
                    let triggered = match monitor.wait(sleep) {
                        Ok(triggered) => triggered,
                        Err(e) => {
                            log::warn!("uevent wait failed: {}", e);
                            thread::sleep(Duration::from_millis(WATCHER_ERROR_BACKOFF_MS));
                            BTreeSet::new()
                        }
                    };
                    if SHUTDOWN_REQUESTED.load(Ordering::Acquire) {
                        break;
                    }
                    sleep = callback(&triggered).max(floor);
                }
            })?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
