//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::ThermalError;

use std::collections::BTreeSet;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Contract presented by the kernel notification transport. The watcher
/// blocks in `wait` and treats an empty set as an elapsed timer.
pub trait UeventMonitor: Send {
    /// Restrict wake-ups to the given sensors. Called once after trip
    /// programming has established which zones can notify.
    fn register_files_to_watch(&mut self, sensors: &BTreeSet<String>) -> Result<(), ThermalError>;

    /// Block until a watched zone fires or `timeout` elapses, returning
    /// the names of the triggering sensors.
    fn wait(&mut self, timeout: Duration) -> Result<BTreeSet<String>, ThermalError>;
}

/// Fallback for kernels without user_space trip support: every wake-up
/// is a timer expiry.
pub struct TimerMonitor;

impl UeventMonitor for TimerMonitor {
    fn register_files_to_watch(&mut self, _sensors: &BTreeSet<String>) -> Result<(), ThermalError> {
        Ok(())
    }
    fn wait(&mut self, timeout: Duration) -> Result<BTreeSet<String>, ThermalError> {
        thread::sleep(timeout);
        Ok(BTreeSet::new())
    }
}

/// Channel-fed monitor: the transport side pushes triggering zone names
/// through the sender, the watcher drains them with a timeout. Names
/// outside the registered filter set are discarded.
pub struct ChannelMonitor {
    receiver: mpsc::Receiver<String>,
    filter: BTreeSet<String>,
}

pub fn channel() -> (mpsc::Sender<String>, ChannelMonitor) {
    let (sender, receiver) = mpsc::channel();
    (
        sender,
        ChannelMonitor {
            receiver,
            filter: BTreeSet::new(),
        },
    )
}

impl UeventMonitor for ChannelMonitor {
    fn register_files_to_watch(&mut self, sensors: &BTreeSet<String>) -> Result<(), ThermalError> {
        self.filter = sensors.clone();
        Ok(())
    }

    fn wait(&mut self, timeout: Duration) -> Result<BTreeSet<String>, ThermalError> {
        let mut triggered = BTreeSet::new();
        match self.receiver.recv_timeout(timeout) {
            Ok(name) => {
                if self.filter.contains(&name) {
                    triggered.insert(name);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => return Ok(triggered),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(ThermalError::InvalidInput(
                    "uevent channel disconnected".to_string(),
                ));
            }
        }
        // Drain whatever arrived in the same burst.
        while let Ok(name) = self.receiver.try_recv() {
            if self.filter.contains(&name) {
                triggered.insert(name);
            }
        }
        Ok(triggered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_monitor_filters_unregistered_zones() {
        let (sender, mut monitor) = channel();
        let mut filter = BTreeSet::new();
        filter.insert("cpu".to_string());
        monitor.register_files_to_watch(&filter).unwrap();
        sender.send("cpu".to_string()).unwrap();
        sender.send("gpu".to_string()).unwrap();
        let triggered = monitor.wait(Duration::from_millis(100)).unwrap();
        assert!(triggered.contains("cpu"));
        assert!(!triggered.contains("gpu"));
    }

    #[test]
    fn timeout_returns_empty_set() {
        let (_sender, mut monitor) = channel();
        let triggered = monitor.wait(Duration::from_millis(10)).unwrap();
        assert!(triggered.is_empty());
    }

    #[test]
    fn disconnect_is_an_error() {
        let (sender, mut monitor) = channel();
        drop(sender);
        assert!(monitor.wait(Duration::from_millis(10)).is_err());
    }
}
