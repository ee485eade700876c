//! Author: [Seclususs](https://github.com/seclususs)

use crate::config::loop_settings::{MAX_SLEEP_MS, MIN_POLL_INTERVAL_MS};
use crate::config::sensor_info::{SensorInfo, Severity};

use std::time::Duration;

/// Passive delay while any throttling is active, polling delay otherwise.
pub fn due_interval(info: &SensorInfo, severity: Severity) -> Duration {
    if severity != Severity::None {
        info.passive_delay
    } else {
        info.polling_delay
    }
}

/// Min-reduction over the per-sensor sleep candidates of one iteration.
pub struct SleepVote {
    min: Option<Duration>,
}

impl SleepVote {
    pub fn new() -> Self {
        Self { min: None }
    }
    pub fn vote(&mut self, candidate: Duration) {
        if self.min.is_none_or(|m| candidate < m) {
            self.min = Some(candidate);
        }
    }
    /// Final sleep, floored so a noisy sensor cannot busy-loop the
    /// watcher. No votes means nothing is being polled and the watcher
    /// waits on uevents alone.
    pub fn resolve(&self) -> Duration {
        let floor = Duration::from_millis(MIN_POLL_INTERVAL_MS);
        match self.min {
            Some(d) if d > floor => d,
            Some(_) => floor,
            None => Duration::from_millis(MAX_SLEEP_MS),
        }
    }
}

impl Default for SleepVote {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_interval_switches_on_severity() {
        let mut info = SensorInfo::default();
        info.polling_delay = Duration::from_millis(10_000);
        info.passive_delay = Duration::from_millis(4_000);
        assert_eq!(due_interval(&info, Severity::None), info.polling_delay);
        assert_eq!(due_interval(&info, Severity::Light), info.passive_delay);
        assert_eq!(due_interval(&info, Severity::Shutdown), info.passive_delay);
    }

    #[test]
    fn vote_keeps_minimum() {
        let mut vote = SleepVote::new();
        vote.vote(Duration::from_millis(8_000));
        vote.vote(Duration::from_millis(3_000));
        vote.vote(Duration::from_millis(5_000));
        assert_eq!(vote.resolve(), Duration::from_millis(3_000));
    }

    #[test]
    fn resolve_applies_floor() {
        let mut vote = SleepVote::new();
        vote.vote(Duration::from_millis(10));
        assert_eq!(vote.resolve(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
    }

    #[test]
    fn no_votes_waits_on_uevents() {
        assert_eq!(
            SleepVote::new().resolve(),
            Duration::from_millis(MAX_SLEEP_MS)
        );
    }
}
