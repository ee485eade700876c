//! Author: [Seclususs](https://github.com/seclususs)

use std::time::Duration;

/// CLOCK_BOOTTIME, so time spent suspended still counts toward sensor
/// due intervals.
pub fn boottime_now() -> Duration {
    let ts = rustix::time::clock_gettime(rustix::time::ClockId::Boottime);
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}
