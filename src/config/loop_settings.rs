//! Author: [Seclususs](https://github.com/seclususs)

pub const MIN_POLL_INTERVAL_MS: u64 = 2_000;
pub const MAX_SLEEP_MS: u64 = i32::MAX as u64;
pub const WATCHER_ERROR_BACKOFF_MS: u64 = 500;
