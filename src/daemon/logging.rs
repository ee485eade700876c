//! Author: [Seclususs](https://github.com/seclususs)

use android_logger;
use log;

pub fn init() {
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    android_logger::init_once(
        android_logger::Config::default()
            .with_tag("ThermalCore")
            .with_max_level(level),
    );
}
