pub mod loop_settings;
pub mod sensor_info;
