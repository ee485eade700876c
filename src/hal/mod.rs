pub mod filesystem;
pub mod power_hal;
pub mod sysfs;
pub mod uevent;

pub fn validate_value(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == '=' || c == ' ')
}
