//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::ThermalError;
use crate::hal::validate_value;

use std::fs;
use std::io;
use std::path::Path;

pub fn read_to_string(path: &Path) -> Result<String, ThermalError> {
    fs::read_to_string(path).map_err(ThermalError::IoError)
}

/// Single unbuffered write of the value plus a trailing newline.
pub fn write_value(path: &Path, value: &str) -> Result<(), ThermalError> {
    if !validate_value(value) {
        return Err(ThermalError::InvalidInput(format!(
            "Invalid characters in value for {}: '{}'",
            path.display(),
            value
        )));
    }
    let mut buffer = [0u8; 64];
    let val_bytes = value.as_bytes();
    if val_bytes.len() + 1 > buffer.len() {
        return Err(ThermalError::InvalidInput(
            "Value too long for stack buffer".into(),
        ));
    }
    buffer[..val_bytes.len()].copy_from_slice(val_bytes);
    buffer[val_bytes.len()] = b'\n';
    let final_slice = &buffer[..val_bytes.len() + 1];
    let fd = rustix::fs::openat(
        rustix::fs::CWD,
        path,
        rustix::fs::OFlags::WRONLY | rustix::fs::OFlags::TRUNC | rustix::fs::OFlags::CLOEXEC,
        rustix::fs::Mode::empty(),
    )
    .map_err(|e| {
        log::debug!("Openat failed for {}: {}", path.display(), e);
        ThermalError::IoError(io::Error::from(e))
    })?;
    rustix::io::write(&fd, final_slice).map_err(|e| {
        log::debug!("Write raw failed '{}' -> {}: {}", value, path.display(), e);
        ThermalError::IoError(io::Error::from(e))
    })?;
    Ok(())
}
