//! Author: [Seclususs](https://github.com/seclususs)

use crate::daemon::types::ThermalError;
use crate::hal::filesystem;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Logical-name keyed view over the sysfs files discovered at startup.
/// Immutable once initialization finishes.
#[derive(Debug, Default)]
pub struct SysfsFileMap {
    files: HashMap<String, PathBuf>,
}

impl SysfsFileMap {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    /// Register a file under a logical name. Returns false if the name
    /// is already taken.
    pub fn add_file(&mut self, name: &str, path: PathBuf) -> bool {
        if self.files.contains_key(name) {
            return false;
        }
        self.files.insert(name.to_string(), path);
        true
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }

    /// Read the file registered under `name`, trimmed. A transient
    /// failure surfaces as an error without touching any state.
    pub fn read_file(&self, name: &str) -> Result<String, ThermalError> {
        let path = self
            .files
            .get(name)
            .ok_or_else(|| ThermalError::SensorMissing(format!("No file registered for {}", name)))?;
        Ok(filesystem::read_to_string(path)?.trim().to_string())
    }

    pub fn write_file(&self, name: &str, value: &str) -> Result<(), ThermalError> {
        let path = self
            .files
            .get(name)
            .ok_or_else(|| ThermalError::SensorMissing(format!("No file registered for {}", name)))?;
        filesystem::write_value(path, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("thermal_core_sysfs_{}_{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn read_returns_trimmed_content() {
        let dir = scratch_dir("read");
        fs::write(dir.join("temp"), "45000\n").unwrap();
        let mut map = SysfsFileMap::new();
        assert!(map.add_file("cpu", dir.join("temp")));
        assert_eq!(map.read_file("cpu").unwrap(), "45000");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dir = scratch_dir("dup");
        let mut map = SysfsFileMap::new();
        assert!(map.add_file("cpu", dir.join("a")));
        assert!(!map.add_file("cpu", dir.join("b")));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn unknown_name_is_reported_missing() {
        let map = SysfsFileMap::new();
        assert!(matches!(
            map.read_file("ghost"),
            Err(ThermalError::SensorMissing(_))
        ));
        assert!(matches!(
            map.write_file("ghost", "1"),
            Err(ThermalError::SensorMissing(_))
        ));
    }

    #[test]
    fn write_updates_registered_file() {
        let dir = scratch_dir("write");
        fs::write(dir.join("cur_state"), "0\n").unwrap();
        let mut map = SysfsFileMap::new();
        map.add_file("fan", dir.join("cur_state"));
        map.write_file("fan", "3").unwrap();
        assert_eq!(fs::read_to_string(dir.join("cur_state")).unwrap(), "3\n");
    }
}
