//! Author: [Seclususs](https://github.com/seclususs)

use crate::resources::sys_paths::K_THERMAL_NAME_FILE;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Scan the thermal root for `<prefix>*` directories and map each zone's
/// declared type name to its directory. Unreadable `type` files are
/// logged and skipped.
pub fn parse_thermal_path_map(root: &Path, prefix: &str) -> HashMap<String, PathBuf> {
    let mut path_map = HashMap::new();
    let Ok(entries) = fs::read_dir(root) else {
        return path_map;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let is_match = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with(prefix));
        if !is_match {
            continue;
        }
        match fs::read_to_string(path.join(K_THERMAL_NAME_FILE)) {
            Ok(name) => {
                path_map.insert(name.trim().to_string(), path);
            }
            Err(e) => {
                log::error!("Failed to read type from {}: {}", path.display(), e);
            }
        }
    }
    path_map
}

/// Core count from the kernel `present` file, a single `min-max` line.
/// 0 on any failure, which disables the CPU usage snapshot.
pub fn get_number_of_cores(present_file: &Path) -> usize {
    let file = match fs::read_to_string(present_file) {
        Ok(file) => file,
        Err(e) => {
            log::error!(
                "Error reading CPU present file {}: {}",
                present_file.display(),
                e
            );
            return 0;
        }
    };
    match parse_present_range(file.trim()) {
        Some(count) => count,
        None => {
            log::error!("Error parsing CPU present file content: {}", file.trim());
            0
        }
    }
}

fn parse_present_range(content: &str) -> Option<usize> {
    let (min, max) = content.split_once('-')?;
    let min: u64 = min.trim().parse().ok()?;
    let max: u64 = max.trim().parse().ok()?;
    if max < min {
        return None;
    }
    Some((max - min + 1) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "thermal_core_discovery_{}_{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn present_range_parses_min_max() {
        assert_eq!(parse_present_range("0-7"), Some(8));
        assert_eq!(parse_present_range("2-3"), Some(2));
        assert_eq!(parse_present_range("0-0"), Some(1));
    }

    #[test]
    fn present_range_rejects_garbage() {
        assert_eq!(parse_present_range("8"), None);
        assert_eq!(parse_present_range("7-0"), None);
        assert_eq!(parse_present_range("a-b"), None);
    }

    #[test]
    fn scan_maps_type_names_to_directories() {
        let root = scratch_dir("scan");
        for (dir, name) in [
            ("thermal_zone0", "cpu"),
            ("thermal_zone1", "skin"),
            ("cooling_device0", "fan"),
        ] {
            let zone = root.join(dir);
            fs::create_dir_all(&zone).unwrap();
            fs::write(zone.join("type"), format!("{}\n", name)).unwrap();
        }
        let zones = parse_thermal_path_map(&root, "thermal_zone");
        assert_eq!(zones.len(), 2);
        assert_eq!(zones["cpu"], root.join("thermal_zone0"));
        assert_eq!(zones["skin"], root.join("thermal_zone1"));
        let cdevs = parse_thermal_path_map(&root, "cooling_device");
        assert_eq!(cdevs.len(), 1);
        assert!(cdevs.contains_key("fan"));
    }

    #[test]
    fn zone_without_type_file_is_skipped() {
        let root = scratch_dir("no_type");
        fs::create_dir_all(root.join("thermal_zone0")).unwrap();
        assert!(parse_thermal_path_map(&root, "thermal_zone").is_empty());
    }

    #[test]
    fn missing_root_yields_empty_map() {
        let root = scratch_dir("gone").join("nothing");
        assert!(parse_thermal_path_map(&root, "thermal_zone").is_empty());
    }
}
