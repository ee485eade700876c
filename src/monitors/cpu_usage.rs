//! Author: [Seclususs](https://github.com/seclususs)

use crate::resources::discovery;
use crate::resources::sys_paths::K_CPU_ONLINE_FILE_SUFFIX;

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuUsage {
    pub name: String,
    pub active: u64,
    pub total: u64,
    pub is_online: bool,
}

/// Snapshot reader over the `/proc/stat`-style usage file and the
/// per-CPU `online` files.
pub struct CpuUsageMonitor {
    usage_file: PathBuf,
    online_root: PathBuf,
    max_cpus: usize,
}

impl CpuUsageMonitor {
    pub fn new(usage_file: PathBuf, online_root: PathBuf, present_file: &Path) -> Self {
        Self {
            usage_file,
            online_root,
            max_cpus: discovery::get_number_of_cores(present_file),
        }
    }

    pub fn max_cpus(&self) -> usize {
        self.max_cpus
    }

    /// Best-effort usage rows, one per present CPU. Rows the parse never
    /// reaches keep zero counters and `is_online = false`.
    pub fn fill_cpu_usages(&self) -> Vec<CpuUsage> {
        let mut usages: Vec<CpuUsage> = (0..self.max_cpus)
            .map(|i| CpuUsage {
                name: format!("cpu{}", i),
                active: 0,
                total: 0,
                is_online: false,
            })
            .collect();
        self.parse_usage_file(&mut usages);
        usages
    }

    fn parse_usage_file(&self, usages: &mut [CpuUsage]) {
        let data = match fs::read_to_string(&self.usage_file) {
            Ok(data) => data,
            Err(e) => {
                log::error!(
                    "Error reading cpu usage file {}: {}",
                    self.usage_file.display(),
                    e
                );
                return;
            }
        };
        for line in data.lines() {
            if !is_per_cpu_line(line) {
                continue;
            }
            let Some((cpu_num, active, total)) = parse_stat_line(line) else {
                log::warn!("Malformed cpu usage line: {}", line);
                continue;
            };
            if cpu_num >= usages.len() {
                log::error!("Unexpected cpu number: cpu{}", cpu_num);
                return;
            }
            let online_path = self
                .online_root
                .join(format!("cpu{}", cpu_num))
                .join(K_CPU_ONLINE_FILE_SUFFIX);
            let is_online = match fs::read_to_string(&online_path) {
                Ok(content) => content.trim() == "1",
                Err(_) => {
                    log::error!("Could not open CPU online file: {}", online_path.display());
                    if cpu_num != 0 {
                        return;
                    }
                    // Some architectures cannot offline cpu0.
                    true
                }
            };
            usages[cpu_num].active = active;
            usages[cpu_num].total = total;
            usages[cpu_num].is_online = is_online;
        }
    }
}

fn is_per_cpu_line(line: &str) -> bool {
    line.starts_with("cpu") && line.as_bytes().get(3).is_some_and(u8::is_ascii_digit)
}

/// `cpu<N> user nice system idle ...` -> `(N, active, total)`.
fn parse_stat_line(line: &str) -> Option<(usize, u64, u64)> {
    let mut words = line.split_whitespace();
    let cpu_num: usize = words.next()?.strip_prefix("cpu")?.parse().ok()?;
    let user: u64 = words.next()?.parse().ok()?;
    let nice: u64 = words.next()?.parse().ok()?;
    let system: u64 = words.next()?.parse().ok()?;
    let idle: u64 = words.next()?.parse().ok()?;
    let active = user + nice + system;
    Some((cpu_num, active, active + idle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("thermal_core_cpu_{}_{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fake_cpu_tree(tag: &str, stat: &str, online: &[(usize, &str)]) -> CpuUsageMonitor {
        let root = scratch_dir(tag);
        fs::write(root.join("stat"), stat).unwrap();
        fs::write(root.join("present"), "0-1\n").unwrap();
        for (num, value) in online {
            let cpu_dir = root.join(format!("cpu{}", num));
            fs::create_dir_all(&cpu_dir).unwrap();
            fs::write(cpu_dir.join("online"), value).unwrap();
        }
        CpuUsageMonitor::new(root.join("stat"), root.clone(), &root.join("present"))
    }

    #[test]
    fn stat_line_parses_counters() {
        assert_eq!(
            parse_stat_line("cpu0 100 20 30 400 5 6 7"),
            Some((0, 150, 550))
        );
        assert_eq!(parse_stat_line("cpu12 1 2 3 4"), Some((12, 6, 10)));
        assert_eq!(parse_stat_line("cpu0 1 2"), None);
        assert_eq!(parse_stat_line("intr 5 5 5 5"), None);
    }

    #[test]
    fn aggregate_line_is_not_per_cpu() {
        assert!(!is_per_cpu_line("cpu  100 20 30 400"));
        assert!(is_per_cpu_line("cpu0 100 20 30 400"));
    }

    #[test]
    fn fills_counters_and_online_flags() {
        let monitor = fake_cpu_tree(
            "fill",
            "cpu  200 40 60 800\ncpu0 100 20 30 400 1 2\ncpu1 100 20 30 400 1 2\n",
            &[(0, "1\n"), (1, "0\n")],
        );
        let usages = monitor.fill_cpu_usages();
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].active, 150);
        assert_eq!(usages[0].total, 550);
        assert!(usages[0].is_online);
        assert!(!usages[1].is_online);
    }

    #[test]
    fn malformed_line_is_skipped() {
        let monitor = fake_cpu_tree(
            "malformed",
            "cpu0 junk 20 30 400\ncpu1 100 20 30 400\n",
            &[(0, "1\n"), (1, "1\n")],
        );
        let usages = monitor.fill_cpu_usages();
        assert_eq!(usages[0].total, 0);
        assert_eq!(usages[1].active, 150);
    }

    #[test]
    fn unexpected_cpu_number_aborts_with_partial_result() {
        let monitor = fake_cpu_tree(
            "overflow",
            "cpu0 100 20 30 400\ncpu7 1 1 1 1\ncpu1 100 20 30 400\n",
            &[(0, "1\n"), (1, "1\n")],
        );
        let usages = monitor.fill_cpu_usages();
        assert_eq!(usages[0].active, 150);
        // cpu7 is out of range for a 2-core present file; the parse
        // stops there and cpu1 keeps its zero row.
        assert_eq!(usages[1].total, 0);
    }

    #[test]
    fn missing_online_file_only_forgiven_for_cpu0() {
        let monitor = fake_cpu_tree(
            "missing_online",
            "cpu0 100 20 30 400\ncpu1 100 20 30 400\n",
            &[],
        );
        let usages = monitor.fill_cpu_usages();
        assert!(usages[0].is_online);
        assert_eq!(usages[0].active, 150);
        // cpu1 has no online file, so the walk stops before its row.
        assert!(!usages[1].is_online);
        assert_eq!(usages[1].active, 0);
    }
}
