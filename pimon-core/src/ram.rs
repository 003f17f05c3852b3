use crate::error::{MonitorError, Result};
use crate::metrics::RamStats;
use crate::ports::{read_lines, FileSource};
use std::collections::HashMap;

pub const MEMINFO_PATH: &str = "/proc/meminfo";

/// Reads `/proc/meminfo`. Unlike the storage sources every line must parse.
pub fn read_stats(files: &dyn FileSource) -> Result<RamStats> {
    let lines = read_lines(files, MEMINFO_PATH)?;
    let mut stats: HashMap<&str, u64> = HashMap::new();

    for line in &lines {
        // Format: Key:   value kB
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(MonitorError::malformed(
                MEMINFO_PATH,
                format!("short line `{}`", line),
            ));
        }
        let key = fields[0].strip_suffix(':').unwrap_or(fields[0]);
        let value = fields[1].parse::<u64>().map_err(|_| {
            MonitorError::malformed(MEMINFO_PATH, format!("bad value for {}", key))
        })?;
        stats.insert(key, value);
    }

    if stats.is_empty() {
        return Err(MonitorError::malformed(MEMINFO_PATH, "no entries"));
    }

    let kib = |key: &str| stats.get(key).copied().unwrap_or(0) * 1024;
    Ok(RamStats {
        total: kib("MemTotal"),
        available: kib("MemAvailable"),
        free: kib("MemFree"),
        used: kib("MemTotal").saturating_sub(kib("MemFree")),
    })
}
