use crate::error::{MonitorError, Result};
use crate::metrics::CpuLoad;
use crate::ports::{read_lines, FileSource};

pub const LOADAVG_PATH: &str = "/proc/loadavg";

/// Reads the 1/5/15 minute load averages from `/proc/loadavg`
pub fn read_load(files: &dyn FileSource) -> Result<CpuLoad> {
    let lines = read_lines(files, LOADAVG_PATH)?;
    let Some(line) = lines.first() else {
        return Err(MonitorError::malformed(LOADAVG_PATH, "empty file"));
    };

    // Format: 1min 5min 15min running/total last_pid
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(MonitorError::malformed(
            LOADAVG_PATH,
            format!("expected 5 fields, found {}", fields.len()),
        ));
    }

    Ok(CpuLoad {
        load_avg_1_min: fields[0].parse().unwrap_or(0.0),
        load_avg_5_min: fields[1].parse().unwrap_or(0.0),
        load_avg_15_min: fields[2].parse().unwrap_or(0.0),
    })
}
