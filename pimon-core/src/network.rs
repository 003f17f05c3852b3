use crate::error::Result;
use crate::metrics::{NetworkInterface, NetworkStats};
use crate::ports::{read_lines, CommandRunner, FileSource, ToolProbe};
use tracing::debug;

pub const NET_DEV_PATH: &str = "/proc/net/dev";
pub const IWCONFIG_TOOL: &str = "iwconfig";

fn parse_u64(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}

fn speed_unit_multiplier(unit: &str) -> u64 {
    match unit {
        "Kb/s" => 1_000,
        "Mb/s" => 1_000_000,
        "Gb/s" => 1_000_000_000,
        _ => 1,
    }
}

/// Reads counters for every interface in `/proc/net/dev` and probes each link speed.
///
/// Only the counters file is required; a speed that cannot be determined is reported as 0.
pub fn read_interfaces(
    files: &dyn FileSource,
    tools: &dyn ToolProbe,
    commands: &dyn CommandRunner,
) -> Result<Vec<NetworkInterface>> {
    let lines = read_lines(files, NET_DEV_PATH)?;

    Ok(lines
        .iter()
        .filter_map(|line| parse_counters(line))
        .map(|mut iface| {
            iface.bit_rate = link_speed(files, tools, commands, &iface.interface_name);
            iface
        })
        .collect())
}

/// Parses one `/proc/net/dev` row. Header rows and short rows yield `None`.
fn parse_counters(line: &str) -> Option<NetworkInterface> {
    // Large counters can run into the colon, so split on it rather than on whitespace
    let (name, counters) = line.split_once(':')?;
    let fields: Vec<&str> = counters.split_whitespace().collect();
    if fields.len() < 16 {
        return None;
    }

    let stats = |offset: usize| NetworkStats {
        bytes: parse_u64(fields[offset]),
        packets: parse_u64(fields[offset + 1]),
        errors: parse_u64(fields[offset + 2]),
        drops: parse_u64(fields[offset + 3]),
    };

    Some(NetworkInterface {
        interface_name: name.trim().to_string(),
        bit_rate: 0,
        rx: stats(0),
        tx: stats(8),
    })
}

fn link_speed(
    files: &dyn FileSource,
    tools: &dyn ToolProbe,
    commands: &dyn CommandRunner,
    interface: &str,
) -> u64 {
    wireless_speed(tools, commands, interface)
        .or_else(|| wired_speed(files, interface))
        .unwrap_or(0)
}

fn wireless_speed(tools: &dyn ToolProbe, commands: &dyn CommandRunner, interface: &str) -> Option<u64> {
    if !tools.is_installed(IWCONFIG_TOOL) {
        return None;
    }

    match commands.run(IWCONFIG_TOOL, &[interface]) {
        Ok(output) => parse_iwconfig_output(&String::from_utf8_lossy(&output)),
        Err(e) => {
            debug!(interface, error = %e, "iwconfig failed");
            None
        }
    }
}

/// Link speed from sysfs, reported by the kernel in Mb/s
fn wired_speed(files: &dyn FileSource, interface: &str) -> Option<u64> {
    let path = format!("/sys/class/net/{}/speed", interface);
    match read_lines(files, &path) {
        Ok(lines) => lines.first().map(|line| parse_u64(line.trim()) * 1_000_000),
        Err(e) => {
            debug!(interface, error = %e, "No wired speed available");
            None
        }
    }
}

/// Extracts the bit rate from `iwconfig` output, e.g. `Bit Rate=72.2 Mb/s`
fn parse_iwconfig_output(output: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        let (_, rest) = line
            .split_once("Bit Rate=")
            .or_else(|| line.split_once("Bit Rate:"))?;
        let mut parts = rest.split_whitespace();
        let speed: f64 = parts.next()?.parse().ok()?;
        let unit = parts.next().unwrap_or_default();
        Some((speed * speed_unit_multiplier(unit) as f64).round() as u64)
    })
}
