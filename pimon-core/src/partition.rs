//! Storage topology: which disks exist, how they are partitioned, where each
//! partition is mounted and how full it is.
//!
//! Three sources are combined. `/proc/partitions` decides which partitions
//! exist, `/proc/mounts` adds mount points and `df` adds capacity figures.

use crate::error::{MonitorError, Result};
use crate::ports::{read_lines, CommandRunner, FileSource, ToolProbe};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

pub const PARTITIONS_PATH: &str = "/proc/partitions";
pub const MOUNTS_PATH: &str = "/proc/mounts";
pub const DF_TOOL: &str = "df";

const DEV_PREFIX: &str = "/dev/";
const DF_ARGS: [&str; 2] = ["-l", "--block-size=1"];
// busybox df has no long options
const DF_FALLBACK_ARGS: [&str; 2] = ["-B", "1"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Partition {
    pub name: String,
    pub mount_point: String,
    pub filesystem: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl Partition {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Device {
    pub name: String,
    /// Keyed by partition name
    pub partitions: BTreeMap<String, Partition>,
}

/// Whether a kernel block-device name is a disk partition we track
pub fn is_partition(name: &str) -> bool {
    name.starts_with("sd") || name.starts_with("nvme") || name.starts_with("hd")
}

/// Physical device a partition belongs to, or `None` for unsupported naming schemes.
///
/// NVMe keeps the controller part (`nvme0n1p1` -> `nvme0`), SCSI/IDE keep the
/// drive letter (`sda1` -> `sda`).
pub fn device_name(partition: &str) -> Option<&str> {
    let len = if partition.starts_with("nvme") {
        5
    } else if partition.starts_with("sd") || partition.starts_with("hd") {
        3
    } else {
        return None;
    };

    // all accepted prefixes are ASCII, but the tail may not be
    let end = partition
        .char_indices()
        .nth(len)
        .map(|(i, _)| i)
        .unwrap_or(partition.len());
    Some(&partition[..end])
}

fn strip_dev(device: &str) -> &str {
    device.strip_prefix(DEV_PREFIX).unwrap_or(device)
}

fn path_depth(path: &str) -> usize {
    path.split('/').filter(|segment| !segment.is_empty()).count()
}

/// Lists partitions from `/proc/partitions`, names only
pub fn enumerate(files: &dyn FileSource) -> Result<Vec<Partition>> {
    let lines = read_lines(files, PARTITIONS_PATH)?;
    Ok(parse_partitions(&lines))
}

fn parse_partitions(lines: &[String]) -> Vec<Partition> {
    lines
        .iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            // Format: major minor #blocks name
            if fields.len() < 4 || fields[0] == "major" {
                return None;
            }
            let name = fields[fields.len() - 1];
            is_partition(name).then(|| Partition::named(name))
        })
        .collect()
}

/// Maps each mounted partition to its mount point from `/proc/mounts`
pub fn resolve_mounts(files: &dyn FileSource) -> Result<HashMap<String, String>> {
    let lines = read_lines(files, MOUNTS_PATH)?;
    Ok(parse_mounts(&lines))
}

fn parse_mounts(lines: &[String]) -> HashMap<String, String> {
    let mut mounts: HashMap<String, String> = HashMap::new();

    for line in lines {
        // Format: device mountpoint fstype options freq pass
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }

        let device = strip_dev(fields[0]);
        if !is_partition(device) {
            continue;
        }
        let mount_point = fields[1];

        match mounts.get_mut(device) {
            None => {
                mounts.insert(device.to_string(), mount_point.to_string());
            }
            Some(current) => {
                let (current_depth, new_depth) = (path_depth(current), path_depth(mount_point));
                if new_depth < current_depth {
                    debug!(
                        device,
                        from = current.as_str(),
                        to = mount_point,
                        "Preferring mount closer to root"
                    );
                    *current = mount_point.to_string();
                } else if new_depth == current_depth {
                    debug!(
                        device,
                        kept = current.as_str(),
                        ignored = mount_point,
                        "Mount points at the same depth"
                    );
                }
            }
        }
    }

    mounts
}

/// Runs `df` and collects capacity figures per partition.
///
/// Fails if `df` is missing or if both the GNU and busybox invocations fail.
pub fn probe_usage(
    tools: &dyn ToolProbe,
    commands: &dyn CommandRunner,
) -> Result<HashMap<String, Partition>> {
    if !tools.is_installed(DF_TOOL) {
        return Err(MonitorError::ToolUnavailable(DF_TOOL.to_string()));
    }

    let output = match commands.run(DF_TOOL, &DF_ARGS) {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, "df rejected GNU flags, retrying with busybox syntax");
            commands
                .run(DF_TOOL, &DF_FALLBACK_ARGS)
                .map_err(|e| MonitorError::execution(DF_TOOL, e))?
        }
    };

    Ok(parse_df_output(&String::from_utf8_lossy(&output)))
}

fn parse_df_output(output: &str) -> HashMap<String, Partition> {
    let mut usage = HashMap::new();

    for line in output.lines() {
        // Format: Filesystem 1B-blocks Used Available Use% Mounted-on
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 || fields[0] == "Filesystem" {
            continue;
        }

        let name = strip_dev(fields[0]);
        if !is_partition(name) {
            continue;
        }

        usage.insert(
            name.to_string(),
            Partition {
                name: name.to_string(),
                mount_point: String::new(),
                filesystem: fields[0].to_string(),
                total: fields[1].parse().unwrap_or(0),
                used: fields[2].parse().unwrap_or(0),
                free: fields[3].parse().unwrap_or(0),
            },
        );
    }

    usage
}

/// Enriches the enumerated partitions with mount and usage data.
///
/// Only partitions in `base` are returned; the other two sources never add entries.
pub fn merge(
    base: Vec<Partition>,
    mounts: &HashMap<String, String>,
    usage: &HashMap<String, Partition>,
) -> Vec<Partition> {
    base.into_iter()
        .map(|mut partition| {
            if let Some(mount_point) = mounts.get(&partition.name) {
                partition.mount_point = mount_point.clone();
            }
            if let Some(info) = usage.get(&partition.name) {
                partition.filesystem = info.filesystem.clone();
                partition.total = info.total;
                partition.used = info.used;
                partition.free = info.free;
            }
            partition
        })
        .collect()
}

/// Groups partitions under their physical device, sorted by device name
pub fn group(partitions: Vec<Partition>) -> Vec<Device> {
    let mut devices: BTreeMap<String, Device> = BTreeMap::new();

    for partition in partitions {
        let Some(name) = device_name(&partition.name).map(str::to_string) else {
            warn!(partition = %partition.name, "Unsupported device type, dropping partition");
            continue;
        };

        devices
            .entry(name.clone())
            .or_insert_with(|| Device {
                name,
                partitions: BTreeMap::new(),
            })
            .partitions
            .insert(partition.name.clone(), partition);
    }

    devices.into_values().collect()
}

/// Builds the full device → partition tree. Any source failing fails the whole call.
pub fn get_devices(
    files: &dyn FileSource,
    tools: &dyn ToolProbe,
    commands: &dyn CommandRunner,
) -> Result<Vec<Device>> {
    let partitions = enumerate(files)?;
    let mounts = resolve_mounts(files)?;
    let usage = probe_usage(tools, commands)?;

    Ok(group(merge(partitions, &mounts, &usage)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::fake::{FakeCommands, FakeFiles, FakeTools};

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    const DF_OUTPUT: &str = "\
Filesystem         1B-blocks         Used    Available Use% Mounted on
none              3991056384         4096   3991052288   1% /mnt/wsl
drivers        1023117619200 982047334400  41070284800  96% /usr/lib/wsl/drivers
/dev/sdc        269427478528  37333770240 218333036544  15% /
none              3991056384       131072   3990925312   1% /mnt/wslg
rootfs            3987623936      2129920   3985494016   1% /init
tmpfs             3991056384            0   3991056384   0% /sys/fs/cgroup
";

    #[test]
    fn test_is_partition() {
        for name in ["sda", "sda1", "sdb1", "sdc1", "nvme0n1", "nvme0n1p1", "hda2"] {
            assert!(is_partition(name), "{} should be accepted", name);
        }
        for name in ["some random string", "lvm1", "mmcblk0p1", "loop0", "Sda1", ""] {
            assert!(!is_partition(name), "{} should be rejected", name);
        }
    }

    #[test]
    fn test_device_name() {
        assert_eq!(device_name("sda1"), Some("sda"));
        assert_eq!(device_name("sdb2"), Some("sdb"));
        assert_eq!(device_name("sdc3"), Some("sdc"));
        assert_eq!(device_name("hdb1"), Some("hdb"));
        assert_eq!(device_name("nvme0n1p1"), Some("nvme0"));
        assert_eq!(device_name("nvme0n1p2"), Some("nvme0"));
        assert_eq!(device_name("mmc"), None);
    }

    #[test]
    fn device_name_of_short_names_is_the_name_itself() {
        assert_eq!(device_name("sd"), Some("sd"));
        assert_eq!(device_name("nvme"), Some("nvme"));
    }

    #[test]
    fn test_group_devices() {
        let partitions = ["sda1", "sda2", "sdb1", "sdc1", "nvme0n1p1", "nvme0n1p2"]
            .into_iter()
            .map(|name| Partition {
                filesystem: "ext4".to_string(),
                total: 100,
                used: 50,
                free: 50,
                ..Partition::named(name)
            })
            .collect();

        let devices = group(partitions);
        assert_eq!(devices.len(), 4);

        let count = |name: &str| {
            devices
                .iter()
                .find(|d| d.name == name)
                .map(|d| d.partitions.len())
                .unwrap_or_else(|| panic!("device {} not found", name))
        };
        assert_eq!(count("sda"), 2);
        assert_eq!(count("sdb"), 1);
        assert_eq!(count("sdc"), 1);
        assert_eq!(count("nvme0"), 2);

        for device in &devices {
            for name in device.partitions.keys() {
                assert_eq!(device_name(name), Some(device.name.as_str()));
            }
        }
    }

    #[test]
    fn group_drops_unsupported_names() {
        let devices = group(vec![Partition::named("mmcblk0p1"), Partition::named("sda1")]);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "sda");
    }

    #[test]
    fn test_parse_partitions() {
        let input = lines(
            "major minor  #blocks  name\n\
             \n\
             8        0  263192576 sda\n\
             8        1     524288 sda1\n\
             7        0      65536 loop0\n\
             259      0  500107608 nvme0n1\n\
             259      1     524288 nvme0n1p1\n\
             garbage row\n",
        );

        let names: Vec<String> = parse_partitions(&input).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["sda", "sda1", "nvme0n1", "nvme0n1p1"]);
    }

    #[test]
    fn enumerated_partitions_carry_no_data() {
        let partitions = parse_partitions(&lines("8 1 524288 sda1"));
        assert_eq!(partitions, vec![Partition::named("sda1")]);
    }

    #[test]
    fn test_parse_mounts_prefers_root() {
        let far_first = lines(
            "/dev/sdc /mnt/wslg/distro ext4 rw,relatime 0 0\n\
             /dev/sdc / ext4 rw,relatime 0 0\n",
        );
        let root_first = lines(
            "/dev/sdc / ext4 rw,relatime 0 0\n\
             /dev/sdc /mnt/wslg/distro ext4 rw,relatime 0 0\n",
        );

        for input in [far_first, root_first] {
            let mounts = parse_mounts(&input);
            assert_eq!(mounts.get("sdc").map(String::as_str), Some("/"));
        }
    }

    #[test]
    fn same_depth_mounts_keep_the_first() {
        let mounts = parse_mounts(&lines(
            "/dev/sda1 /boot vfat rw 0 0\n\
             /dev/sda1 /efi vfat rw 0 0\n",
        ));
        assert_eq!(mounts.get("sda1").map(String::as_str), Some("/boot"));
    }

    #[test]
    fn parse_mounts_skips_foreign_and_short_rows() {
        let mounts = parse_mounts(&lines(
            "proc /proc proc rw,nosuid 0 0\n\
             tmpfs /run tmpfs rw 0 0\n\
             /dev/mapper/vg-root / ext4 rw 0 0\n\
             /dev/sdb1 /data\n\
             /dev/nvme0n1p2 /home ext4 rw 0 0\n",
        ));
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts.get("nvme0n1p2").map(String::as_str), Some("/home"));
    }

    #[test]
    fn test_parse_df_output() {
        let usage = parse_df_output(DF_OUTPUT);
        assert_eq!(usage.len(), 1);

        let sdc = &usage["sdc"];
        assert_eq!(sdc.name, "sdc");
        assert_eq!(sdc.filesystem, "/dev/sdc");
        assert_eq!(sdc.total, 269427478528);
        assert_eq!(sdc.used, 37333770240);
        assert_eq!(sdc.free, 218333036544);
    }

    #[test]
    fn parse_df_output_single_row() {
        let usage = parse_df_output("/dev/sdc 269427478528 37333770240 218333036544 15% /");
        assert_eq!(usage["sdc"].total, 269427478528);
    }

    #[test]
    fn parse_df_output_zeroes_bad_numbers() {
        let usage = parse_df_output("/dev/sda1 lots 12 -3 1% /boot");
        let sda1 = &usage["sda1"];
        assert_eq!((sda1.total, sda1.used, sda1.free), (0, 12, 0));
    }

    #[test]
    fn degenerate_inputs_yield_nothing() {
        for input in ["", "some incorrect file data"] {
            assert!(parse_partitions(&lines(input)).is_empty());
            assert!(parse_mounts(&lines(input)).is_empty());
            assert!(parse_df_output(input).is_empty());
        }
    }

    #[test]
    fn test_merge() {
        let base = vec![Partition::named("sda1"), Partition::named("sda2")];
        let mounts = HashMap::from([
            ("sda1".to_string(), "/".to_string()),
            ("sdz9".to_string(), "/ghost".to_string()),
        ]);
        let usage = HashMap::from([(
            "sda1".to_string(),
            Partition {
                filesystem: "/dev/sda1".to_string(),
                total: 10,
                used: 4,
                free: 5,
                ..Partition::named("sda1")
            },
        )]);

        let merged = merge(base, &mounts, &usage);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].mount_point, "/");
        assert_eq!(merged[0].filesystem, "/dev/sda1");
        assert_eq!((merged[0].total, merged[0].used, merged[0].free), (10, 4, 5));
        assert_eq!(merged[1], Partition::named("sda2"));
    }

    #[test]
    fn probe_usage_requires_df() {
        let commands = FakeCommands::new();
        let err = probe_usage(&FakeTools::new(), &commands).unwrap_err();
        assert!(matches!(err, MonitorError::ToolUnavailable(ref tool) if tool == "df"));
        assert!(commands.calls().is_empty());
    }

    #[test]
    fn probe_usage_falls_back_to_busybox_syntax() {
        let tools = FakeTools::new().with("df");
        let commands = FakeCommands::new()
            .with_failure("df -l --block-size=1", "unrecognized option")
            .with_output("df -B 1", DF_OUTPUT);

        let usage = probe_usage(&tools, &commands).unwrap();
        assert!(usage.contains_key("sdc"));
        assert_eq!(commands.calls(), vec!["df -l --block-size=1", "df -B 1"]);
    }

    #[test]
    fn probe_usage_uses_primary_output_when_it_works() {
        let tools = FakeTools::new().with("df");
        let commands = FakeCommands::new().with_output("df -l --block-size=1", DF_OUTPUT);

        assert!(probe_usage(&tools, &commands).unwrap().contains_key("sdc"));
        assert_eq!(commands.calls().len(), 1);
    }

    #[test]
    fn probe_usage_fails_when_both_invocations_fail() {
        let tools = FakeTools::new().with("df");
        let commands = FakeCommands::new();

        let err = probe_usage(&tools, &commands).unwrap_err();
        assert!(matches!(err, MonitorError::Execution { .. }));
        assert_eq!(commands.calls().len(), 2);
    }

    #[test]
    fn get_devices_propagates_missing_mount_table() {
        let files = FakeFiles::new().with(PARTITIONS_PATH, "8 1 524288 sda1\n");
        let tools = FakeTools::new().with("df");
        let commands = FakeCommands::new().with_output("df -l --block-size=1", "");

        let err = get_devices(&files, &tools, &commands).unwrap_err();
        assert!(matches!(err, MonitorError::Io { .. }));
    }
}
