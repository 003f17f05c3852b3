use crate::error::Result;
use crate::metrics::{CpuLoad, NetworkInterface, RamStats};
use crate::partition::Device;
use crate::ports::{CommandRunner, FileSource, HostFileSource, PathToolProbe, ProcessRunner, ToolProbe};
use crate::{cpu, network, partition, ram};
use std::sync::Arc;

/// Entry point for every reading. Holds no state besides the host ports,
/// so each call reflects the system at that moment.
#[derive(Clone)]
pub struct SystemMonitor {
    files: Arc<dyn FileSource>,
    tools: Arc<dyn ToolProbe>,
    commands: Arc<dyn CommandRunner>,
}

impl SystemMonitor {
    pub fn new() -> Self {
        Self::with_ports(
            Arc::new(HostFileSource),
            Arc::new(PathToolProbe),
            Arc::new(ProcessRunner),
        )
    }

    pub fn with_ports(
        files: Arc<dyn FileSource>,
        tools: Arc<dyn ToolProbe>,
        commands: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            files,
            tools,
            commands,
        }
    }

    pub fn get_cpu_load(&self) -> Result<CpuLoad> {
        cpu::read_load(self.files.as_ref())
    }

    pub fn get_ram_stats(&self) -> Result<RamStats> {
        ram::read_stats(self.files.as_ref())
    }

    /// Disks with their partitions, mount points and usage
    pub fn get_devices(&self) -> Result<Vec<Device>> {
        partition::get_devices(
            self.files.as_ref(),
            self.tools.as_ref(),
            self.commands.as_ref(),
        )
    }

    pub fn get_network_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        network::read_interfaces(
            self.files.as_ref(),
            self.tools.as_ref(),
            self.commands.as_ref(),
        )
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}
