pub mod cpu;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod network;
pub mod partition;
pub mod ports;
pub mod ram;


pub use error::{CommandError, MonitorError, Result};
pub use metrics::*;
pub use monitor::SystemMonitor;
pub use partition::{Device, Partition};
