use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CpuLoad {
    pub load_avg_1_min: f64,
    pub load_avg_5_min: f64,
    pub load_avg_15_min: f64,
}

/// Memory figures in bytes. `used` excludes buffers and cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RamStats {
    pub total: u64,
    pub available: u64,
    pub free: u64,
    pub used: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkStats {
    pub packets: u64,
    pub bytes: u64,
    pub errors: u64,
    pub drops: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkInterface {
    pub interface_name: String,
    /// Link speed in bits per second, 0 when unknown
    pub bit_rate: u64,
    pub rx: NetworkStats,
    pub tx: NetworkStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_field_names() {
        let value = serde_json::to_value(CpuLoad {
            load_avg_1_min: 0.1,
            load_avg_5_min: 0.2,
            load_avg_15_min: 0.3,
        })
        .unwrap();
        assert_eq!(value["LoadAvg1Min"], 0.1);
        assert_eq!(value["LoadAvg15Min"], 0.3);

        let value = serde_json::to_value(NetworkInterface {
            interface_name: "eth0".to_string(),
            ..NetworkInterface::default()
        })
        .unwrap();
        assert_eq!(value["InterfaceName"], "eth0");
        assert_eq!(value["Rx"]["Packets"], 0);
    }
}
