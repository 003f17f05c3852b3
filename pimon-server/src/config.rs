use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// HTTP API exposing CPU, memory, storage and network readings of this host
#[derive(Parser, Debug, Clone)]
#[command(name = "pimon-server", version, about)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "PIMON_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PIMON_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "PIMON_LOG", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
