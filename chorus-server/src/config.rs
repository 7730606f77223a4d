use crate::hub::DEFAULT_OUTBOUND_QUEUE;
use crate::sfu::{DEFAULT_NEGOTIATION_TIMEOUT, TransportConfig};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Capacity of each connection's outbound queue.
    pub outbound_queue: usize,
    pub transport: TransportConfig,
    /// Zero disables the renegotiation watchdog.
    pub negotiation_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            transport: TransportConfig::default(),
            negotiation_timeout: DEFAULT_NEGOTIATION_TIMEOUT,
        }
    }
}
