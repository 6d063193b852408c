use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The listening port is already bound by another program.
    #[error("An application is already running on port {port}")]
    PortUnavailable {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode OSC message for {address}: {reason}")]
    Encode { address: String, reason: String },

    #[error("Failed to send {address} to {target}: {source}")]
    Send {
        address: String,
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to receive datagram: {0}")]
    Receive(#[source] std::io::Error),
}
