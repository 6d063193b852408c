use async_trait::async_trait;
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use super::error::TransportError;

/// Destination for outbound float commands.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send_float(&self, address: &str, value: f32) -> Result<(), TransportError>;
}

/// Sends OSC floats over UDP to a fixed target.
pub struct OscSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscSender {
    /// Binds an ephemeral local port of the target's address family.
    pub async fn connect(target: SocketAddr) -> Result<Self, TransportError> {
        let local = match target.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind {
                addr: local,
                source,
            })?;
        debug!("OSC sender bound to {:?}, target {}", socket.local_addr(), target);
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

pub fn encode_float(address: &str, value: f32) -> Result<Vec<u8>, TransportError> {
    let packet = OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args: vec![OscType::Float(value)],
    });
    encoder::encode(&packet).map_err(|e| TransportError::Encode {
        address: address.to_string(),
        reason: format!("{e:?}"),
    })
}

#[async_trait]
impl CommandSink for OscSender {
    async fn send_float(&self, address: &str, value: f32) -> Result<(), TransportError> {
        let bytes = encode_float(address, value)?;
        trace!("Sending {} = {} to {}", address, value, self.target);
        self.socket
            .send_to(&bytes, self.target)
            .await
            .map_err(|source| TransportError::Send {
                address: address.to_string(),
                target: self.target,
                source,
            })?;
        Ok(())
    }
}
