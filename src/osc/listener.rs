use rosc::{decoder, OscMessage, OscPacket};
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::error::TransportError;
use crate::leash::{AddressTable, LeashError, LeashHandle, LeashUpdate};

/// Counters reported when the listener stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub applied: u64,
    pub malformed: u64,
    pub unrouted: u64,
    pub undecodable: u64,
}

/// Receives leash parameters over UDP and forwards them to the leash worker.
pub struct OscListener {
    socket: UdpSocket,
    routes: AddressTable,
}

impl OscListener {
    /// Binds the listening socket. A port held by another program is reported
    /// as [`TransportError::PortUnavailable`].
    pub async fn bind(addr: SocketAddr, routes: AddressTable) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr).await.map_err(|source| {
            if source.kind() == ErrorKind::AddrInUse {
                TransportError::PortUnavailable {
                    port: addr.port(),
                    source,
                }
            } else {
                TransportError::Bind { addr, source }
            }
        })?;
        info!(
            "Listening for leash parameters on {} ({} addresses)",
            addr,
            routes.len()
        );
        Ok(Self { socket, routes })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives until cancelled or the leash worker is gone.
    pub async fn run(self, leash: LeashHandle, cancel: CancellationToken) -> ListenerStats {
        let mut stats = ListenerStats::default();
        let mut buf = [0u8; decoder::MTU];

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };

            let (size, peer) = match received {
                Ok(received) => received,
                Err(e) => {
                    // ICMP port unreachable on some platforms, keep listening
                    warn!("{}", TransportError::Receive(e));
                    continue;
                }
            };

            let packet = match decoder::decode_udp(&buf[..size]) {
                Ok((_, packet)) => packet,
                Err(e) => {
                    debug!("Dropping undecodable datagram from {}: {:?}", peer, e);
                    stats.undecodable += 1;
                    continue;
                }
            };

            let mut messages = Vec::new();
            flatten(packet, &mut messages);
            for msg in messages {
                match self.dispatch(&msg) {
                    Ok(Some(update)) => {
                        if let Err(LeashError::WorkerStopped) = leash.apply(update).await {
                            debug!("Leash worker gone, stopping listener");
                            info!("Listener stopped: {:?}", stats);
                            return stats;
                        }
                        stats.applied += 1;
                    }
                    Ok(None) => {
                        trace!("Ignoring unrouted address {}", msg.addr);
                        stats.unrouted += 1;
                    }
                    Err(e) => {
                        warn!("Dropped update on address {}: {}", msg.addr, e);
                        stats.malformed += 1;
                    }
                }
            }
        }

        info!("Listener stopped: {:?}", stats);
        stats
    }

    /// Routes one message and parses its payload. `Ok(None)` means the address
    /// is not one of the leash channels.
    pub fn dispatch(&self, msg: &OscMessage) -> Result<Option<LeashUpdate>, LeashError> {
        match self.routes.route(&msg.addr) {
            Some(channel) => LeashUpdate::from_osc(channel, &msg.args).map(Some),
            None => Ok(None),
        }
    }
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(msg),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}
