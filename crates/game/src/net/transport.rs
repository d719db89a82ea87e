use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use log::{debug, info};

use super::protocol::{CodecError, NetworkMessage};
use super::stats::NetworkStats;
use crate::error::SessionError;

/// Larger than any message; oversized datagrams arrive truncated and fail the size check.
const RECV_BUFFER_SIZE: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inbound {
    pub message: NetworkMessage,
    pub from: SocketAddr,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("send to {addr} failed: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("no default destination")]
    NoDestination,
}

pub trait Transport {
    fn local_addr(&self) -> SocketAddr;

    fn remote_addr(&self) -> Option<SocketAddr>;

    fn send_to(&mut self, message: &NetworkMessage, addr: SocketAddr)
    -> Result<usize, TransportError>;

    fn send(&mut self, message: &NetworkMessage) -> Result<usize, TransportError> {
        let addr = self.remote_addr().ok_or(TransportError::NoDestination)?;
        self.send_to(message, addr)
    }

    /// Appends every pending message to `inbound` and returns once the socket would block.
    /// Malformed datagrams are skipped. On a hard error the messages read so far are kept.
    fn drain_inbound(&mut self, inbound: &mut Vec<Inbound>) -> Result<(), TransportError>;

    fn stats(&self) -> &NetworkStats;
}

/// Builds transports for the session, both initially and when rebuilding after failure.
pub trait Connector {
    type Transport: Transport;

    fn bind(&mut self, port: u16) -> Result<Self::Transport, SessionError>;

    fn connect(&mut self, host: &str, port: u16) -> Result<Self::Transport, SessionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector;

impl Connector for UdpConnector {
    type Transport = UdpTransport;

    fn bind(&mut self, port: u16) -> Result<UdpTransport, SessionError> {
        UdpTransport::bind(port)
    }

    fn connect(&mut self, host: &str, port: u16) -> Result<UdpTransport, SessionError> {
        UdpTransport::connect(host, port)
    }
}

pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote_addr: Option<SocketAddr>,
    stats: NetworkStats,
    recv_buffer: [u8; RECV_BUFFER_SIZE],
}

impl UdpTransport {
    pub fn bind(port: u16) -> Result<Self, SessionError> {
        let transport = Self::open(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
            .map_err(|source| SessionError::Bind { port, source })?;
        info!("listening on {}", transport.local_addr);
        Ok(transport)
    }

    pub fn connect(host: &str, port: u16) -> Result<Self, SessionError> {
        let remote = resolve(host, port)?;
        let mut transport = Self::open(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
            .map_err(|source| SessionError::Bind { port: 0, source })?;
        transport.remote_addr = Some(remote);
        info!("{} -> {}", transport.local_addr, remote);
        Ok(transport)
    }

    fn open(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            remote_addr: None,
            stats: NetworkStats::default(),
            recv_buffer: [0u8; RECV_BUFFER_SIZE],
        })
    }
}

impl Transport for UdpTransport {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    fn send_to(
        &mut self,
        message: &NetworkMessage,
        addr: SocketAddr,
    ) -> Result<usize, TransportError> {
        let data = message.encode()?;

        match self.socket.send_to(&data, addr) {
            Ok(bytes) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += bytes as u64;
                Ok(bytes)
            }
            Err(source) => {
                self.stats.send_failures += 1;
                Err(TransportError::Send { addr, source })
            }
        }
    }

    fn drain_inbound(&mut self, inbound: &mut Vec<Inbound>) -> Result<(), TransportError> {
        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((size, from)) => match NetworkMessage::decode(&self.recv_buffer[..size]) {
                    Ok(message) => {
                        self.stats.packets_received += 1;
                        self.stats.bytes_received += size as u64;
                        inbound.push(Inbound { message, from });
                    }
                    Err(e) => {
                        self.stats.malformed += 1;
                        debug!("dropped datagram from {}: {}", from, e);
                    }
                },
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.stats.receive_errors += 1;
                    return Err(TransportError::Receive(e));
                }
            }
        }
    }

    fn stats(&self) -> &NetworkStats {
        &self.stats
    }
}

pub fn resolve(host: &str, port: u16) -> Result<SocketAddr, SessionError> {
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let mut candidates = (host, port)
        .to_socket_addrs()
        .map_err(|e| SessionError::resolve(host, port, e))?;

    candidates
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| SessionError::resolve(host, port, "no IPv4 address"))
}
