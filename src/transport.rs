//! The multicast transport shared by the responder and browsers.
//!
//! [`MulticastTransport`] owns the single mDNS socket; everything above it
//! works in terms of the [`Transport`] trait so that the protocol state
//! machines can be driven from scripted packets in tests.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket},
    time::Duration,
};

use socket2::{Domain, Protocol, Socket, Type};

use crate::{
    hex::Hex,
    name::DomainName,
    packet::{decoder, encoder, Packet, QType},
    record::Record,
    MDNS_BUFFER_SIZE,
};

/// The IPv4 mDNS group address.
pub const MDNS_GROUP_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
/// The mDNS UDP port.
pub const MDNS_PORT: u16 = 5353;

/// Answers and additionals multicast together as one response message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub answers: Vec<Record>,
    pub additionals: Vec<Record>,
}

/// Multicast packet plumbing.
pub trait Transport {
    /// Multicasts a one-question query.
    fn query(&mut self, name: &DomainName, qtype: QType) -> io::Result<()>;

    /// Multicasts a response message.
    fn respond(&mut self, response: OutgoingResponse) -> io::Result<()>;

    /// Receives the next decodable packet together with its source address.
    ///
    /// Returns `Ok(None)` once `timeout` elapses without one; `None` blocks
    /// indefinitely. Packets that fail to decode are logged and skipped.
    fn recv(&mut self, timeout: Option<Duration>) -> io::Result<Option<(Packet, SocketAddr)>>;
}

/// The real mDNS socket: bound to port 5353 and joined to the IPv4 group.
pub struct MulticastTransport {
    sock: UdpSocket,
    group: SocketAddr,
}

impl MulticastTransport {
    /// Opens the mDNS socket.
    ///
    /// The socket is configured to coexist with other mDNS responders
    /// already listening on the same port. When receiving, a buffer of
    /// [`MDNS_BUFFER_SIZE`] is used, so larger inbound messages get
    /// truncated by the kernel.
    pub fn new() -> io::Result<Self> {
        let sock = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        sock.set_reuse_address(true)?;
        #[cfg(not(target_os = "windows"))]
        sock.set_reuse_port(true)?;
        sock.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, MDNS_PORT).into())?;

        let sock = UdpSocket::from(sock);
        sock.join_multicast_v4(&MDNS_GROUP_V4, &Ipv4Addr::UNSPECIFIED)?;

        Ok(Self {
            sock,
            group: SocketAddrV4::new(MDNS_GROUP_V4, MDNS_PORT).into(),
        })
    }

    fn send(&self, packet: &Packet) -> io::Result<()> {
        let data = encoder::encode(packet);
        log::trace!("send to {}: {}", self.group, Hex(&data));
        self.sock.send_to(&data, self.group)?;
        Ok(())
    }
}

impl Transport for MulticastTransport {
    fn query(&mut self, name: &DomainName, qtype: QType) -> io::Result<()> {
        self.send(&Packet::query(name.clone(), qtype))
    }

    fn respond(&mut self, response: OutgoingResponse) -> io::Result<()> {
        self.send(&Packet::response(response.answers, response.additionals))
    }

    fn recv(&mut self, timeout: Option<Duration>) -> io::Result<Option<(Packet, SocketAddr)>> {
        self.sock.set_read_timeout(timeout)?;
        let mut buf = [0; MDNS_BUFFER_SIZE];
        loop {
            let (len, addr) = match self.sock.recv_from(&mut buf) {
                Ok(res) => res,
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            let raw = &buf[..len];
            log::trace!("recv from {}: {}", addr, Hex(raw));

            match decoder::decode(raw) {
                Ok(packet) => return Ok(Some((packet, addr))),
                Err(e) => {
                    log::warn!("failed to decode packet from {}: {:?}", addr, e);
                }
            }
        }
    }
}
