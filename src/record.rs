//! DNS resource records used by DNS-SD.
//!
//! A published service fans out into a coordinated set of these: PTR records
//! for enumeration, an SRV/TXT pair under the instance name, and one address
//! record per host interface.

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use crate::{name::DomainName, packet::Type};

/// TTL of the `_services._dns-sd._udp.local` enumeration PTR and of
/// type→instance PTRs.
pub const TTL_PTR: u32 = 28800;
/// TTL of SRV records.
pub const TTL_SRV: u32 = 120;
/// TTL of TXT records.
pub const TTL_TXT: u32 = 4500;
/// TTL of A/AAAA records.
pub const TTL_ADDRESS: u32 = 120;
/// TTL announcing imminent shutdown of a record set.
pub const TTL_GOODBYE: u32 = 0;

/// A resource record: an owner name plus typed record data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: DomainName,
    pub ttl: u32,
    /// The mDNS cache-flush bit, carried in the top bit of the class field.
    pub cache_flush: bool,
    pub data: RecordData,
}

impl Record {
    pub fn new(name: DomainName, ttl: u32, data: RecordData) -> Self {
        Self {
            name,
            ttl,
            cache_flush: false,
            data,
        }
    }

    #[inline]
    pub fn record_type(&self) -> Type {
        self.data.record_type()
    }

    /// Whether `other` describes the same cache entry: equal name and
    /// structurally equal data. TTL and the cache-flush bit do not
    /// participate.
    pub(crate) fn same_entry(&self, other: &Record) -> bool {
        self.name == other.name && self.data == other.data
    }

    /// Whether `other` has the same `(type, name)` key.
    pub(crate) fn same_key(&self, other: &Record) -> bool {
        self.record_type() == other.record_type() && self.name == other.name
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.name,
            self.ttl,
            self.record_type(),
            self.data
        )
    }
}

/// Service location: the host and port a service instance listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Srv {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: DomainName,
}

/// The typed data of a [`Record`], one variant per supported record type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordData {
    /// An IPv4 host address.
    A(Ipv4Addr),
    /// An IPv6 host address.
    AAAA(Ipv6Addr),
    /// A name pointer; DNS-SD uses these to map service types to instances.
    PTR(DomainName),
    /// Service location.
    SRV(Srv),
    /// Raw TXT segments as they appear on the wire, without the length
    /// prefixes. Key/value interpretation lives in [`crate::txt`].
    TXT(Vec<Vec<u8>>),
}

impl RecordData {
    pub fn record_type(&self) -> Type {
        match self {
            RecordData::A(_) => Type::A,
            RecordData::AAAA(_) => Type::AAAA,
            RecordData::PTR(_) => Type::PTR,
            RecordData::SRV(_) => Type::SRV,
            RecordData::TXT(_) => Type::TXT,
        }
    }

    /// Returns the stored address for A/AAAA data.
    pub fn ip_addr(&self) -> Option<IpAddr> {
        match self {
            RecordData::A(addr) => Some(IpAddr::V4(*addr)),
            RecordData::AAAA(addr) => Some(IpAddr::V6(*addr)),
            _ => None,
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::A(addr) => addr.fmt(f),
            RecordData::AAAA(addr) => addr.fmt(f),
            RecordData::PTR(name) => name.fmt(f),
            RecordData::SRV(srv) => write!(
                f,
                "{} {} {} {}",
                srv.priority, srv.weight, srv.port, srv.target
            ),
            RecordData::TXT(segments) => {
                for (i, segment) in segments.iter().enumerate() {
                    if i != 0 {
                        f.write_str(" ")?;
                    }
                    segment.escape_ascii().fmt(f)?;
                }
                Ok(())
            }
        }
    }
}
