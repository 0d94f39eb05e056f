//! (m)DNS packet model and wire codec.
//!
//! Unlike a streaming zero-copy decoder, everything here is owned: the
//! responder's record table and the browser's correlation both keep records
//! long after the receive buffer is reused, so packets are decoded into
//! [`Packet`] values up front.

#[macro_use]
mod macros;
pub mod decoder;
pub mod encoder;

use core::fmt;

use bitflags::bitflags;

use crate::{name::DomainName, record::Record};

ffi_enum! {
    /// Resource record types used by DNS-SD.
    pub enum Type: u16 {
        /// IPv4 host address.
        A = 1,
        /// Domain name pointer.
        PTR = 12,
        /// Free-form text data.
        TXT = 16,
        /// IPv6 host address.
        AAAA = 28,
        /// Service location.
        SRV = 33,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

ffi_enum! {
    /// The queried resource type that a client is interested in.
    pub enum QType: u16 {
        // Prefix is identical to `Type`.
        A = 1,
        PTR = 12,
        TXT = 16,
        AAAA = 28,
        SRV = 33,

        /// Query is for all record types.
        ANY = 255,
    }
}

impl QType {
    pub fn matches(&self, ty: Type) -> bool {
        *self == Self::ANY || self.0 == ty.0
    }
}

impl fmt::Display for QType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

ffi_enum! {
    /// Resource record classes. mDNS only ever uses the Internet class.
    pub enum Class: u16 {
        /// The Internet.
        IN = 1,
    }
}

ffi_enum! {
    /// The queried resource class.
    pub enum QClass: u16 {
        /// The Internet.
        IN = 1,
        /// Query is for all classes of resource.
        ANY = 255,
    }
}

impl QClass {
    pub fn matches(&self, class: Class) -> bool {
        *self == Self::ANY || self.0 == class.0
    }
}

// The top bit of the class field is repurposed by mDNS: in questions it
// requests a unicast response, in records it is the cache-flush bit.
pub(crate) const CLASS_TOP_BIT: u16 = 0x8000;

// Bit positions in the header flags are inverted, because RFC 1035 starts counting at the MSb.
const fn be_pos(pos: u16) -> u16 {
    15 - pos
}

bitflags! {
    #[derive(Debug)]
    #[repr(transparent)]
    struct HeaderFlags: u16 {
        /// If set, the message is a response to a query. If unset, it is a query.
        const QR = 1 << be_pos(0);
        const OPCODE = 0b1111 << Self::OPCODE_POS;
        /// Set if this response was sent by the authority for the queried name.
        /// mDNS responders always set this on responses.
        const AA = 1 << be_pos(5);
        /// Set if the message was truncated by the transmission channel.
        const TC = 1 << be_pos(6);
        const RCODE = 0b1111 << Self::RCODE_POS;
    }
}

impl HeaderFlags {
    const OPCODE_POS: u16 = 11;
    const RCODE_POS: u16 = 0;

    fn opcode(&self) -> u8 {
        ((self.bits() & Self::OPCODE.bits()) >> Self::OPCODE_POS) as u8
    }

    fn rcode(&self) -> u8 {
        ((self.bits() & Self::RCODE.bits()) >> Self::RCODE_POS) as u8
    }
}

#[derive(Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub(crate) struct U16(u16);

impl U16 {
    pub(crate) fn get(self) -> u16 {
        u16::from_be(self.0)
    }
}

impl From<u16> for U16 {
    fn from(value: u16) -> Self {
        Self(value.to_be())
    }
}

/// The fixed 12-byte message header, in wire layout.
#[derive(Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub(crate) struct Header {
    id: U16,
    flags: U16,
    qdcount: U16,
    ancount: U16,
    nscount: U16,
    arcount: U16,
}

impl Header {
    fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_retain(self.flags.get())
    }

    fn modify_flags(&mut self, with: impl FnOnce(&mut HeaderFlags)) {
        let mut flags = self.flags();
        with(&mut flags);
        self.flags = flags.bits().into();
    }

    pub(crate) fn id(&self) -> u16 {
        self.id.get()
    }

    pub(crate) fn set_id(&mut self, id: u16) {
        self.id = id.into();
    }

    pub(crate) fn is_response(&self) -> bool {
        self.flags().contains(HeaderFlags::QR)
    }

    pub(crate) fn set_response(&mut self, is_response: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::QR, is_response));
    }

    pub(crate) fn is_authority(&self) -> bool {
        self.flags().contains(HeaderFlags::AA)
    }

    pub(crate) fn set_authority(&mut self, aa: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::AA, aa));
    }

    pub(crate) fn opcode(&self) -> u8 {
        self.flags().opcode()
    }

    pub(crate) fn rcode(&self) -> u8 {
        self.flags().rcode()
    }

    pub(crate) fn question_count(&self) -> u16 {
        self.qdcount.get()
    }

    pub(crate) fn answer_count(&self) -> u16 {
        self.ancount.get()
    }

    pub(crate) fn authority_count(&self) -> u16 {
        self.nscount.get()
    }

    pub(crate) fn additional_count(&self) -> u16 {
        self.arcount.get()
    }

    pub(crate) fn set_counts(&mut self, qd: u16, an: u16, ns: u16, ar: u16) {
        self.qdcount = qd.into();
        self.ancount = an.into();
        self.nscount = ns.into();
        self.arcount = ar.into();
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("id", &self.id())
            .field("flags", &self.flags())
            .field("qdcount", &self.qdcount.get())
            .field("ancount", &self.ancount.get())
            .field("nscount", &self.nscount.get())
            .field("arcount", &self.arcount.get())
            .finish()
    }
}

/// A single entry of a message's *Question* section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: DomainName,
    pub qtype: QType,
    pub qclass: QClass,
    /// The mDNS unicast-response bit. Decoded, but responses are always
    /// multicast.
    pub unicast_response: bool,
}

/// A decoded DNS message.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    pub id: u16,
    /// `true` for responses, `false` for queries.
    pub response: bool,
    pub authoritative: bool,
    pub opcode: u8,
    pub rcode: u8,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl Packet {
    /// Creates a one-question query message.
    pub fn query(name: DomainName, qtype: QType) -> Self {
        Self {
            questions: vec![Question {
                name,
                qtype,
                qclass: QClass::IN,
                unicast_response: false,
            }],
            ..Self::default()
        }
    }

    /// Creates an authoritative response message.
    pub fn response(answers: Vec<Record>, additionals: Vec<Record>) -> Self {
        Self {
            response: true,
            authoritative: true,
            answers,
            additionals,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_query(&self) -> bool {
        !self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header() {
        let mut h = Header::default();
        assert!(!h.is_response());
        assert!(!h.is_authority());
        assert_eq!(h.opcode(), 0);
        assert_eq!(h.rcode(), 0);

        h.set_response(true);
        h.set_authority(true);
        h.set_id(4660);
        assert!(h.is_response());
        assert!(h.is_authority());
        assert_eq!(h.id(), 4660);
        assert_eq!(h.flags.get(), 0x8400);
    }

    #[test]
    fn qtype_matching() {
        assert!(QType::ANY.matches(Type::SRV));
        assert!(QType::PTR.matches(Type::PTR));
        assert!(!QType::PTR.matches(Type::TXT));
    }

    #[test]
    fn qclass_matching() {
        assert!(QClass::IN.matches(Class::IN));
        assert!(QClass::ANY.matches(Class::IN));
        assert!(!QClass(3).matches(Class::IN));
    }
}
