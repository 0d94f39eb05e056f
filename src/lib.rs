//! Multicast DNS Service Discovery (mDNS/DNS-SD).
//!
//! `salut` advertises services running on the local machine so that peers on
//! the same link can find them, and browses for services advertised by those
//! peers. It speaks the DNS-SD conventions of RFC 6763 on top of the
//! multicast DNS transport of RFC 6762.
//!
//! The entry point is [`Mdns`], which owns the multicast socket, the
//! authoritative record table answering incoming queries, and the registry of
//! published services. Browsing happens through [`browser::Browser`] values
//! driven by [`Mdns::poll`].

pub mod browser;
mod endpoint;
mod error;
mod hex;
pub mod host;
pub mod name;
pub mod packet;
pub mod record;
pub mod registry;
pub mod responder;
pub mod service;
pub mod transport;
pub mod txt;

pub use crate::endpoint::Mdns;
pub use crate::error::Error;

/// Size of multicast DNS message buffers.
///
/// Plain DNS messages are limited to 512 Bytes, but mDNS works entirely
/// within a local network and may use anything that fits in a single IP
/// packet.
pub const MDNS_BUFFER_SIZE: usize = 1500;

/// The link-local top-level domain used by mDNS.
pub const TLD: &str = "local";
