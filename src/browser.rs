//! Browsing for services advertised by peers.
//!
//! A [`Browser`] issues PTR queries for the configured type names and
//! consumes every inbound response, correlating PTR/SRV/TXT/address records
//! into reconstructed [`Service`] descriptors. Transitions surface as
//! [`ServiceEvent`]s drained with [`Browser::poll_event`].

use std::{
    collections::{BTreeSet, VecDeque},
    io,
    net::SocketAddr,
};

use crate::{
    name::DomainName,
    packet::{Packet, QType},
    record::{Record, RecordData},
    service::{
        enumeration_name, parse_instance_fqdn, service_type_name, subtype_query_name, Protocol,
        Service,
    },
    transport::Transport,
    txt::TxtRecords,
    Error,
};

/// One service type to browse for.
#[derive(Debug, Clone)]
pub struct BrowseType {
    /// Application protocol without the leading underscore, e.g. `"http"`.
    pub service_type: String,
    /// When non-empty, one query is issued per subtype instead of one for
    /// the plain type.
    pub subtypes: Vec<String>,
}

/// What a [`Browser`] looks for.
#[derive(Debug, Clone, Default)]
pub struct BrowseConfig {
    /// The types to browse. Empty means wildcard mode: enumerate every type
    /// on the link and track all of them.
    pub types: Vec<BrowseType>,
    /// Transport protocol of the browsed types.
    pub protocol: Protocol,
}

impl BrowseConfig {
    /// Browses every service type on the link.
    pub fn wildcard() -> Self {
        Self::default()
    }

    /// Browses one service type, e.g. `"http"`.
    pub fn service(service_type: impl Into<String>) -> Self {
        Self::default().and_service(service_type)
    }

    /// Adds another service type to browse.
    pub fn and_service(mut self, service_type: impl Into<String>) -> Self {
        self.types.push(BrowseType {
            service_type: service_type.into(),
            subtypes: Vec::new(),
        });
        self
    }

    /// Restricts the most recently added type to the given subtypes.
    ///
    /// # Panics
    ///
    /// Panics when no type has been added.
    pub fn subtypes(mut self, subtypes: &[&str]) -> Self {
        let ty = self
            .types
            .last_mut()
            .expect("`subtypes` requires a service type");
        ty.subtypes = subtypes.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Browses `_udp` types instead of `_tcp`.
    pub fn udp(mut self) -> Self {
        self.protocol = Protocol::Udp;
        self
    }
}

/// Up/down transitions of remote services.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    /// A service became visible, or an already-visible one gained a subtype.
    Up(Service),
    /// A goodbye arrived for the service.
    Down(Service),
}

/// Tracks the remote services visible for a set of type names.
pub struct Browser {
    /// The PTR query names. Fixed in non-wildcard mode; grows at runtime in
    /// wildcard mode as types are learned.
    names: Vec<DomainName>,
    wildcard: bool,
    enumeration: DomainName,
    /// Names currently tracked for correlation. Grow-only in wildcard mode,
    /// so long-running wildcard browsers accumulate memory proportional to
    /// the distinct types observed.
    name_map: BTreeSet<DomainName>,
    services: Vec<Service>,
    service_map: BTreeSet<DomainName>,
    events: VecDeque<ServiceEvent>,
    started: bool,
}

impl Browser {
    pub fn new(config: BrowseConfig) -> Result<Self, Error> {
        let wildcard = config.types.is_empty();
        let mut names = Vec::new();
        if wildcard {
            names.push(enumeration_name());
        } else {
            for ty in &config.types {
                if ty.subtypes.is_empty() {
                    names.push(service_type_name(&ty.service_type, config.protocol)?);
                } else {
                    for subtype in &ty.subtypes {
                        names.push(subtype_query_name(
                            subtype,
                            &ty.service_type,
                            config.protocol,
                        )?);
                    }
                }
            }
        }

        // In wildcard mode correlation names are learned from enumeration
        // answers instead.
        let name_map = if wildcard {
            BTreeSet::new()
        } else {
            names.iter().cloned().collect()
        };

        Ok(Self {
            names,
            wildcard,
            enumeration: enumeration_name(),
            name_map,
            services: Vec::new(),
            service_map: BTreeSet::new(),
            events: VecDeque::new(),
            started: false,
        })
    }

    /// Starts browsing: issues the initial PTR query for every name.
    ///
    /// No-op if already started.
    pub fn start<T: Transport>(&mut self, transport: &mut T) -> io::Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.update(transport)
    }

    /// Re-issues the PTR queries for all names. Callers may invoke this
    /// periodically to refresh.
    pub fn update<T: Transport>(&mut self, transport: &mut T) -> io::Result<()> {
        for name in &self.names {
            transport.query(name, QType::PTR)?;
        }
        Ok(())
    }

    /// Stops consuming responses. The discovered services are retained and
    /// no events are emitted for them. Idempotent.
    pub fn stop(&mut self) {
        self.started = false;
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The currently-up services, in arrival order.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Takes the next pending up/down event, if any.
    pub fn poll_event(&mut self) -> Option<ServiceEvent> {
        self.events.pop_front()
    }

    /// Consumes one inbound response and updates the tracked services.
    ///
    /// `rinfo` is the source address of the response and becomes the
    /// `referer` of services it introduces.
    pub fn handle_response<T: Transport>(
        &mut self,
        packet: &Packet,
        rinfo: SocketAddr,
        transport: &mut T,
    ) -> io::Result<()> {
        if !self.started || packet.is_query() {
            return Ok(());
        }

        if self.wildcard {
            // Every enumeration answer names a service type; new ones turn
            // this browser into a per-type browser on demand.
            for answer in &packet.answers {
                let RecordData::PTR(type_name) = &answer.data else {
                    continue;
                };
                if answer.name != self.enumeration || self.name_map.contains(type_name) {
                    continue;
                }
                log::debug!("wildcard learned type {}", type_name);
                self.name_map.insert(type_name.clone());
                self.names.push(type_name.clone());
                transport.query(type_name, QType::PTR)?;
            }
        }

        let tracked: Vec<DomainName> = self.name_map.iter().cloned().collect();
        for name in &tracked {
            // Goodbye sweep first, so a service that shuts down and comes
            // right back within one packet re-appears.
            for record in packet.answers.iter().chain(&packet.additionals) {
                if record.ttl != 0 || record.name != *name {
                    continue;
                }
                if let RecordData::PTR(fqdn) = &record.data {
                    self.remove_service(fqdn);
                }
            }

            let live: Vec<&Record> = packet
                .answers
                .iter()
                .chain(&packet.additionals)
                .filter(|record| record.ttl > 0)
                .collect();

            let mut candidates = Vec::new();
            for &ptr in &live {
                if ptr.name != *name {
                    continue;
                }
                let RecordData::PTR(instance) = &ptr.data else {
                    continue;
                };
                if let Some(candidate) = Self::build_candidate(&live, ptr, instance, rinfo) {
                    candidates.push(candidate);
                }
            }
            for candidate in candidates {
                self.merge(candidate);
            }
        }

        Ok(())
    }

    /// Reconstructs one service from the live records of a packet.
    ///
    /// A candidate needs both the SRV and the TXT of the pointed-to
    /// instance; partial correlation silently yields nothing.
    fn build_candidate(
        live: &[&Record],
        ptr: &Record,
        instance: &DomainName,
        rinfo: SocketAddr,
    ) -> Option<Service> {
        let srv_record = live
            .iter()
            .find(|r| matches!(r.data, RecordData::SRV(_)) && r.name == *instance)?;
        let RecordData::SRV(srv) = &srv_record.data else {
            return None;
        };
        let (name, service_type, protocol) = parse_instance_fqdn(&srv_record.name)?;

        // A subtype browse name has more labels than `_type._proto.local`;
        // its first label carries the subtype.
        let mut subtypes = Vec::new();
        if ptr.name.labels().len() > 3 {
            let first = ptr.name.labels()[0].as_bytes();
            let first = first.strip_prefix(b"_").unwrap_or(first);
            subtypes.push(String::from_utf8_lossy(first).into_owned());
        }

        let txt_record = live
            .iter()
            .find(|r| matches!(r.data, RecordData::TXT(_)) && r.name == *instance)?;
        let RecordData::TXT(segments) = &txt_record.data else {
            return None;
        };

        let addrs = live
            .iter()
            .filter(|r| r.name == srv.target)
            .filter_map(|r| r.data.ip_addr())
            .collect();

        Some(Service {
            name,
            service_type,
            protocol,
            host: srv.target.clone(),
            port: srv.port,
            subtypes,
            txt: TxtRecords::from_segments(segments),
            raw_txt: segments.clone(),
            addrs,
            cache_flush: false,
            fqdn: srv_record.name.clone(),
            published: false,
            referer: Some(rinfo),
        })
    }

    fn merge(&mut self, candidate: Service) {
        if !self.service_map.contains(&candidate.fqdn) {
            self.service_map.insert(candidate.fqdn.clone());
            self.services.push(candidate.clone());
            self.events.push_back(ServiceEvent::Up(candidate));
            return;
        }

        // Known instance: only a new subtype is worth reporting, and it
        // re-uses the `Up` channel with the mutated descriptor.
        let Some(new_subtype) = candidate.subtypes.first() else {
            return;
        };
        let Some(existing) = self
            .services
            .iter_mut()
            .find(|s| s.fqdn == candidate.fqdn)
        else {
            return;
        };
        if existing.subtypes.iter().any(|s| s == new_subtype) {
            return;
        }
        existing.subtypes.push(new_subtype.clone());
        self.events.push_back(ServiceEvent::Up(existing.clone()));
    }

    /// Removes the first service with a DNS-equal fqdn and emits `Down`.
    /// Unknown fqdns are a no-op.
    fn remove_service(&mut self, fqdn: &DomainName) {
        let Some(index) = self.services.iter().position(|s| s.fqdn == *fqdn) else {
            return;
        };
        let service = self.services.remove(index);
        self.service_map.remove(fqdn);
        self.events.push_back(ServiceEvent::Down(service));
    }
}
