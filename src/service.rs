//! Service descriptors and their DNS-SD record sets.
//!
//! A [`Service`] describes one advertised or discovered instance. Publishing
//! one fans out into a coordinated record set ([`Service::records`]): PTR
//! records that make the instance enumerable, the SRV/TXT pair under the
//! instance name, and one address record per host interface.

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    str::FromStr,
};

use crate::{
    host::HostInfo,
    name::{DomainName, Label},
    record::{Record, RecordData, Srv, TTL_ADDRESS, TTL_PTR, TTL_SRV, TTL_TXT},
    txt::TxtRecords,
    Error, TLD,
};

/// The name every DNS-SD responder answers with its service types.
pub const SERVICE_ENUMERATION_NAME: &str = "_services._dns-sd._udp.local";

/// Transport protocol a service is reached over (`_tcp` or `_udp`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    pub(crate) fn to_label(self) -> Label {
        match self {
            Protocol::Tcp => Label::new("_tcp"),
            Protocol::Udp => Label::new("_udp"),
        }
    }

    pub(crate) fn from_label(label: &Label) -> Option<Self> {
        if label.as_bytes().eq_ignore_ascii_case(b"_tcp") {
            Some(Protocol::Tcp)
        } else if label.as_bytes().eq_ignore_ascii_case(b"_udp") {
            Some(Protocol::Udp)
        } else {
            None
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            _ => Err(Error::InvalidValue),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for publishing a service.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Human-readable instance label, e.g. `"Foo Bar"`. Required.
    pub name: String,
    /// Application protocol without the leading underscore, e.g. `"http"`.
    /// Required.
    pub service_type: String,
    pub protocol: Protocol,
    /// SRV target. The local hostname when absent.
    pub host: Option<DomainName>,
    /// Port the service listens on. Required.
    pub port: u16,
    /// Subtype labels, without the leading underscore.
    pub subtypes: Vec<String>,
    pub txt: TxtRecords,
    /// Explicit addresses to publish; all non-loopback host interfaces when
    /// empty.
    pub addrs: Vec<IpAddr>,
    /// Sets the mDNS cache-flush bit on every published record.
    pub cache_flush: bool,
}

/// One advertised or discovered service instance.
#[derive(Debug, Clone)]
pub struct Service {
    pub(crate) name: String,
    pub(crate) service_type: String,
    pub(crate) protocol: Protocol,
    pub(crate) host: DomainName,
    pub(crate) port: u16,
    pub(crate) subtypes: Vec<String>,
    pub(crate) txt: TxtRecords,
    pub(crate) raw_txt: Vec<Vec<u8>>,
    pub(crate) addrs: Vec<IpAddr>,
    pub(crate) cache_flush: bool,
    pub(crate) fqdn: DomainName,
    pub(crate) published: bool,
    pub(crate) referer: Option<SocketAddr>,
}

impl Service {
    /// Validates `config` and fills in host defaults.
    ///
    /// Fails with [`Error::MissingField`] if `name`, `service_type`, or
    /// `port` are absent.
    pub fn new(config: ServiceConfig, host_info: &HostInfo) -> Result<Self, Error> {
        if config.name.is_empty() {
            return Err(Error::MissingField("name"));
        }
        if config.service_type.is_empty() {
            return Err(Error::MissingField("type"));
        }
        if config.port == 0 {
            return Err(Error::MissingField("port"));
        }

        let type_name = service_type_name(&config.service_type, config.protocol)?;
        let mut fqdn = DomainName::from_iter([Label::try_new(&config.name)?]);
        fqdn.extend(type_name.labels());

        // A bad subtype fails the publish here instead of being dropped
        // from the record set later.
        for subtype in &config.subtypes {
            subtype_label(subtype)?;
        }

        let host = match config.host {
            Some(host) => host,
            None => host_info.hostname().clone(),
        };
        let addrs = if config.addrs.is_empty() {
            host_info.addrs().to_vec()
        } else {
            config.addrs
        };
        let raw_txt = config.txt.to_segments();

        Ok(Self {
            name: config.name,
            service_type: config.service_type,
            protocol: config.protocol,
            host,
            port: config.port,
            subtypes: config.subtypes,
            txt: config.txt,
            raw_txt,
            addrs,
            cache_flush: config.cache_flush,
            fqdn,
            published: false,
            referer: None,
        })
    }

    /// The instance label.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The application protocol, e.g. `"http"`.
    #[inline]
    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    #[inline]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The SRV target hostname.
    #[inline]
    pub fn host(&self) -> &DomainName {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn subtypes(&self) -> &[String] {
        &self.subtypes
    }

    #[inline]
    pub fn txt(&self) -> &TxtRecords {
        &self.txt
    }

    /// The undecoded TXT segments, as published or as received.
    #[inline]
    pub fn raw_txt(&self) -> &[Vec<u8>] {
        &self.raw_txt
    }

    #[inline]
    pub fn addrs(&self) -> &[IpAddr] {
        &self.addrs
    }

    /// The fully-qualified instance name,
    /// `<instance>.<_type>.<_protocol>.local`.
    #[inline]
    pub fn fqdn(&self) -> &DomainName {
        &self.fqdn
    }

    /// The type name this instance belongs under, e.g. `_http._tcp.local`.
    pub fn type_name(&self) -> DomainName {
        // The fqdn is always `<instance>` followed by the type name.
        DomainName::from_iter(&self.fqdn.labels()[1..])
    }

    /// The stringified type, e.g. `_http._tcp`.
    pub fn type_string(&self) -> String {
        format!("_{}._{}", self.service_type, self.protocol)
    }

    /// Whether the registry has sent the initial announcement.
    #[inline]
    pub fn published(&self) -> bool {
        self.published
    }

    /// For discovered services, the source address of the response that
    /// first introduced this instance.
    #[inline]
    pub fn referer(&self) -> Option<SocketAddr> {
        self.referer
    }

    /// Materializes the DNS-SD record set advertising this service.
    ///
    /// The order is deterministic: the service-enumeration PTR, the type
    /// PTR, SRV, TXT, one PTR per subtype, then one address record per
    /// address.
    pub fn records(&self) -> Vec<Record> {
        let type_name = self.type_name();
        let mut records = vec![
            self.record(
                enumeration_name(),
                TTL_PTR,
                RecordData::PTR(type_name.clone()),
            ),
            self.record(type_name.clone(), TTL_PTR, RecordData::PTR(self.fqdn.clone())),
            self.record(
                self.fqdn.clone(),
                TTL_SRV,
                RecordData::SRV(Srv {
                    priority: 0,
                    weight: 0,
                    port: self.port,
                    target: self.host.clone(),
                }),
            ),
            self.record(
                self.fqdn.clone(),
                TTL_TXT,
                RecordData::TXT(self.txt.to_segments()),
            ),
        ];
        for subtype in &self.subtypes {
            // Discovered descriptors carry subtypes straight off the
            // network, not through `new`'s validation, so the label
            // derivation stays fallible.
            let label = match subtype_label(subtype) {
                Ok(label) => label,
                Err(e) => {
                    log::debug!("skipping unrepresentable subtype '{subtype}': {e}");
                    continue;
                }
            };
            let mut name = DomainName::from_iter([label, Label::new("_sub")]);
            name.extend(type_name.labels());
            records.push(self.record(name, TTL_PTR, RecordData::PTR(self.fqdn.clone())));
        }
        for addr in &self.addrs {
            let data = match addr {
                IpAddr::V4(addr) => RecordData::A(*addr),
                IpAddr::V6(addr) => RecordData::AAAA(*addr),
            };
            records.push(self.record(self.host.clone(), TTL_ADDRESS, data));
        }
        records
    }

    fn record(&self, name: DomainName, ttl: u32, data: RecordData) -> Record {
        Record {
            name,
            ttl,
            cache_flush: self.cache_flush,
            data,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fqdn.fmt(f)
    }
}

/// Returns the type name `_<type>._<protocol>.local`.
pub fn service_type_name(service_type: &str, protocol: Protocol) -> Result<DomainName, Error> {
    let mut name = DomainName::from_iter([Label::try_new(format!("_{service_type}"))?]);
    name.push_label(protocol.to_label());
    name.push_label(Label::new(TLD));
    Ok(name)
}

/// Returns the subtype query name `_<subtype>._sub._<type>._<protocol>.local`.
pub fn subtype_query_name(
    subtype: &str,
    service_type: &str,
    protocol: Protocol,
) -> Result<DomainName, Error> {
    let mut name = DomainName::from_iter([subtype_label(subtype)?, Label::new("_sub")]);
    name.extend(service_type_name(service_type, protocol)?.labels());
    Ok(name)
}

/// Builds the `_<subtype>` label used in subtype PTR and query names.
pub(crate) fn subtype_label(subtype: &str) -> Result<Label, Error> {
    Label::try_new(format!("_{subtype}"))
}

pub(crate) fn enumeration_name() -> DomainName {
    DomainName::from_str(SERVICE_ENUMERATION_NAME).unwrap()
}

/// Splits an instance fqdn `<instance>.<_type>.<_protocol>.<domain...>` into
/// instance label, unprefixed type, and protocol.
pub(crate) fn parse_instance_fqdn(fqdn: &DomainName) -> Option<(String, String, Protocol)> {
    let labels = fqdn.labels();
    // Instance, type, protocol, and at least the domain.
    if labels.len() < 4 {
        return None;
    }
    let service_type = labels[1].as_bytes().strip_prefix(b"_")?;
    let service_type = String::from_utf8(service_type.to_vec()).ok()?;
    let protocol = Protocol::from_label(&labels[2])?;
    Some((labels[0].to_utf8(), service_type, protocol))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn host_info() -> HostInfo {
        HostInfo::new(
            "testhost.local".parse().unwrap(),
            vec!["10.0.0.5".parse().unwrap(), "fe80::1".parse().unwrap()],
        )
    }

    fn config() -> ServiceConfig {
        ServiceConfig {
            name: "Foo Bar".into(),
            service_type: "http".into(),
            port: 3000,
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let service = Service::new(config(), &host_info()).unwrap();
        assert_eq!(service.fqdn().to_string(), "Foo Bar._http._tcp.local");
        assert_eq!(service.protocol(), Protocol::Tcp);
        assert_eq!(service.type_string(), "_http._tcp");
        assert!(!service.cache_flush);
        assert!(service.txt().is_empty());
        assert!(!service.published());
        assert_eq!(service.host().to_string(), "testhost.local");
        assert_eq!(service.addrs().len(), 2);
        assert_eq!(service.referer(), None);
    }

    #[test]
    fn missing_fields() {
        let host = host_info();
        let mut c = config();
        c.name = String::new();
        assert_eq!(
            Service::new(c, &host).unwrap_err(),
            Error::MissingField("name")
        );

        let mut c = config();
        c.service_type = String::new();
        assert_eq!(
            Service::new(c, &host).unwrap_err(),
            Error::MissingField("type")
        );

        let mut c = config();
        c.port = 0;
        assert_eq!(
            Service::new(c, &host).unwrap_err(),
            Error::MissingField("port")
        );
    }

    #[test]
    fn record_set_order() {
        let service = Service::new(config(), &host_info()).unwrap();
        let records = service.records();
        assert_eq!(records.len(), 6);

        assert_eq!(records[0].name.to_string(), SERVICE_ENUMERATION_NAME);
        assert_eq!(records[0].ttl, 28800);
        assert_eq!(
            records[0].data,
            RecordData::PTR("_http._tcp.local".parse().unwrap())
        );

        assert_eq!(records[1].name.to_string(), "_http._tcp.local");
        assert_eq!(records[1].ttl, 28800);
        assert_eq!(
            records[1].data,
            RecordData::PTR("Foo Bar._http._tcp.local".parse().unwrap())
        );

        assert_eq!(records[2].name, service.fqdn);
        assert_eq!(records[2].ttl, 120);
        assert_eq!(
            records[2].data,
            RecordData::SRV(Srv {
                priority: 0,
                weight: 0,
                port: 3000,
                target: "testhost.local".parse().unwrap(),
            })
        );

        assert_eq!(records[3].name, service.fqdn);
        assert_eq!(records[3].ttl, 4500);
        // Empty TXT data still encodes as a single empty segment.
        assert_eq!(records[3].data, RecordData::TXT(vec![Vec::new()]));

        assert_eq!(records[4].ttl, 120);
        assert_eq!(records[4].name.to_string(), "testhost.local");
        assert_eq!(records[4].data, RecordData::A("10.0.0.5".parse().unwrap()));
        assert_eq!(records[5].data, RecordData::AAAA("fe80::1".parse().unwrap()));
    }

    #[test]
    fn subtype_records() {
        let mut c = config();
        c.subtypes = vec!["printer".into(), "color".into()];
        let service = Service::new(c, &host_info()).unwrap();
        let records = service.records();
        assert_eq!(records.len(), 8);
        assert_eq!(
            records[4].name.to_string(),
            "_printer._sub._http._tcp.local"
        );
        assert_eq!(records[5].name.to_string(), "_color._sub._http._tcp.local");
        assert_eq!(records[4].data, RecordData::PTR(service.fqdn.clone()));
        assert_eq!(records[4].ttl, 28800);
    }

    #[test]
    fn explicit_addresses_and_host() {
        let mut c = config();
        c.host = Some("other.local".parse().unwrap());
        c.addrs = vec!["192.168.7.7".parse().unwrap()];
        let service = Service::new(c, &host_info()).unwrap();
        let records = service.records();
        assert_eq!(records.len(), 5);
        assert_eq!(records[4].name.to_string(), "other.local");
        assert_eq!(
            records[4].data,
            RecordData::A("192.168.7.7".parse().unwrap())
        );
    }

    #[test]
    fn cache_flush_propagates() {
        let mut c = config();
        c.cache_flush = true;
        let service = Service::new(c, &host_info()).unwrap();
        assert!(service.records().iter().all(|r| r.cache_flush));
    }

    #[test]
    fn udp_protocol() {
        let mut c = config();
        c.protocol = Protocol::Udp;
        c.service_type = "sleep-proxy".into();
        let service = Service::new(c, &host_info()).unwrap();
        assert_eq!(
            service.fqdn().to_string(),
            "Foo Bar._sleep-proxy._udp.local"
        );
    }

    #[test]
    fn parse_fqdn() {
        let fqdn: DomainName = "X._http._tcp.local".parse().unwrap();
        assert_eq!(
            parse_instance_fqdn(&fqdn),
            Some(("X".into(), "http".into(), Protocol::Tcp))
        );

        let bogus: DomainName = "X.http._tcp.local".parse().unwrap();
        assert_eq!(parse_instance_fqdn(&bogus), None);

        let short: DomainName = "_http._tcp.local".parse().unwrap();
        assert_eq!(parse_instance_fqdn(&short), None);
    }
}
