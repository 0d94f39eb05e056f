//! Local host identity: the hostname and addresses published for services
//! that don't specify their own.

use std::{io, net::IpAddr};

use crate::name::DomainName;

/// The local hostname and the interface addresses worth advertising.
#[derive(Debug, Clone)]
pub struct HostInfo {
    hostname: DomainName,
    addrs: Vec<IpAddr>,
}

impl HostInfo {
    /// Detects the system hostname (suffixed with `.local` if it isn't
    /// already) and enumerates all non-loopback interface addresses.
    pub fn detect() -> io::Result<Self> {
        let mut hostname = gethostname::gethostname().to_string_lossy().into_owned();
        if !hostname.ends_with(".local") {
            hostname.push_str(".local");
        }
        let hostname = DomainName::from_str(&hostname).map_err(io::Error::from)?;

        let mut addrs = Vec::new();
        for iface in if_addrs::get_if_addrs()? {
            if iface.is_loopback() {
                continue;
            }
            addrs.push(iface.ip());
        }

        Ok(Self { hostname, addrs })
    }

    /// Creates host info from explicit values, bypassing detection.
    pub fn new(hostname: DomainName, addrs: Vec<IpAddr>) -> Self {
        Self { hostname, addrs }
    }

    /// The hostname published as the default SRV target.
    #[inline]
    pub fn hostname(&self) -> &DomainName {
        &self.hostname
    }

    /// Addresses published for the default hostname, in interface order.
    #[inline]
    pub fn addrs(&self) -> &[IpAddr] {
        &self.addrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_host_info() {
        let host = HostInfo::new(
            "host.local".parse().unwrap(),
            vec!["10.0.0.1".parse().unwrap(), "fe80::1".parse().unwrap()],
        );
        assert_eq!(host.hostname().to_string(), "host.local");
        assert_eq!(host.addrs().len(), 2);
    }
}
