//! The mDNS endpoint: one handle owning the transport, the responder, and
//! the registry.

use std::{
    io,
    time::{Duration, Instant},
};

use crate::{
    browser::{BrowseConfig, Browser, ServiceEvent},
    host::HostInfo,
    registry::Registry,
    responder::Responder,
    service::{Service, ServiceConfig},
    transport::{MulticastTransport, Transport},
};

/// An mDNS/DNS-SD endpoint.
///
/// Publishing installs records into the endpoint's responder and announces
/// them; browsing hands out [`Browser`] state machines that are fed by
/// [`Mdns::poll`]. Everything runs on the caller's thread: the only blocking
/// points are the transport's receive and sends.
pub struct Mdns<T: Transport = MulticastTransport> {
    transport: T,
    responder: Responder,
    registry: Registry,
    host_info: HostInfo,
}

impl Mdns {
    /// Opens the multicast transport and detects the local host identity.
    pub fn new() -> io::Result<Self> {
        Ok(Self::with_transport(
            MulticastTransport::new()?,
            HostInfo::detect()?,
        ))
    }
}

impl<T: Transport> Mdns<T> {
    /// Creates an endpoint over an explicit transport and host identity.
    pub fn with_transport(transport: T, host_info: HostInfo) -> Self {
        Self {
            transport,
            responder: Responder::new(),
            registry: Registry::new(),
            host_info,
        }
    }

    /// The host identity used for services that don't specify their own.
    pub fn host_info(&self) -> &HostInfo {
        &self.host_info
    }

    /// The services published through this endpoint.
    pub fn services(&self) -> &[Service] {
        self.registry.services()
    }

    /// Publishes a service and announces it on the link.
    pub fn publish(&mut self, config: ServiceConfig) -> io::Result<&Service> {
        self.registry.publish(
            &mut self.responder,
            &mut self.transport,
            &self.host_info,
            config,
        )
    }

    /// Sends a goodbye for every published service and removes their
    /// records. Returns once the transport has accepted the sends.
    pub fn unpublish_all(&mut self) -> io::Result<()> {
        self.registry
            .unpublish_all(&mut self.responder, &mut self.transport)
    }

    /// Creates a started [`Browser`]: the initial PTR queries are sent
    /// before this returns. Feed it via [`Mdns::poll`].
    pub fn browse(&mut self, config: BrowseConfig) -> io::Result<Browser> {
        let mut browser = Browser::new(config)?;
        browser.start(&mut self.transport)?;
        Ok(browser)
    }

    /// Receives one packet and dispatches it: queries go to the responder,
    /// responses to every given browser.
    ///
    /// Returns `Ok(false)` when `timeout` elapsed without a packet.
    pub fn poll(
        &mut self,
        browsers: &mut [&mut Browser],
        timeout: Option<Duration>,
    ) -> io::Result<bool> {
        let Some((packet, rinfo)) = self.transport.recv(timeout)? else {
            return Ok(false);
        };

        if packet.is_query() {
            self.responder
                .respond_to_query(&packet, &mut self.transport)?;
        } else {
            for browser in browsers {
                browser.handle_response(&packet, rinfo, &mut self.transport)?;
            }
        }
        Ok(true)
    }

    /// Browses until the first service comes up, then stops.
    ///
    /// Returns `Ok(None)` when `timeout` elapses without one.
    pub fn find_one(
        &mut self,
        config: BrowseConfig,
        timeout: Duration,
    ) -> io::Result<Option<Service>> {
        let mut browser = self.browse(config)?;
        let deadline = Instant::now() + timeout;

        loop {
            while let Some(event) = browser.poll_event() {
                if let ServiceEvent::Up(service) = event {
                    browser.stop();
                    return Ok(Some(service));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                browser.stop();
                return Ok(None);
            }
            self.poll(&mut [&mut browser], Some(deadline - now))?;
        }
    }

    /// Fire-and-forget teardown: unpublishes everything and drops the
    /// transport. Send failures are logged, not returned.
    pub fn destroy(mut self) {
        if let Err(e) = self.unpublish_all() {
            log::debug!("failed to unpublish on destroy: {}", e);
        }
    }
}
