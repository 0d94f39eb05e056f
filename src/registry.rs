//! Publish lifecycle: install records, announce, say goodbye.

use std::io;

use crate::{
    host::HostInfo,
    packet::Type,
    record::TTL_GOODBYE,
    responder::Responder,
    service::{Service, ServiceConfig},
    transport::{OutgoingResponse, Transport},
};

/// Tracks the services this endpoint has published.
#[derive(Debug, Default)]
pub struct Registry {
    services: Vec<Service>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently published services, in publish order.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Publishes a service: validates the config, installs the record set
    /// into the responder, and multicasts it as an unsolicited announcement.
    ///
    /// The announcement is only sent once the records are registered, so a
    /// query racing the publish cannot observe a partial record set.
    pub fn publish<T: Transport>(
        &mut self,
        responder: &mut Responder,
        transport: &mut T,
        host_info: &HostInfo,
        config: ServiceConfig,
    ) -> io::Result<&Service> {
        let mut service = Service::new(config, host_info)?;
        let records = service.records();

        log::info!("publishing {}", service);
        responder.register(records.iter().cloned());
        if let Err(e) = transport.respond(OutgoingResponse {
            answers: records.clone(),
            additionals: Vec::new(),
        }) {
            // Keep the table in sync with the tracked services.
            responder.unregister(records.iter());
            return Err(e);
        }
        service.published = true;

        self.services.push(service);
        Ok(&self.services[self.services.len() - 1])
    }

    /// Unpublishes every service: multicasts a goodbye (the service's PTR
    /// records with TTL 0) per service, then removes all of its records
    /// from the responder.
    ///
    /// Returns once the transport has accepted every send.
    pub fn unpublish_all<T: Transport>(
        &mut self,
        responder: &mut Responder,
        transport: &mut T,
    ) -> io::Result<()> {
        while let Some(service) = self.services.first() {
            let records = service.records();
            let goodbyes = records
                .iter()
                .filter(|r| r.record_type() == Type::PTR)
                .cloned()
                .map(|mut r| {
                    r.ttl = TTL_GOODBYE;
                    r
                })
                .collect();

            log::info!("unpublishing {}", service);
            // A failed goodbye leaves the service tracked so the caller can
            // retry.
            transport.respond(OutgoingResponse {
                answers: goodbyes,
                additionals: Vec::new(),
            })?;
            responder.unregister(records.iter());
            self.services.remove(0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostInfo;
    use crate::record::RecordData;
    use crate::transport::testing::ScriptedTransport;

    fn host_info() -> HostInfo {
        HostInfo::new(
            "testhost.local".parse().unwrap(),
            vec!["10.0.0.5".parse().unwrap()],
        )
    }

    fn config(name: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.into(),
            service_type: "http".into(),
            port: 3000,
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn publish_installs_exact_record_set() {
        let mut registry = Registry::new();
        let mut responder = Responder::new();
        let mut transport = ScriptedTransport::default();

        let service = registry
            .publish(&mut responder, &mut transport, &host_info(), config("Foo"))
            .unwrap();
        assert!(service.published());
        let records = service.records();

        // The responder holds exactly the materialized set, and the
        // announcement carries it in the answers section.
        assert_eq!(responder.len(), records.len());
        assert_eq!(transport.responses.len(), 1);
        assert_eq!(transport.responses[0].answers, records);
        assert!(transport.responses[0].additionals.is_empty());
    }

    #[test]
    fn publish_rejects_invalid_config() {
        let mut registry = Registry::new();
        let mut responder = Responder::new();
        let mut transport = ScriptedTransport::default();

        let err = registry
            .publish(&mut responder, &mut transport, &host_info(), {
                let mut c = config("Foo");
                c.port = 0;
                c
            })
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(responder.is_empty());
        assert!(registry.services().is_empty());
    }

    #[test]
    fn unpublish_sends_goodbyes_and_clears_table() {
        let mut registry = Registry::new();
        let mut responder = Responder::new();
        let mut transport = ScriptedTransport::default();

        registry
            .publish(&mut responder, &mut transport, &host_info(), config("Foo"))
            .unwrap();
        registry
            .publish(&mut responder, &mut transport, &host_info(), config("Bar"))
            .unwrap();
        transport.responses.clear();

        registry
            .unpublish_all(&mut responder, &mut transport)
            .unwrap();

        // One goodbye per service, containing only PTRs with TTL 0.
        assert_eq!(transport.responses.len(), 2);
        for response in &transport.responses {
            assert_eq!(response.answers.len(), 2);
            for record in &response.answers {
                assert_eq!(record.record_type(), Type::PTR);
                assert_eq!(record.ttl, 0);
                assert!(matches!(record.data, RecordData::PTR(_)));
            }
        }
        assert!(responder.is_empty());
        assert!(registry.services().is_empty());
    }

    #[test]
    fn goodbye_send_errors_propagate() {
        let mut registry = Registry::new();
        let mut responder = Responder::new();
        let mut transport = ScriptedTransport::default();

        registry
            .publish(&mut responder, &mut transport, &host_info(), config("Foo"))
            .unwrap();

        transport.fail_sends = true;
        assert!(registry
            .unpublish_all(&mut responder, &mut transport)
            .is_err());
    }
}
