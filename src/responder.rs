//! The authoritative record table answering incoming multicast queries.

use std::{collections::BTreeMap, io};

use crate::{
    packet::{Class, Packet, QType, Question, Type},
    record::{Record, RecordData},
    transport::{OutgoingResponse, Transport},
};

/// Holds the records this host is authoritative for, indexed by record type.
///
/// The responder is a passive query→answer function over its table; it keeps
/// no per-query state.
#[derive(Debug, Default)]
pub struct Responder {
    records: BTreeMap<Type, Vec<Record>>,
}

impl Responder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds records to the table.
    ///
    /// A record duplicating an existing entry under `(type, name, data)` is
    /// silently dropped, so registering the same set twice is a no-op.
    pub fn register(&mut self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            let bucket = self.records.entry(record.record_type()).or_default();
            if bucket.iter().any(|existing| existing.same_entry(&record)) {
                log::debug!("duplicate record dropped: {}", record);
                continue;
            }
            bucket.push(record);
        }
    }

    /// Removes all records matching the `(type, name)` of each given record.
    ///
    /// Unregistering records that were never registered is a no-op.
    pub fn unregister<'a>(&mut self, records: impl IntoIterator<Item = &'a Record>) {
        for record in records {
            if let Some(bucket) = self.records.get_mut(&record.record_type()) {
                bucket.retain(|existing| !existing.same_key(record));
                if bucket.is_empty() {
                    self.records.remove(&record.record_type());
                }
            }
        }
    }

    /// All registered records of `ty`, in registration order.
    pub fn records_of(&self, ty: Type) -> &[Record] {
        self.records.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of registered records.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.values().all(Vec::is_empty)
    }

    /// Answers every question of an incoming query, multicasting one
    /// response per question that produced at least one answer.
    ///
    /// Transport errors propagate to the caller.
    pub fn respond_to_query<T: Transport>(
        &self,
        packet: &Packet,
        transport: &mut T,
    ) -> io::Result<()> {
        if !packet.is_query() || packet.opcode != 0 || packet.rcode != 0 {
            return Ok(());
        }

        for question in &packet.questions {
            log::debug!("Q: {} {}", question.name, question.qtype);
            let (answers, additionals) = self.answer(question);
            if answers.is_empty() {
                continue;
            }
            transport.respond(OutgoingResponse {
                answers,
                additionals,
            })?;
        }
        Ok(())
    }

    /// Derives the answer and additional sections for one question.
    fn answer(&self, question: &Question) -> (Vec<Record>, Vec<Record>) {
        // Everything in the table is IN class.
        if !question.qclass.matches(Class::IN) {
            return (Vec::new(), Vec::new());
        }

        let answers: Vec<Record> = self
            .records
            .iter()
            .filter(|(ty, _)| question.qtype.matches(**ty))
            .flat_map(|(_, bucket)| bucket.iter())
            .filter(|record| Self::name_matches(question, record))
            .cloned()
            .collect();

        // Clients asking for ANY get no additionals.
        if question.qtype == QType::ANY {
            return (answers, Vec::new());
        }

        // For every PTR answer, chase the record graph: the SRV/TXT pair of
        // the pointed-to instance, then the address records of each SRV
        // target. Clients deduplicate, so we don't.
        let mut additionals = Vec::new();
        for answer in &answers {
            if let RecordData::PTR(instance) = &answer.data {
                for ty in [Type::SRV, Type::TXT] {
                    additionals.extend(
                        self.records_of(ty)
                            .iter()
                            .filter(|r| r.name == *instance)
                            .cloned(),
                    );
                }
            }
        }
        let targets: Vec<_> = additionals
            .iter()
            .filter_map(|r| match &r.data {
                RecordData::SRV(srv) => Some(srv.target.clone()),
                _ => None,
            })
            .collect();
        for target in targets {
            for ty in [Type::A, Type::AAAA] {
                additionals.extend(
                    self.records_of(ty)
                        .iter()
                        .filter(|r| r.name == target)
                        .cloned(),
                );
            }
        }

        (answers, additionals)
    }

    /// The DNS-SD name-match rule: fully-qualified question names match the
    /// whole record name, bare (single-label) ones match its first label
    /// only. The latter lets `hostname`-style queries find `hostname.local`
    /// address records.
    fn name_matches(question: &Question, record: &Record) -> bool {
        let qlabels = question.name.labels();
        if qlabels.len() > 1 {
            question.name == record.name
        } else {
            qlabels.first() == record.name.first_label()
        }
    }
}
