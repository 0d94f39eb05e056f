//! DNS packet encoder.
//!
//! Names are written uncompressed. Compression saves a few dozen bytes per
//! response but mDNS messages comfortably fit a single link-local packet
//! without it, and every decoder must accept uncompressed names.

use crate::{
    name::DomainName,
    packet::{Class, Header, Packet, CLASS_TOP_BIT},
    record::{Record, RecordData},
};

/// Encodes a [`Packet`] into its wire form.
pub fn encode(packet: &Packet) -> Vec<u8> {
    let mut header = Header::default();
    header.set_id(packet.id);
    header.set_response(packet.response);
    header.set_authority(packet.authoritative);
    header.set_counts(
        packet.questions.len() as u16,
        packet.answers.len() as u16,
        packet.authorities.len() as u16,
        packet.additionals.len() as u16,
    );

    let mut w = Writer::new();
    w.write_slice(bytemuck::bytes_of(&header));

    for question in &packet.questions {
        w.write_name(&question.name);
        w.write_u16(question.qtype.0);
        w.write_u16(question.qclass.0);
    }
    for record in packet
        .answers
        .iter()
        .chain(&packet.authorities)
        .chain(&packet.additionals)
    {
        w.write_record(record);
    }

    w.buf
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self {
            buf: Vec::with_capacity(crate::MDNS_BUFFER_SIZE),
        }
    }

    fn write_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn write_u8(&mut self, b: u8) {
        self.buf.push(b);
    }

    fn write_u16(&mut self, v: u16) {
        self.write_slice(&v.to_be_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.write_slice(&v.to_be_bytes());
    }

    fn write_name(&mut self, name: &DomainName) {
        for label in name.labels() {
            self.write_u8(label.as_bytes().len() as u8);
            self.write_slice(label.as_bytes());
        }
        // Implicit root label at the end.
        self.write_u8(0);
    }

    fn write_character_string(&mut self, string: &[u8]) {
        assert!(string.len() <= 255);
        self.write_u8(string.len() as u8);
        self.write_slice(string);
    }

    fn write_record(&mut self, record: &Record) {
        self.write_name(&record.name);
        self.write_u16(record.record_type().0);
        let mut class = Class::IN.0;
        if record.cache_flush {
            class |= CLASS_TOP_BIT;
        }
        self.write_u16(class);
        self.write_u32(record.ttl);

        // RDATA length is back-patched once the data has been written.
        let length_at = self.buf.len();
        self.write_u16(0);
        match &record.data {
            RecordData::A(addr) => self.write_slice(&addr.octets()),
            RecordData::AAAA(addr) => self.write_slice(&addr.octets()),
            RecordData::PTR(name) => self.write_name(name),
            RecordData::SRV(srv) => {
                self.write_u16(srv.priority);
                self.write_u16(srv.weight);
                self.write_u16(srv.port);
                self.write_name(&srv.target);
            }
            RecordData::TXT(segments) => {
                for segment in segments {
                    self.write_character_string(segment);
                }
            }
        }
        let rdata_len = self.buf.len() - length_at - 2;
        let rdata_len = u16::try_from(rdata_len).expect("RDATA length overflows u16");
        self.buf[length_at..length_at + 2].copy_from_slice(&rdata_len.to_be_bytes());
    }
}
