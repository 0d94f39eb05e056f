//! DNS packet decoder.

use std::mem::size_of;

use crate::{
    name::{DomainName, Label},
    packet::{Header, Packet, QClass, QType, Question, Type, CLASS_TOP_BIT},
    record::{Record, RecordData, Srv},
    Error,
};

/// Decodes a raw DNS message into an owned [`Packet`].
///
/// Records of unsupported types are skipped, not errors; mDNS responses
/// routinely carry NSEC and OPT records next to the ones DNS-SD cares about.
pub fn decode(buf: &[u8]) -> Result<Packet, Error> {
    let mut r = Reader::new(buf);
    let header = r.read_header()?;

    let mut packet = Packet {
        id: header.id(),
        response: header.is_response(),
        authoritative: header.is_authority(),
        opcode: header.opcode(),
        rcode: header.rcode(),
        ..Packet::default()
    };

    for _ in 0..header.question_count() {
        packet.questions.push(r.read_question()?);
    }
    for _ in 0..header.answer_count() {
        if let Some(record) = r.read_record()? {
            packet.answers.push(record);
        }
    }
    for _ in 0..header.authority_count() {
        if let Some(record) = r.read_record()? {
            packet.authorities.push(record);
        }
    }
    for _ in 0..header.additional_count() {
        if let Some(record) = r.read_record()? {
            packet.additionals.push(record);
        }
    }

    Ok(packet)
}

struct Reader<'a> {
    /// The buffer containing the whole DNS message. Name pointers are offsets
    /// into this.
    full: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { full: buf, pos: 0 }
    }

    fn read_header(&mut self) -> Result<Header, Error> {
        let bytes = self.full.get(..size_of::<Header>()).ok_or(Error::Eof)?;
        self.pos = size_of::<Header>();
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let slice = self.full.get(self.pos..self.pos + len).ok_or(Error::Eof)?;
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const LEN: usize>(&mut self) -> Result<&'a [u8; LEN], Error> {
        Ok(self.read_slice(LEN)?.try_into().unwrap())
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_be_bytes(*self.read_array()?))
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_be_bytes(*self.read_array()?))
    }

    /// Reads a `<character-string>` value.
    fn read_character_string(&mut self) -> Result<&'a [u8], Error> {
        let length = self.read_u8()?;
        self.read_slice(length.into())
    }

    /// Reads a possibly compressed `<domain-name>` value.
    ///
    /// Compression pointers must point to an earlier part of the message;
    /// anything else is rejected as a [`Error::PointerLoop`]. The
    /// specification is unclear about what exactly is allowed, but real
    /// encoders only ever point backwards.
    fn read_name(&mut self) -> Result<DomainName, Error> {
        let mut name = DomainName::ROOT;
        // Where parsing resumes once the first pointer has been followed.
        let mut resume_at = None;
        let mut min_pos = self.pos;
        let mut pos = self.pos;

        loop {
            let length = usize::from(*self.full.get(pos).ok_or(Error::Eof)?);
            match length & 0b1100_0000 {
                0b1100_0000 => {
                    let low = usize::from(*self.full.get(pos + 1).ok_or(Error::Eof)?);
                    let target = (length & 0b0011_1111) << 8 | low;
                    if resume_at.is_none() {
                        resume_at = Some(pos + 2);
                    }
                    if target >= min_pos {
                        return Err(Error::PointerLoop);
                    }
                    min_pos = target;
                    pos = target;
                }
                0b0000_0000 => {
                    pos += 1;
                    if length == 0 {
                        break;
                    }
                    let label = self.full.get(pos..pos + length).ok_or(Error::Eof)?;
                    name.push_label(Label::try_new(label)?);
                    pos += length;
                }
                // Anything but 00 and 11 in the two MSbs is reserved.
                _ => return Err(Error::InvalidValue),
            }
        }

        self.pos = resume_at.unwrap_or(pos);
        Ok(name)
    }

    fn read_question(&mut self) -> Result<Question, Error> {
        let name = self.read_name()?;
        let qtype = QType(self.read_u16()?);
        let raw_class = self.read_u16()?;
        Ok(Question {
            name,
            qtype,
            qclass: QClass(raw_class & !CLASS_TOP_BIT),
            unicast_response: raw_class & CLASS_TOP_BIT != 0,
        })
    }

    /// Reads one resource record, returning `None` for record types this
    /// crate does not model.
    fn read_record(&mut self) -> Result<Option<Record>, Error> {
        let name = self.read_name()?;
        let ty = Type(self.read_u16()?);
        let raw_class = self.read_u16()?;
        let cache_flush = raw_class & CLASS_TOP_BIT != 0;
        let ttl = self.read_u32()?;
        let rdlength = usize::from(self.read_u16()?);

        let end = self.pos + rdlength;
        if end > self.full.len() {
            return Err(Error::Eof);
        }

        let data = match ty {
            Type::A => Some(RecordData::A((*self.read_array::<4>()?).into())),
            Type::AAAA => Some(RecordData::AAAA((*self.read_array::<16>()?).into())),
            Type::PTR => Some(RecordData::PTR(self.read_name()?)),
            Type::SRV => Some(RecordData::SRV(Srv {
                priority: self.read_u16()?,
                weight: self.read_u16()?,
                port: self.read_u16()?,
                target: self.read_name()?,
            })),
            Type::TXT => {
                let mut segments = Vec::new();
                while self.pos < end {
                    segments.push(self.read_character_string()?.to_vec());
                }
                Some(RecordData::TXT(segments))
            }
            _ => None,
        };

        if self.pos > end {
            // RDATA claimed to be shorter than what its contents consumed.
            return Err(Error::Eof);
        }
        self.pos = end;

        Ok(data.map(|data| Record {
            name,
            ttl,
            cache_flush,
            data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use crate::hex;
    use crate::packet::encoder::encode;

    #[test]
    fn roundtrip_response() {
        let fqdn: DomainName = "X._http._tcp.local".parse().unwrap();
        let host: DomainName = "host.local".parse().unwrap();
        let mut srv = Record::new(
            fqdn.clone(),
            120,
            RecordData::SRV(Srv {
                priority: 0,
                weight: 0,
                port: 3000,
                target: host.clone(),
            }),
        );
        srv.cache_flush = true;
        let packet = Packet::response(
            vec![
                Record::new(
                    "_http._tcp.local".parse().unwrap(),
                    28800,
                    RecordData::PTR(fqdn.clone()),
                ),
                srv,
                Record::new(fqdn, 4500, RecordData::TXT(vec![b"foo=bar".to_vec()])),
            ],
            vec![
                Record::new(host.clone(), 120, RecordData::A(Ipv4Addr::new(10, 0, 0, 1))),
                Record::new(host, 120, RecordData::AAAA(Ipv6Addr::LOCALHOST)),
            ],
        );

        let decoded = decode(&encode(&packet)).unwrap();
        assert!(decoded.response);
        assert!(decoded.authoritative);
        assert_eq!(decoded.answers, packet.answers);
        assert_eq!(decoded.additionals, packet.additionals);
        assert!(decoded.questions.is_empty());
    }

    #[test]
    fn roundtrip_query() {
        let packet = Packet::query("_ipp._tcp.local".parse().unwrap(), QType::PTR);
        let decoded = decode(&encode(&packet)).unwrap();
        assert!(decoded.is_query());
        assert_eq!(decoded.questions, packet.questions);
    }

    #[test]
    fn decode_compressed_names() {
        // Two A records; the second one's name is a pointer to the first
        // one's at offset 12.
        let raw = hex::parse(
            "0000 8400 0000 0002 0000 0000
             04 686f7374 05 6c6f63616c 00 0001 0001 00000078 0004 0a000001
             c00c 0001 8001 00000078 0004 0a000002",
        );
        let packet = decode(&raw).unwrap();
        assert_eq!(packet.answers.len(), 2);
        assert_eq!(packet.answers[1].name.to_string(), "host.local");
        assert!(packet.answers[1].cache_flush);
        assert!(!packet.answers[0].cache_flush);
        assert_eq!(
            packet.answers[1].data,
            RecordData::A(Ipv4Addr::new(10, 0, 0, 2))
        );
    }

    #[test]
    fn reject_pointer_loop() {
        // A question whose name is a pointer to itself.
        let raw = hex::parse("0000 0000 0001 0000 0000 0000 c00c 000c 0001");
        assert_eq!(decode(&raw).unwrap_err(), Error::PointerLoop);
    }

    #[test]
    fn skips_unknown_record_types() {
        // An NSEC (type 47) record followed by an A record.
        let raw = hex::parse(
            "0000 8400 0000 0002 0000 0000
             04 686f7374 05 6c6f63616c 00 002f 0001 00000078 0002 abcd
             c00c 0001 0001 00000078 0004 0a000001",
        );
        let packet = decode(&raw).unwrap();
        assert_eq!(packet.answers.len(), 1);
        assert_eq!(
            packet.answers[0].data,
            RecordData::A(Ipv4Addr::new(10, 0, 0, 1))
        );
    }

    #[test]
    fn truncated_message() {
        assert_eq!(decode(&[0x00, 0x01]).unwrap_err(), Error::Eof);
        let raw = hex::parse("0000 0000 0001 0000 0000 0000 04 686f");
        assert_eq!(decode(&raw).unwrap_err(), Error::Eof);
    }
}
