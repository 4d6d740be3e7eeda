use byteorder::{BigEndian, ByteOrder};

use super::{Error, Header, Name, QueryClass, QueryType, RRData, HEADER_SIZE};

/// Parsed DNS message
///
/// Produced fresh by each `parse` call and immutable afterwards; the parse
/// cursor is a local of the decoder, no parsing state survives on the
/// message itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub nameservers: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

/// A parsed chunk of data in the question section of the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub qname: Name,
    pub qtype: QueryType,
    pub qclass: QueryClass,
}

/// A single DNS record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: Name,
    pub cls: QueryClass,
    pub ttl: u32,
    pub data: RRData,
}

impl Message {
    /// Decodes a whole message. Every count the header declares must be
    /// satisfied before the buffer ends; a short section fails instead of
    /// truncating silently.
    pub fn parse(data: &[u8]) -> Result<Message, Error> {
        let header = Header::parse(data)?;
        let mut pos = HEADER_SIZE;

        let mut questions = Vec::with_capacity(header.questions as usize);
        for _ in 0..header.questions {
            let (qname, next) = Name::scan(data, pos)?;
            pos = next;
            if data.len() < pos + 4 {
                return Err(Error::UnexpectedEof);
            }
            let qtype = QueryType::parse(BigEndian::read_u16(&data[pos..pos + 2]))?;
            let qclass = QueryClass::parse(BigEndian::read_u16(&data[pos + 2..pos + 4]))?;
            pos += 4;
            questions.push(Question {
                qname,
                qtype,
                qclass,
            });
        }

        let answers = parse_records(data, &mut pos, header.answers)?;
        let nameservers = parse_records(data, &mut pos, header.nameservers)?;
        let additional = parse_records(data, &mut pos, header.additional)?;

        Ok(Message {
            header,
            questions,
            answers,
            nameservers,
            additional,
        })
    }
}

fn parse_records(data: &[u8], pos: &mut usize, count: u16) -> Result<Vec<ResourceRecord>, Error> {
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (name, next) = Name::scan(data, *pos)?;
        *pos = next;
        if data.len() < *pos + 10 {
            return Err(Error::UnexpectedEof);
        }
        let typ = BigEndian::read_u16(&data[*pos..*pos + 2]);
        let cls = QueryClass::parse(BigEndian::read_u16(&data[*pos + 2..*pos + 4]))?;
        let ttl = BigEndian::read_u32(&data[*pos + 4..*pos + 8]);
        let rdlen = BigEndian::read_u16(&data[*pos + 8..*pos + 10]) as usize;
        *pos += 10;
        if data.len() < *pos + rdlen {
            return Err(Error::UnexpectedEof);
        }
        let data_ = RRData::parse(typ, data, *pos, rdlen)?;
        *pos += rdlen;
        records.push(ResourceRecord {
            name,
            cls,
            ttl,
            data: data_,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod test {
    use super::super::{Error, QueryClass, QueryType, RRData};
    use super::Message;

    #[test]
    fn parse_query() {
        let data = b"\x12\x34\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\
                     \x07example\x03com\x00\x00\x01\x00\x01";
        let msg = Message::parse(data).unwrap();
        assert_eq!(msg.header.id, 0x1234);
        assert!(msg.header.query);
        assert_eq!(msg.questions.len(), 1);
        assert_eq!(msg.questions[0].qname.to_string(), "example.com");
        assert_eq!(msg.questions[0].qtype, QueryType::A);
        assert_eq!(msg.questions[0].qclass, QueryClass::IN);
        assert!(msg.answers.is_empty());
    }

    #[test]
    fn parse_response_with_compressed_answer() {
        // Answer owner name is a pointer back to the question name.
        let data = b"\x12\x34\x84\x00\x00\x01\x00\x01\x00\x00\x00\x00\
                     \x07example\x03com\x00\x00\x01\x00\x01\
                     \xc0\x0c\x00\x01\x00\x01\x00\x00\x0e\x10\x00\x04\x5d\xb8\xd8\x22";
        let msg = Message::parse(data).unwrap();
        assert_eq!(msg.answers.len(), 1);
        assert_eq!(msg.answers[0].name.to_string(), "example.com");
        assert_eq!(msg.answers[0].ttl, 3600);
        assert_eq!(msg.answers[0].data.to_string(), "93.184.216.34");
    }

    #[test]
    fn declared_count_must_be_satisfied() {
        // Header claims one question but the body is empty.
        let data = b"\x12\x34\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00";
        assert_eq!(Message::parse(data), Err(Error::UnexpectedEof));
    }

    #[test]
    fn rdata_must_fit_declared_length() {
        let data = b"\x12\x34\x84\x00\x00\x00\x00\x01\x00\x00\x00\x00\
                     \x03foo\x00\x00\x01\x00\x01\x00\x00\x00\x3c\x00\x04\x01\x02";
        assert_eq!(Message::parse(data), Err(Error::UnexpectedEof));
    }

    #[test]
    fn short_header_is_rejected() {
        assert_eq!(Message::parse(b"\x12\x34"), Err(Error::HeaderTooShort));
    }

    #[test]
    fn unsupported_record_type_is_rejected() {
        // One answer of type MX (15).
        let data = b"\x12\x34\x84\x00\x00\x00\x00\x01\x00\x00\x00\x00\
                     \x03foo\x00\x00\x0f\x00\x01\x00\x00\x00\x3c\x00\x02\x00\x05";
        assert_eq!(Message::parse(data), Err(Error::UnsupportedRecordType(15)));
    }

    #[test]
    fn records_decode_as_typed_data() {
        let data = b"\x00\x01\x84\x00\x00\x00\x00\x01\x00\x00\x00\x00\
                     \x03com\x00\x00\x02\x00\x01\x00\x02\xa3\x00\x00\x14\
                     \x01a\x0cgtld-servers\x03net\x00";
        let msg = Message::parse(data).unwrap();
        match msg.answers[0].data {
            RRData::NS(ref name) => assert_eq!(name.to_string(), "a.gtld-servers.net"),
            ref other => panic!("expected NS data, got {:?}", other),
        }
    }
}
