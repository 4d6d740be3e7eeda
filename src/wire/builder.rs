use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::{Header, Name, Opcode, QueryClass, QueryType, RRData, ResponseCode, HEADER_SIZE};

/// RCODE carried by the unsupported/error response template.
const UNSUPPORTED_RCODE: u8 = 8;

pub enum Questions {}
pub enum Answers {}
pub enum Nameservers {}
pub enum Additional {}

pub trait MoveTo<T> {}
impl<T> MoveTo<T> for T {}

impl MoveTo<Answers> for Questions {}

impl MoveTo<Nameservers> for Questions {}
impl MoveTo<Nameservers> for Answers {}

impl MoveTo<Additional> for Questions {}
impl MoveTo<Additional> for Answers {}
impl MoveTo<Additional> for Nameservers {}

/// Serializes a DNS message
///
/// The typestate parameter keeps the question and answer sections in wire
/// order at compile time. Names are always written out in full; the builder
/// never emits compression pointers, even though the parser accepts them.
pub struct Builder<S> {
    buf: Vec<u8>,
    max_size: Option<usize>,
    _state: PhantomData<S>,
}

impl Builder<Questions> {
    /// Creates an upstream request: every flag bit clear, sections empty.
    /// You're expected to fill the question section with `add_question`.
    pub fn new_request(id: u16) -> Builder<Questions> {
        Builder::with_header(Header {
            id,
            query: true,
            opcode: Opcode::StandardQuery,
            authoritative: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            response_code: ResponseCode::NoError,
            questions: 0,
            answers: 0,
            nameservers: 0,
            additional: 0,
        })
    }

    /// Creates an authoritative success response: QR and AA set, everything
    /// else clear.
    pub fn new_response(id: u16) -> Builder<Questions> {
        Builder::with_header(Header {
            id,
            query: false,
            opcode: Opcode::StandardQuery,
            authoritative: true,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            response_code: ResponseCode::NoError,
            questions: 0,
            answers: 0,
            nameservers: 0,
            additional: 0,
        })
    }

    fn with_header(head: Header) -> Builder<Questions> {
        let mut buf = Vec::with_capacity(512);
        buf.extend([0u8; HEADER_SIZE].iter());
        head.write(&mut buf[..HEADER_SIZE]);
        Builder {
            buf,
            max_size: Some(512),
            _state: PhantomData,
        }
    }
}

impl<T> Builder<T> {
    fn write_rr(&mut self, name: &Name, cls: QueryClass, ttl: u32, data: &RRData) {
        name.write_to(&mut self.buf).unwrap();
        self.buf.write_u16::<BigEndian>(data.typ() as u16).unwrap();
        self.buf.write_u16::<BigEndian>(cls as u16).unwrap();
        self.buf.write_u32::<BigEndian>(ttl).unwrap();

        let size_offset = self.buf.len();
        self.buf.write_u16::<BigEndian>(0).unwrap();

        let data_offset = self.buf.len();
        data.write_to(&mut self.buf).unwrap();
        let data_size = self.buf.len() - data_offset;

        BigEndian::write_u16(
            &mut self.buf[size_offset..size_offset + 2],
            data_size as u16,
        );
    }

    /// Returns the final message
    ///
    /// When the message fits the size limit the method returns
    /// `Ok(bytes)`. Otherwise it returns `Err(bytes)` with the truncated
    /// flag set; the bytes are valid either way, so a server may reply with
    /// `x.build().unwrap_or_else(|x| x)`.
    pub fn build(self) -> Result<Vec<u8>, Vec<u8>> {
        match self.max_size {
            Some(max_size) if self.buf.len() > max_size => {
                let mut buf = self.buf;
                Header::set_truncated(&mut buf[..HEADER_SIZE]);
                Err(buf)
            }
            _ => Ok(self.buf),
        }
    }

    pub fn move_to<U>(self) -> Builder<U>
    where
        T: MoveTo<U>,
    {
        Builder {
            buf: self.buf,
            max_size: self.max_size,
            _state: PhantomData,
        }
    }
}

impl<T: MoveTo<Questions>> Builder<T> {
    /// Adds a question to the message
    ///
    /// # Panics
    ///
    /// * There are already 65535 questions in the buffer.
    pub fn add_question(
        self,
        qname: &Name,
        qtype: QueryType,
        qclass: QueryClass,
    ) -> Builder<Questions> {
        let mut builder = self.move_to::<Questions>();

        qname.write_to(&mut builder.buf).unwrap();
        builder.buf.write_u16::<BigEndian>(qtype as u16).unwrap();
        builder.buf.write_u16::<BigEndian>(qclass as u16).unwrap();
        Header::inc_questions(&mut builder.buf).expect("Too many questions");
        builder
    }
}

impl<T: MoveTo<Answers>> Builder<T> {
    pub fn add_answer(
        self,
        name: &Name,
        cls: QueryClass,
        ttl: u32,
        data: &RRData,
    ) -> Builder<Answers> {
        let mut builder = self.move_to::<Answers>();

        builder.write_rr(name, cls, ttl, data);
        Header::inc_answers(&mut builder.buf).expect("Too many answers");

        builder
    }
}

impl<T: MoveTo<Nameservers>> Builder<T> {
    pub fn add_nameserver(
        self,
        name: &Name,
        cls: QueryClass,
        ttl: u32,
        data: &RRData,
    ) -> Builder<Nameservers> {
        let mut builder = self.move_to::<Nameservers>();

        builder.write_rr(name, cls, ttl, data);
        Header::inc_nameservers(&mut builder.buf).expect("Too many nameservers");

        builder
    }
}

impl<T: MoveTo<Additional>> Builder<T> {
    pub fn add_additional(
        self,
        name: &Name,
        cls: QueryClass,
        ttl: u32,
        data: &RRData,
    ) -> Builder<Additional> {
        let mut builder = self.move_to::<Additional>();

        builder.write_rr(name, cls, ttl, data);
        Header::inc_additional(&mut builder.buf).expect("Too many additional answers");

        builder
    }
}

/// The fixed 12-byte reply used whenever a request cannot be serviced:
/// QR and AA set, RCODE 8, all four counts zero.
pub fn unsupported_response(id: u16) -> Vec<u8> {
    let head = Header {
        id,
        query: false,
        opcode: Opcode::StandardQuery,
        authoritative: true,
        truncated: false,
        recursion_desired: false,
        recursion_available: false,
        response_code: ResponseCode::Reserved(UNSUPPORTED_RCODE),
        questions: 0,
        answers: 0,
        nameservers: 0,
        additional: 0,
    };
    let mut buf = vec![0u8; HEADER_SIZE];
    head.write(&mut buf);
    buf
}

#[cfg(test)]
mod test {
    use super::super::{Message, RRData};
    use super::unsupported_response;
    use super::Builder;
    use super::Name;
    use super::QueryClass as QC;
    use super::QueryType as QT;

    #[test]
    fn build_request() {
        let mut bld = Builder::new_request(0x1234);
        let name = Name::from_str("example.com").unwrap();
        bld = bld.add_question(&name, QT::A, QC::IN);
        let result = b"\x12\x34\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\
                      \x07example\x03com\x00\x00\x01\x00\x01";
        assert_eq!(&bld.build().unwrap()[..], &result[..]);
    }

    #[test]
    fn build_unsupported_response() {
        let result = b"\x12\x34\x84\x08\x00\x00\x00\x00\x00\x00\x00\x00";
        assert_eq!(&unsupported_response(0x1234)[..], &result[..]);
    }

    #[test]
    fn build_response_with_answer() {
        let name = Name::from_str("example.com").unwrap();
        let bld = Builder::new_response(0x1234)
            .add_question(&name, QT::A, QC::IN)
            .add_answer(&name, QC::IN, 3600, &RRData::A("93.184.216.34".parse().unwrap()));
        let bytes = bld.build().unwrap();
        assert_eq!(&bytes[..4], b"\x12\x34\x84\x00");

        let reread = Message::parse(&bytes).unwrap();
        assert_eq!(reread.header.questions, 1);
        assert_eq!(reread.header.answers, 1);
        assert_eq!(reread.answers[0].name, name);
        assert_eq!(reread.answers[0].data.to_string(), "93.184.216.34");
    }

    #[test]
    fn build_ns_answer_carries_rdlength() {
        let owner = Name::from_str("com").unwrap();
        let target = Name::from_str("a.gtld-servers.net").unwrap();
        let bytes = Builder::new_response(1)
            .add_answer(&owner, QC::IN, 172800, &RRData::NS(target.clone()))
            .build()
            .unwrap();
        let reread = Message::parse(&bytes).unwrap();
        assert_eq!(reread.answers[0].data, RRData::NS(target));
    }
}
