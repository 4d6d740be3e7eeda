use super::Error;

/// The closed set of record types this resolver speaks, used for both
/// questions and resource records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    A = 1,
    NS = 2,
    PTR = 12,
    AAAA = 28,
}

impl QueryType {
    pub fn parse(code: u16) -> Result<QueryType, Error> {
        match code {
            1 => Ok(QueryType::A),
            2 => Ok(QueryType::NS),
            12 => Ok(QueryType::PTR),
            28 => Ok(QueryType::AAAA),
            code => Err(Error::UnsupportedRecordType(code)),
        }
    }
}

/// The QCLASS/CLASS of a question or record; only the internet class exists
/// here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryClass {
    IN = 1,
}

impl QueryClass {
    pub fn parse(code: u16) -> Result<QueryClass, Error> {
        match code {
            1 => Ok(QueryClass::IN),
            code => Err(Error::UnsupportedClass(code)),
        }
    }
}

/// The four-bit opcode field of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    StandardQuery,
    InverseQuery,
    ServerStatusRequest,
    Reserved(u16),
}

impl From<u16> for Opcode {
    fn from(code: u16) -> Opcode {
        match code {
            0 => Opcode::StandardQuery,
            1 => Opcode::InverseQuery,
            2 => Opcode::ServerStatusRequest,
            code => Opcode::Reserved(code),
        }
    }
}

impl From<Opcode> for u16 {
    fn from(opcode: Opcode) -> u16 {
        match opcode {
            Opcode::StandardQuery => 0,
            Opcode::InverseQuery => 1,
            Opcode::ServerStatusRequest => 2,
            Opcode::Reserved(code) => code,
        }
    }
}

/// The four-bit response code field of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(u8),
}

impl From<u8> for ResponseCode {
    fn from(code: u8) -> ResponseCode {
        match code {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            code => ResponseCode::Reserved(code),
        }
    }
}

impl From<ResponseCode> for u8 {
    fn from(code: ResponseCode) -> u8 {
        match code {
            ResponseCode::NoError => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Reserved(code) => code,
        }
    }
}
