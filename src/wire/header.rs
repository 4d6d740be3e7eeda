use byteorder::{BigEndian, ByteOrder};

use super::{Error, Opcode, ResponseCode};

pub const HEADER_SIZE: usize = 12;

const FLAG_QR: u16 = 0b1000_0000_0000_0000;
const MASK_OPCODE: u16 = 0b0111_1000_0000_0000;
const OPCODE_SHIFT: u16 = 11;
const FLAG_AA: u16 = 0b0000_0100_0000_0000;
const FLAG_TC: u16 = 0b0000_0010_0000_0000;
const FLAG_RD: u16 = 0b0000_0001_0000_0000;
const FLAG_RA: u16 = 0b0000_0000_1000_0000;
const MASK_RCODE: u16 = 0b0000_0000_0000_1111;

/// The fixed 12-byte header of a DNS message, with the flag word unpacked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub query: bool,
    pub opcode: Opcode,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub response_code: ResponseCode,
    pub questions: u16,
    pub answers: u16,
    pub nameservers: u16,
    pub additional: u16,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Header, Error> {
        if data.len() < HEADER_SIZE {
            return Err(Error::HeaderTooShort);
        }
        let flags = BigEndian::read_u16(&data[2..4]);
        Ok(Header {
            id: BigEndian::read_u16(&data[..2]),
            query: flags & FLAG_QR == 0,
            opcode: ((flags & MASK_OPCODE) >> OPCODE_SHIFT).into(),
            authoritative: flags & FLAG_AA != 0,
            truncated: flags & FLAG_TC != 0,
            recursion_desired: flags & FLAG_RD != 0,
            recursion_available: flags & FLAG_RA != 0,
            response_code: ((flags & MASK_RCODE) as u8).into(),
            questions: BigEndian::read_u16(&data[4..6]),
            answers: BigEndian::read_u16(&data[6..8]),
            nameservers: BigEndian::read_u16(&data[8..10]),
            additional: BigEndian::read_u16(&data[10..12]),
        })
    }

    pub fn write(&self, data: &mut [u8]) {
        let mut flags = 0u16;
        if !self.query {
            flags |= FLAG_QR;
        }
        flags |= (u16::from(self.opcode) << OPCODE_SHIFT) & MASK_OPCODE;
        if self.authoritative {
            flags |= FLAG_AA;
        }
        if self.truncated {
            flags |= FLAG_TC;
        }
        if self.recursion_desired {
            flags |= FLAG_RD;
        }
        if self.recursion_available {
            flags |= FLAG_RA;
        }
        flags |= u16::from(u8::from(self.response_code)) & MASK_RCODE;
        BigEndian::write_u16(&mut data[..2], self.id);
        BigEndian::write_u16(&mut data[2..4], flags);
        BigEndian::write_u16(&mut data[4..6], self.questions);
        BigEndian::write_u16(&mut data[6..8], self.answers);
        BigEndian::write_u16(&mut data[8..10], self.nameservers);
        BigEndian::write_u16(&mut data[10..12], self.additional);
    }

    pub fn set_truncated(data: &mut [u8]) {
        let flags = BigEndian::read_u16(&data[2..4]) | FLAG_TC;
        BigEndian::write_u16(&mut data[2..4], flags);
    }

    pub fn inc_questions(data: &mut [u8]) -> Result<(), ()> {
        inc_count(data, 4)
    }

    pub fn inc_answers(data: &mut [u8]) -> Result<(), ()> {
        inc_count(data, 6)
    }

    pub fn inc_nameservers(data: &mut [u8]) -> Result<(), ()> {
        inc_count(data, 8)
    }

    pub fn inc_additional(data: &mut [u8]) -> Result<(), ()> {
        inc_count(data, 10)
    }
}

fn inc_count(data: &mut [u8], offset: usize) -> Result<(), ()> {
    let count = BigEndian::read_u16(&data[offset..offset + 2]);
    match count.checked_add(1) {
        Some(count) => {
            BigEndian::write_u16(&mut data[offset..offset + 2], count);
            Ok(())
        }
        None => Err(()),
    }
}

#[cfg(test)]
mod test {
    use super::{Header, Opcode, ResponseCode, HEADER_SIZE};

    #[test]
    fn flag_bit_layout() {
        let head = Header {
            id: 0x1234,
            query: false,
            opcode: Opcode::StandardQuery,
            authoritative: true,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            response_code: ResponseCode::Reserved(8),
            questions: 0,
            answers: 0,
            nameservers: 0,
            additional: 0,
        };
        let mut buf = [0u8; HEADER_SIZE];
        head.write(&mut buf);
        assert_eq!(&buf[..4], b"\x12\x34\x84\x08");
    }

    #[test]
    fn parse_inverts_write() {
        let head = Header {
            id: 0xbeef,
            query: false,
            opcode: Opcode::StandardQuery,
            authoritative: true,
            truncated: true,
            recursion_desired: true,
            recursion_available: false,
            response_code: ResponseCode::NameError,
            questions: 1,
            answers: 2,
            nameservers: 3,
            additional: 4,
        };
        let mut buf = [0u8; HEADER_SIZE];
        head.write(&mut buf);
        assert_eq!(Header::parse(&buf).unwrap(), head);
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(Header::parse(&[0u8; 11]).is_err());
    }
}
