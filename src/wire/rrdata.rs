use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::{Error, Name, QueryType};

/// The closed set of resource record data this resolver understands
///
/// Anything outside it fails at the parse boundary instead of being carried
/// around as an opaque blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RRData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(Name),
    PTR(Name),
}

impl RRData {
    pub fn typ(&self) -> QueryType {
        match *self {
            RRData::A(..) => QueryType::A,
            RRData::AAAA(..) => QueryType::AAAA,
            RRData::NS(..) => QueryType::NS,
            RRData::PTR(..) => QueryType::PTR,
        }
    }

    /// Decodes the RDATA of a record with wire type `typ`.
    ///
    /// `pos` and `len` delimit the RDATA inside the whole message buffer;
    /// embedded names may follow compression pointers anywhere in it.
    pub fn parse(typ: u16, data: &[u8], pos: usize, len: usize) -> Result<RRData, Error> {
        match QueryType::parse(typ)? {
            QueryType::A => {
                if len != 4 {
                    return Err(Error::WrongRdataLength);
                }
                Ok(RRData::A(Ipv4Addr::from(BigEndian::read_u32(
                    &data[pos..pos + 4],
                ))))
            }
            QueryType::AAAA => {
                if len != 16 {
                    return Err(Error::WrongRdataLength);
                }
                let mut groups = [0u16; 8];
                for (i, group) in groups.iter_mut().enumerate() {
                    *group = BigEndian::read_u16(&data[pos + 2 * i..pos + 2 * i + 2]);
                }
                Ok(RRData::AAAA(Ipv6Addr::from(groups)))
            }
            QueryType::NS => Ok(RRData::NS(Name::scan(data, pos)?.0)),
            QueryType::PTR => Ok(RRData::PTR(Name::scan(data, pos)?.0)),
        }
    }

    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        match *self {
            RRData::A(ip) => writer.write_u32::<BigEndian>(ip.into()),
            RRData::AAAA(ip) => {
                for segment in ip.segments().iter() {
                    writer.write_u16::<BigEndian>(*segment)?;
                }
                Ok(())
            }
            RRData::NS(ref name) | RRData::PTR(ref name) => name.write_to(writer),
        }
    }
}

impl fmt::Display for RRData {
    /// Textual form used at the API boundary: dotted-decimal for A, eight
    /// lowercase hex groups (no zero-run compression) for AAAA, dotted
    /// names for NS and PTR.
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RRData::A(ip) => write!(fmt, "{}", ip),
            RRData::AAAA(ip) => {
                for (i, segment) in ip.segments().iter().enumerate() {
                    if i != 0 {
                        fmt.write_str(":")?;
                    }
                    write!(fmt, "{:x}", segment)?;
                }
                Ok(())
            }
            RRData::NS(ref name) | RRData::PTR(ref name) => write!(fmt, "{}", name),
        }
    }
}
