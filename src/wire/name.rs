use std::fmt;
use std::io;
use std::str::from_utf8;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::Error;

/// Upper bound on compression pointers followed while reading one name.
/// Crafted messages can chain pointers into a loop; the naive reader never
/// terminates on those.
const POINTER_HOP_LIMIT: usize = 64;

/// A domain name as an ordered sequence of labels
///
/// Labels are owned ASCII strings, decompressed at parse time; the encoded
/// form is always the plain length-prefixed label sequence with a zero
/// terminator, never a compression pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    labels: Vec<String>,
}

impl Name {
    /// Builds a name from its dotted textual form.
    pub fn from_str(name: &str) -> Result<Name, Error> {
        let mut labels = Vec::new();
        for part in name.split('.') {
            if part.is_empty() || part.len() > 63 {
                return Err(Error::BadLabel);
            }
            if !part.is_ascii() {
                return Err(Error::LabelIsNotAscii);
            }
            labels.push(part.to_owned());
        }
        Ok(Name { labels })
    }

    /// Reads a (possibly compressed) name out of `data` starting at `pos`.
    ///
    /// Returns the name together with the position the caller resumes
    /// reading from. Only the first compression pointer moves that outer
    /// position, by the two bytes of the pointer itself; later hops during
    /// decompression are internal to the name.
    pub fn scan(data: &[u8], pos: usize) -> Result<(Name, usize), Error> {
        let mut labels = Vec::new();
        let mut cursor = pos;
        let mut resume = None;
        let mut hops = 0;
        loop {
            if data.len() <= cursor {
                return Err(Error::UnexpectedEof);
            }
            let byte = data[cursor];
            if byte == 0 {
                return Ok((Name { labels }, resume.unwrap_or(cursor + 1)));
            } else if byte & 0b1100_0000 == 0b1100_0000 {
                if data.len() < cursor + 2 {
                    return Err(Error::UnexpectedEof);
                }
                let off = (BigEndian::read_u16(&data[cursor..cursor + 2])
                    & !0b1100_0000_0000_0000) as usize;
                if off >= data.len() {
                    return Err(Error::PointerOutOfBounds(off));
                }
                hops += 1;
                if hops > POINTER_HOP_LIMIT {
                    return Err(Error::PointerChainTooLong);
                }
                if resume.is_none() {
                    resume = Some(cursor + 2);
                }
                cursor = off;
            } else if byte & 0b1100_0000 == 0 {
                let end = cursor + 1 + byte as usize;
                if data.len() < end {
                    return Err(Error::UnexpectedEof);
                }
                let label =
                    from_utf8(&data[cursor + 1..end]).map_err(|_| Error::LabelIsNotAscii)?;
                if !label.is_ascii() {
                    return Err(Error::LabelIsNotAscii);
                }
                labels.push(label.to_owned());
                cursor = end;
            } else {
                return Err(Error::UnknownLabelFormat);
            }
        }
    }

    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        for label in &self.labels {
            writer.write_u8(label.len() as u8)?;
            writer.write_all(label.as_bytes())?;
        }
        writer.write_u8(0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for (i, label) in self.labels.iter().enumerate() {
            if i != 0 {
                fmt.write_str(".")?;
            }
            fmt.write_str(label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Error, Name};

    #[test]
    fn scan_plain_name() {
        let data = b"\x07example\x03com\x00";
        let (name, next) = Name::scan(data, 0).unwrap();
        assert_eq!(name.to_string(), "example.com");
        assert_eq!(next, data.len());
    }

    #[test]
    fn round_trip_is_semantic() {
        for text in ["example.com", "a.b.c.d", "xn--bcher-kva.example"] {
            let name = Name::from_str(text).unwrap();
            let mut buf = Vec::new();
            name.write_to(&mut buf).unwrap();
            let (reread, _) = Name::scan(&buf, 0).unwrap();
            assert_eq!(reread, name);
            assert_eq!(reread.to_string(), text);
        }
    }

    #[test]
    fn pointer_resumes_after_first_jump_only() {
        // "ns1" + pointer to "example.com" at offset 6
        let mut data = Vec::new();
        data.extend(b"\xde\xad\xbe\xef\xca\xfe");
        data.extend(b"\x07example\x03com\x00");
        let start = data.len();
        data.extend(b"\x03ns1\xc0\x06");
        data.extend(b"\xff\xff"); // trailing bytes the cursor must land before
        let (name, next) = Name::scan(&data, start).unwrap();
        assert_eq!(name.to_string(), "ns1.example.com");
        assert_eq!(next, start + 4 + 2);
    }

    #[test]
    fn pointer_past_end_is_rejected() {
        let data = b"\xc0\x63";
        assert_eq!(Name::scan(data, 0), Err(Error::PointerOutOfBounds(0x63)));
    }

    #[test]
    fn pointer_loop_is_rejected() {
        // Offset 0 points at offset 2 and vice versa.
        let data = b"\xc0\x02\xc0\x00";
        assert_eq!(Name::scan(data, 0), Err(Error::PointerChainTooLong));
    }

    #[test]
    fn self_pointer_is_rejected() {
        let data = b"\xc0\x00";
        assert_eq!(Name::scan(data, 0), Err(Error::PointerChainTooLong));
    }

    #[test]
    fn truncated_label_is_rejected() {
        let data = b"\x07exam";
        assert_eq!(Name::scan(data, 0), Err(Error::UnexpectedEof));
    }

    #[test]
    fn missing_terminator_is_rejected() {
        let data = b"\x03com";
        assert_eq!(Name::scan(data, 0), Err(Error::UnexpectedEof));
    }

    #[test]
    fn from_str_rejects_empty_label() {
        assert_eq!(Name::from_str("example..com"), Err(Error::BadLabel));
        assert_eq!(Name::from_str(""), Err(Error::BadLabel));
    }

    #[test]
    fn from_str_rejects_oversized_label() {
        let label = "a".repeat(64);
        assert_eq!(Name::from_str(&label), Err(Error::BadLabel));
    }
}
