mod builder;
mod enums;
mod error;
mod header;
mod name;
mod rrdata;
mod structs;

pub use self::builder::{unsupported_response, Additional, Answers, Builder, Nameservers, Questions};
pub use self::enums::{Opcode, QueryClass, QueryType, ResponseCode};
pub use self::error::Error;
pub use self::header::{Header, HEADER_SIZE};
pub use self::name::Name;
pub use self::rrdata::RRData;
pub use self::structs::{Message, Question, ResourceRecord};
