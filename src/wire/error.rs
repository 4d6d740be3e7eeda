use thiserror::Error;

/// Error decoding or encoding a DNS message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("message is smaller than the fixed header")]
    HeaderTooShort,
    #[error("message has incomplete data")]
    UnexpectedEof,
    #[error("wrong (too short or too long) size of RDATA")]
    WrongRdataLength,
    #[error("label in domain name has unknown label format")]
    UnknownLabelFormat,
    #[error("label must be between 1 and 63 bytes")]
    BadLabel,
    #[error("invalid characters encountered while reading label")]
    LabelIsNotAscii,
    #[error("compression pointer to offset {0} lies outside the message")]
    PointerOutOfBounds(usize),
    #[error("compression pointer chain is too long")]
    PointerChainTooLong,
    #[error("record type {0} is not supported")]
    UnsupportedRecordType(u16),
    #[error("record class {0} is not supported")]
    UnsupportedClass(u16),
}
