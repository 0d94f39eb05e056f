use std::{fmt, io};

/// Errors produced by packet decoding and service validation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// The end of the message was reached while more data was expected.
    Eof,
    /// A domain name pointer pointed at itself or forwards into the message.
    PointerLoop,
    /// A field was set to an invalid (reserved for future use or illegal) value.
    InvalidValue,
    /// An empty label was encountered where it is not allowed.
    InvalidEmptyLabel,
    /// A label exceeded the maximum allowable length of a label.
    LabelTooLong,
    /// A required service field was not supplied.
    MissingField(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Eof => f.write_str("unexpected end of data"),
            Error::PointerLoop => f.write_str("encountered domain name pointer loop"),
            Error::InvalidValue => f.write_str("invalid value"),
            Error::InvalidEmptyLabel => f.write_str("invalid empty label"),
            Error::LabelTooLong => f.write_str("label too long"),
            Error::MissingField(field) => write!(f, "missing required service field `{field}`"),
        }
    }
}

impl std::error::Error for Error {}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Eof => io::ErrorKind::UnexpectedEof.into(),
            Error::PointerLoop => io::Error::new(
                io::ErrorKind::InvalidData,
                "a domain name pointer loop was encountered; this may indicate a malicious packet",
            ),
            Error::InvalidValue => io::ErrorKind::InvalidData.into(),
            Error::InvalidEmptyLabel => io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid empty label in domain name",
            ),
            Error::LabelTooLong => io::Error::new(
                io::ErrorKind::InvalidInput,
                "domain name label exceeds maximum label length",
            ),
            Error::MissingField(_) => io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
        }
    }
}
