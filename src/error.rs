// Error types shared by every codec

use thiserror::Error;

/// Errors produced while parsing, mutating or committing tags.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected end of data: needed {needed} more bytes")]
    Truncated { needed: usize },
    #[error("invalid {format} data: {reason}")]
    InvalidFormat { format: &'static str, reason: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("{what} of {size} bytes exceeds the format limit of {limit} bytes")]
    TooLarge {
        what: &'static str,
        size: u64,
        limit: u64,
    },
}

/// Caller-supplied values rejected before any mutation happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("MIME type {0:?} is not a supported image type")]
    MimeType(String),
    #[error("picture description is {0} bytes, the limit is 64")]
    DescriptionTooLong(usize),
    #[error("picture type {0:#04x} is out of range")]
    PictureType(u32),
    #[error("padding of {0} bytes is outside the allowed range")]
    Padding(u32),
    #[error("field {0} does not hold text")]
    NotText(&'static str),
    #[error("the {0} block is mandatory and cannot be removed")]
    MandatoryBlock(&'static str),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(format: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidFormat {
            format,
            reason: reason.into(),
        }
    }

    /// True for errors that mean "this is not (valid) data of that format",
    /// as opposed to I/O failures.
    pub fn is_format_error(&self) -> bool {
        match self {
            Error::Truncated { .. } | Error::InvalidFormat { .. } | Error::Unsupported(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}
