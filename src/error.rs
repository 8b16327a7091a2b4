use std::io;

use thiserror::Error;

/// Structural failure while decoding a record header.
///
/// Malformed field data is never reported here: the field iterator yields a
/// placeholder instead so the rest of the record stays readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record too short: {len} bytes, header needs {}", crate::codec::HEADER_SIZE)]
    TooShort { len: usize },

    #[error("bad magic header: {found:#010x}")]
    BadMagic { found: u32 },

    #[error("unsupported wire format version {0}")]
    UnsupportedVersion(u8),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level: {0:?}")]
    InvalidLevel(String),

    #[error("invalid color mode: {0:?}")]
    InvalidColorMode(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// Ring sizes must be a power of two of at least 2; mapped regions must
    /// not be empty.
    #[error("invalid capacity: {0}")]
    InvalidCapacity(usize),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a global logger is already installed")]
    SetLogger(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, Error>;
