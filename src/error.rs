use crate::tlv::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("{what} too long: {actual} exceeds {max}")]
    Length {
        what: &'static str,
        actual: usize,
        max: usize,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("table is full ({capacity} entries)")]
    TableFull { capacity: usize },
}

pub type Result<T> = core::result::Result<T, Error>;
