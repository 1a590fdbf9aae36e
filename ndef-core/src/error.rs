use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NdefError {
    #[error("block of {0} bytes is too short to be an NDEF record")]
    BlockTooShort(usize),

    #[error("truncated record: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("payload length {0} exceeds the supported maximum")]
    PayloadTooLarge(u64),

    #[error("record type of {0} bytes does not fit the TYPE_LENGTH field")]
    TypeTooLong(usize),

    #[error("language code must be non-empty ASCII of at most 63 bytes")]
    InvalidLanguage,
}

pub type Result<T> = std::result::Result<T, NdefError>;
