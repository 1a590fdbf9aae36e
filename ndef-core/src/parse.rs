//! NDEF record wire layout.
//!
//! Each record starts with a one-byte header whose bits select which of the
//! remaining header fields are present:
//!
//! ```text
//! +--------+-------------+----------------+-----------+------+------+---------+
//! | Header | TYPE_LENGTH | PAYLOAD_LENGTH | ID_LENGTH | TYPE | ID   | PAYLOAD |
//! | 1 byte | 1 byte      | 1 or 4 bytes   | 0 or 1 B  | var  | var  | var     |
//! +--------+-------------+----------------+-----------+------+------+---------+
//! ```
//!
//! SR selects the one-byte PAYLOAD_LENGTH form (four bytes big-endian
//! otherwise); IL controls whether ID_LENGTH and ID are present. The parser
//! never reads past the input: every length field is bounds-checked before
//! it is consumed, so hostile frames fail cleanly instead of over-reading.

use tracing::debug;

use crate::{HDR_IL, HDR_SR, MAX_PAYLOAD_LENGTH, NDEF_REC_MIN_SIZE, NdefError, Result};

/// Offsets and lengths of one record within an unparsed block.
///
/// Produced by [`RecInfo::parse`]; consumed by the record factory, which
/// slices the TYPE, ID, and PAYLOAD fields out of the record bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecInfo {
    /// Total record size in bytes, header included.
    pub total_len: usize,
    /// Offset of the TYPE field from the start of the record.
    pub type_offset: usize,
    pub type_length: usize,
    pub id_length: usize,
    pub payload_length: usize,
}

impl RecInfo {
    /// Offset of the ID field (zero-length when IL was not set).
    #[inline]
    #[must_use]
    pub const fn id_offset(&self) -> usize {
        self.type_offset + self.type_length
    }

    /// Offset of the PAYLOAD field.
    #[inline]
    #[must_use]
    pub const fn payload_offset(&self) -> usize {
        self.id_offset() + self.id_length
    }

    /// Parse one record header at the start of `block`.
    ///
    /// On success the descriptor covers `block[..total_len]`; the caller
    /// advances its cursor by `total_len` and continues with the next
    /// record.
    ///
    /// # Errors
    ///
    /// Returns an error when the block is shorter than a minimal record,
    /// when a length field would require bytes the block does not have, or
    /// when PAYLOAD_LENGTH exceeds [`MAX_PAYLOAD_LENGTH`].
    pub fn parse(block: &[u8]) -> Result<Self> {
        if block.len() < NDEF_REC_MIN_SIZE {
            debug!(len = block.len(), "block too short to be an NDEF record");
            return Err(NdefError::BlockTooShort(block.len()));
        }

        let hdr = block[0];
        let type_length = block[1] as usize;
        let mut type_offset = 2;
        let mut total = 2 + type_length as u64;

        let payload_length = if hdr & HDR_SR != 0 {
            let len = u64::from(block[type_offset]);
            type_offset += 1;
            total += 1 + len;
            len
        } else {
            if block.len() < type_offset + 4 {
                debug!("long record form truncated inside PAYLOAD_LENGTH");
                return Err(NdefError::Truncated {
                    needed: type_offset + 4,
                    available: block.len(),
                });
            }
            let len = u64::from(u32::from_be_bytes([
                block[type_offset],
                block[type_offset + 1],
                block[type_offset + 2],
                block[type_offset + 3],
            ]));
            type_offset += 4;
            total += 4 + len;
            len
        };

        let id_length = if hdr & HDR_IL != 0 {
            if block.len() < type_offset + 1 {
                debug!("record truncated inside ID_LENGTH");
                return Err(NdefError::Truncated {
                    needed: type_offset + 1,
                    available: block.len(),
                });
            }
            let len = u64::from(block[type_offset]);
            type_offset += 1;
            total += 1 + len;
            len
        } else {
            0
        };

        if payload_length > u64::from(MAX_PAYLOAD_LENGTH) {
            debug!(payload_length, "payload length is not sane");
            return Err(NdefError::PayloadTooLarge(payload_length));
        }
        if total > block.len() as u64 {
            debug!(total, available = block.len(), "lengths don't add up");
            return Err(NdefError::Truncated {
                needed: total as usize,
                available: block.len(),
            });
        }

        Ok(Self {
            total_len: total as usize,
            type_offset,
            type_length,
            id_length: id_length as usize,
            payload_length: payload_length as usize,
        })
    }
}
