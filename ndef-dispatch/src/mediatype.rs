//! Media-type record recognition.
//!
//! Handlers are dispatched on the TYPE field of media-type records. Only a
//! concrete, well-formed media type participates: printable ASCII with
//! exactly one `/` separating a non-empty type and subtype. Patterns with
//! wildcards belong in handler configuration, never in a record, so `*` is
//! rejected outright.

use ndef_core::{NdefRec, Tnf};

/// Check that `bytes` form a concrete media type.
#[must_use]
pub fn valid_media_type(bytes: &[u8]) -> bool {
    let mut slash = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'/' => {
                if slash.is_some() {
                    return false;
                }
                slash = Some(i);
            }
            b'*' => return false,
            0x21..=0x7e => {}
            _ => return false,
        }
    }
    match slash {
        Some(i) => i > 0 && i + 1 < bytes.len(),
        None => false,
    }
}

/// The validated media type of `rec`, when it is a media-type record with a
/// well-formed TYPE field.
#[must_use]
pub fn media_type(rec: &NdefRec) -> Option<&str> {
    if rec.tnf() != Tnf::MediaType {
        return None;
    }
    let bytes = rec.type_bytes();
    if !valid_media_type(bytes) {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}
