//! Text record payloads (NFC Forum Text record type, "T").
//!
//! Payload layout: a status byte, an IANA language code, then the text.
//! Status bit 7 selects UTF-16, bit 6 is reserved and must be zero, bits
//! 5..0 hold the language code length.

use crate::{NdefError, Result};

const STATUS_UTF16: u8 = 0x80;
const STATUS_RESERVED: u8 = 0x40;
const STATUS_LANG_LEN_MASK: u8 = 0x3f;

/// Character encoding of a text record's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16,
}

/// Decode a "T" record payload into `(lang, text, encoding)`.
///
/// Fails on an empty payload, a set reserved bit, a language length that
/// exceeds the payload, a non-ASCII language code, or text that does not
/// decode in the declared encoding. The factory degrades such records to
/// generic ones.
pub(crate) fn decode(payload: &[u8]) -> Option<(String, String, TextEncoding)> {
    let (&status, rest) = payload.split_first()?;
    if status & STATUS_RESERVED != 0 {
        return None;
    }

    let lang_len = (status & STATUS_LANG_LEN_MASK) as usize;
    if lang_len > rest.len() {
        return None;
    }
    let (lang, text) = rest.split_at(lang_len);
    if !lang.is_ascii() {
        return None;
    }
    let lang = std::str::from_utf8(lang).ok()?.to_owned();

    if status & STATUS_UTF16 != 0 {
        let text = decode_utf16(text)?;
        Some((lang, text, TextEncoding::Utf16))
    } else {
        let text = std::str::from_utf8(text).ok()?.to_owned();
        Some((lang, text, TextEncoding::Utf8))
    }
}

/// UTF-16 with an optional BOM; big-endian when there is none.
fn decode_utf16(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let (little_endian, bytes) = match bytes {
        [0xfe, 0xff, rest @ ..] => (false, rest),
        [0xff, 0xfe, rest @ ..] => (true, rest),
        _ => (false, bytes),
    };
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}

/// Encode `(text, lang, encoding)` as a "T" record payload. UTF-16 text is
/// written big-endian without a BOM.
///
/// # Errors
///
/// Returns [`NdefError::InvalidLanguage`] when the language code is empty,
/// not ASCII, or longer than the status byte can describe.
pub(crate) fn encode(text: &str, lang: &str, encoding: TextEncoding) -> Result<Vec<u8>> {
    if lang.is_empty() || lang.len() > STATUS_LANG_LEN_MASK as usize || !lang.is_ascii() {
        return Err(NdefError::InvalidLanguage);
    }

    let mut payload = Vec::with_capacity(1 + lang.len() + text.len());
    match encoding {
        TextEncoding::Utf8 => {
            payload.push(lang.len() as u8);
            payload.extend_from_slice(lang.as_bytes());
            payload.extend_from_slice(text.as_bytes());
        }
        TextEncoding::Utf16 => {
            payload.push(STATUS_UTF16 | lang.len() as u8);
            payload.extend_from_slice(lang.as_bytes());
            for unit in text.encode_utf16() {
                payload.extend_from_slice(&unit.to_be_bytes());
            }
        }
    }
    Ok(payload)
}
