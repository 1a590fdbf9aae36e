//! URI record payloads (NFC Forum URI record type, "U").
//!
//! The payload is one prefix-code byte followed by the UTF-8 remainder of
//! the URI. Codes 0x00..=0x23 select an abbreviation from a fixed table;
//! any other code contributes no prefix.

/// Prefix abbreviation table, indexed by the payload's first byte.
static URI_PREFIXES: [&str; 0x24] = [
    "",
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

/// Decode a "U" record payload into the full URI.
///
/// Fails on an empty payload or a suffix that is not valid UTF-8; the
/// factory degrades such records to generic ones.
pub(crate) fn decode(payload: &[u8]) -> Option<String> {
    let (&code, suffix) = payload.split_first()?;
    let suffix = std::str::from_utf8(suffix).ok()?;
    let prefix = URI_PREFIXES.get(code as usize).copied().unwrap_or("");

    let mut uri = String::with_capacity(prefix.len() + suffix.len());
    uri.push_str(prefix);
    uri.push_str(suffix);
    Some(uri)
}

/// Encode a URI as a "U" record payload, compressing it with the longest
/// matching prefix (code 0 when nothing matches).
pub(crate) fn encode(uri: &str) -> Vec<u8> {
    let (code, suffix) = URI_PREFIXES
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, prefix)| uri.starts_with(**prefix))
        .max_by_key(|(_, prefix)| prefix.len())
        .map_or((0, uri), |(code, prefix)| (code, &uri[prefix.len()..]));

    let mut payload = Vec::with_capacity(1 + suffix.len());
    payload.push(code as u8);
    payload.extend_from_slice(suffix.as_bytes());
    payload
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_prefix() {
        let payload = [&[0x01][..], b"nfc.com"].concat();
        assert_eq!(decode(&payload).unwrap(), "http://www.nfc.com");
    }

    #[test]
    fn test_decode_no_prefix() {
        let payload = [&[0x00][..], b"geo:1,2"].concat();
        assert_eq!(decode(&payload).unwrap(), "geo:1,2");
    }

    #[test]
    fn test_decode_out_of_table_code() {
        let payload = [&[0x7f][..], b"rest"].concat();
        assert_eq!(decode(&payload).unwrap(), "rest");
    }

    #[test]
    fn test_decode_empty_payload_fails() {
        assert_eq!(decode(&[]), None);
    }

    #[test]
    fn test_decode_invalid_utf8_fails() {
        assert_eq!(decode(&[0x01, 0xff, 0xfe]), None);
    }

    #[test]
    fn test_encode_picks_longest_prefix() {
        // "https://www." (0x02) must win over "https://" (0x04).
        let payload = encode("https://www.example.org");
        assert_eq!(payload[0], 0x02);
        assert_eq!(&payload[1..], b"example.org");
    }

    #[test]
    fn test_encode_unknown_scheme() {
        let payload = encode("geo:59.4,24.7");
        assert_eq!(payload[0], 0x00);
        assert_eq!(&payload[1..], b"geo:59.4,24.7");
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for uri in ["tel:+372123456", "mailto:a@b.c", "urn:nfc:sn:handover"] {
            assert_eq!(decode(&encode(uri)).unwrap(), uri);
        }
    }
}
