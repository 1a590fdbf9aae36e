//! Polymorphic NDEF records and chain construction.
//!
//! [`parse_message`] turns one NDEF message into a singly linked chain of
//! [`NdefRec`] values in wire order; [`parse_tlv`] does the same for every
//! NDEF-message TLV found in a container stream. Each record owns a copy of
//! exactly its own wire bytes, with the TYPE, ID, and PAYLOAD fields exposed
//! as zero-copy views into that buffer. Records never change once built;
//! chain links are `Arc`s, so dropping the head releases the whole chain.
//!
//! Well-known record payloads ("U" and "T") are decoded eagerly by the
//! factory. A payload that does not conform to its record type degrades the
//! record to a generic one instead of failing the chain.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::parse::RecInfo;
use crate::text::{self, TextEncoding};
use crate::tlv::TlvIter;
use crate::uri;
use crate::{
    HDR_CF, HDR_MB, HDR_ME, HDR_SR, HDR_TNF_MASK, MAX_PAYLOAD_LENGTH, NdefError, Result,
    TLV_NDEF_MESSAGE,
};

/// Type Name Format of a record.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tnf {
    #[default]
    Empty = 0x00,
    WellKnown = 0x01,
    MediaType = 0x02,
    AbsoluteUri = 0x03,
    ExternalType = 0x04,
    Unknown = 0x05,
    Unchanged = 0x06,
}

impl Tnf {
    /// Decode the TNF bits of a record header. Reserved values clamp to
    /// [`Tnf::Unknown`].
    #[must_use]
    pub const fn from_bits(value: u8) -> Self {
        match value {
            0x00 => Self::Empty,
            0x01 => Self::WellKnown,
            0x02 => Self::MediaType,
            0x03 => Self::AbsoluteUri,
            0x04 => Self::ExternalType,
            0x06 => Self::Unchanged,
            _ => Self::Unknown,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Record Type Definition tag of a well-known record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rtd {
    #[default]
    Unknown,
    Uri,
    Text,
    SmartPoster,
    HandoverRequest,
    HandoverSelect,
    HandoverCarrier,
    AlternativeCarrier,
    CollisionResolution,
    Error,
}

impl Rtd {
    /// Map well-known TYPE bytes to their RTD tag.
    #[must_use]
    pub fn from_type_bytes(bytes: &[u8]) -> Self {
        match bytes {
            b"U" => Self::Uri,
            b"T" => Self::Text,
            b"Sp" => Self::SmartPoster,
            b"Hr" => Self::HandoverRequest,
            b"Hs" => Self::HandoverSelect,
            b"Hc" => Self::HandoverCarrier,
            b"ac" => Self::AlternativeCarrier,
            b"cr" => Self::CollisionResolution,
            b"err" => Self::Error,
            _ => Self::Unknown,
        }
    }

    /// The TYPE bytes this RTD is written as, for tags that have a
    /// well-known form.
    #[must_use]
    pub const fn type_bytes(self) -> Option<&'static [u8]> {
        match self {
            Self::Unknown => None,
            Self::Uri => Some(b"U"),
            Self::Text => Some(b"T"),
            Self::SmartPoster => Some(b"Sp"),
            Self::HandoverRequest => Some(b"Hr"),
            Self::HandoverSelect => Some(b"Hs"),
            Self::HandoverCarrier => Some(b"Hc"),
            Self::AlternativeCarrier => Some(b"ac"),
            Self::CollisionResolution => Some(b"cr"),
            Self::Error => Some(b"err"),
        }
    }
}

/// Chain position flags, taken from the MB/ME header bits as observed on
/// the wire. The parser reports them without normalizing.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecFlag {
    First = 0x01,
    Last = 0x02,
}

/// Decoded payload of a recognized well-known record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPayload {
    None,
    Uri {
        uri: String,
    },
    Text {
        lang: String,
        text: String,
        encoding: TextEncoding,
    },
}

/// One NDEF record.
///
/// Immutable after construction. `raw` holds this record's complete wire
/// bytes; `type_bytes`, `id`, and `payload` are views into it.
#[derive(Debug)]
pub struct NdefRec {
    tnf: Tnf,
    rtd: Rtd,
    flags: u8,
    raw: Bytes,
    type_bytes: Bytes,
    id: Bytes,
    payload: Bytes,
    decoded: DecodedPayload,
    next: Option<Arc<NdefRec>>,
}

impl NdefRec {
    /// Build a record from its wire bytes and the parsed header layout,
    /// decoding the payload of recognized well-known types.
    fn from_wire(rec: &[u8], info: &RecInfo, next: Option<Arc<NdefRec>>) -> Self {
        let raw = Bytes::copy_from_slice(rec);
        let hdr = raw[0];

        let tnf = Tnf::from_bits(hdr & HDR_TNF_MASK);
        let mut flags = 0;
        if hdr & HDR_MB != 0 {
            flags |= RecFlag::First as u8;
        }
        if hdr & HDR_ME != 0 {
            flags |= RecFlag::Last as u8;
        }

        let type_bytes = raw.slice(info.type_offset..info.type_offset + info.type_length);
        let id = raw.slice(info.id_offset()..info.id_offset() + info.id_length);
        let payload = raw.slice(info.payload_offset()..info.payload_offset() + info.payload_length);

        let (rtd, decoded) = if tnf == Tnf::WellKnown {
            Self::decode_well_known(&type_bytes, &payload)
        } else {
            (Rtd::Unknown, DecodedPayload::None)
        };

        Self {
            tnf,
            rtd,
            flags,
            raw,
            type_bytes,
            id,
            payload,
            decoded,
            next,
        }
    }

    fn decode_well_known(type_bytes: &[u8], payload: &[u8]) -> (Rtd, DecodedPayload) {
        match Rtd::from_type_bytes(type_bytes) {
            Rtd::Uri => match uri::decode(payload) {
                Some(uri) => {
                    debug!(%uri, "URI record");
                    (Rtd::Uri, DecodedPayload::Uri { uri })
                }
                None => (Rtd::Unknown, DecodedPayload::None),
            },
            Rtd::Text => match text::decode(payload) {
                Some((lang, text, encoding)) => {
                    debug!(%lang, "text record");
                    (Rtd::Text, DecodedPayload::Text {
                        lang,
                        text,
                        encoding,
                    })
                }
                None => (Rtd::Unknown, DecodedPayload::None),
            },
            rtd => (rtd, DecodedPayload::None),
        }
    }

    /// The empty record produced for a zero-length NDEF message.
    fn empty(next: Option<Arc<NdefRec>>) -> Self {
        Self {
            tnf: Tnf::Empty,
            rtd: Rtd::Unknown,
            flags: 0,
            raw: Bytes::new(),
            type_bytes: Bytes::new(),
            id: Bytes::new(),
            payload: Bytes::new(),
            decoded: DecodedPayload::None,
            next,
        }
    }

    /// Build a single-record well-known message carrying `uri`, compressed
    /// with the longest matching abbreviation from the URI prefix table.
    ///
    /// # Errors
    ///
    /// Returns [`NdefError::PayloadTooLarge`] for a URI the wire format
    /// cannot carry.
    pub fn new_uri(uri: &str) -> Result<Arc<Self>> {
        build_well_known(Rtd::Uri, b"U", &uri::encode(uri))
    }

    /// Build a single-record well-known message carrying `text` in the
    /// given language and encoding.
    ///
    /// # Errors
    ///
    /// Returns [`NdefError::InvalidLanguage`] when `lang` is empty, not
    /// ASCII, or longer than 63 bytes, and [`NdefError::PayloadTooLarge`]
    /// for text the wire format cannot carry.
    pub fn new_text(text: &str, lang: &str, encoding: TextEncoding) -> Result<Arc<Self>> {
        build_well_known(Rtd::Text, b"T", &text::encode(text, lang, encoding)?)
    }

    #[inline]
    #[must_use]
    pub const fn tnf(&self) -> Tnf {
        self.tnf
    }

    #[inline]
    #[must_use]
    pub const fn rtd(&self) -> Rtd {
        self.rtd
    }

    /// Raw flag bits; see [`RecFlag`].
    #[inline]
    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    #[inline]
    #[must_use]
    pub const fn has_flag(&self, flag: RecFlag) -> bool {
        self.flags & flag as u8 != 0
    }

    /// Whether the record carried the Message Begin bit.
    #[inline]
    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.has_flag(RecFlag::First)
    }

    /// Whether the record carried the Message End bit.
    #[inline]
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.has_flag(RecFlag::Last)
    }

    /// This record's complete wire bytes.
    #[inline]
    #[must_use]
    pub const fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// The TYPE field.
    #[inline]
    #[must_use]
    pub const fn type_bytes(&self) -> &Bytes {
        &self.type_bytes
    }

    /// The ID field (empty when the record carried no IL bit).
    #[inline]
    #[must_use]
    pub const fn id(&self) -> &Bytes {
        &self.id
    }

    /// The PAYLOAD field.
    #[inline]
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The decoded variant payload, when the record was recognized.
    #[inline]
    #[must_use]
    pub const fn decoded(&self) -> &DecodedPayload {
        &self.decoded
    }

    /// The decoded URI of a URI record.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match &self.decoded {
            DecodedPayload::Uri { uri } => Some(uri),
            _ => None,
        }
    }

    /// The language code of a text record.
    #[must_use]
    pub fn lang(&self) -> Option<&str> {
        match &self.decoded {
            DecodedPayload::Text { lang, .. } => Some(lang),
            _ => None,
        }
    }

    /// The decoded content of a text record.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.decoded {
            DecodedPayload::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The content encoding of a text record.
    #[must_use]
    pub fn encoding(&self) -> Option<TextEncoding> {
        match &self.decoded {
            DecodedPayload::Text { encoding, .. } => Some(*encoding),
            _ => None,
        }
    }

    /// The next record of the chain.
    #[inline]
    #[must_use]
    pub const fn next(&self) -> Option<&Arc<NdefRec>> {
        self.next.as_ref()
    }

    /// Iterate this record and its successors in wire order.
    #[must_use]
    pub const fn iter(&self) -> ChainIter<'_> {
        ChainIter { next: Some(self) }
    }
}

impl<'a> IntoIterator for &'a NdefRec {
    type Item = &'a NdefRec;
    type IntoIter = ChainIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a record chain.
pub struct ChainIter<'a> {
    next: Option<&'a NdefRec>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a NdefRec;

    fn next(&mut self) -> Option<Self::Item> {
        let rec = self.next?;
        self.next = rec.next.as_deref();
        Some(rec)
    }
}

/// A record scanned out of a message but not yet linked. Chains are linked
/// back to front so every record is complete before it is shared.
enum Pending<'a> {
    Wire(&'a [u8], RecInfo),
    Empty,
}

fn scan_message<'a>(block: &'a [u8], out: &mut Vec<Pending<'a>>) {
    if block.is_empty() {
        debug!("empty NDEF message");
        out.push(Pending::Empty);
        return;
    }

    let mut rest = block;
    while !rest.is_empty() {
        let info = match RecInfo::parse(rest) {
            Ok(info) => info,
            Err(err) => {
                debug!(%err, "discarding trailing bytes");
                break;
            }
        };
        let (rec, tail) = rest.split_at(info.total_len);
        rest = tail;

        if rec[0] & HDR_CF != 0 {
            warn!("chunked records are not supported");
        } else {
            out.push(Pending::Wire(rec, info));
        }
    }
}

fn link_chain(pending: Vec<Pending<'_>>) -> Option<Arc<NdefRec>> {
    let mut head = None;
    for item in pending.into_iter().rev() {
        let rec = match item {
            Pending::Wire(rec, info) => NdefRec::from_wire(rec, &info, head),
            Pending::Empty => NdefRec::empty(head),
        };
        head = Some(Arc::new(rec));
    }
    head
}

/// Parse one NDEF message into a chain of records.
///
/// A zero-length message yields a single empty record. Records with the
/// chunk flag are dropped and parsing continues after them; the first
/// malformed record ends the walk, returning whatever parsed before it.
/// `None` means not a single record could be extracted.
#[must_use]
pub fn parse_message(block: &[u8]) -> Option<Arc<NdefRec>> {
    let mut pending = Vec::new();
    scan_message(block, &mut pending);
    link_chain(pending)
}

/// Parse every NDEF message TLV of a container stream, concatenating the
/// resulting chains in TLV order.
#[must_use]
pub fn parse_tlv(tlv: &[u8]) -> Option<Arc<NdefRec>> {
    let mut pending = Vec::new();
    for block in TlvIter::new(tlv) {
        if block.tag == TLV_NDEF_MESSAGE {
            scan_message(block.value, &mut pending);
        }
    }
    link_chain(pending)
}

/// Synthesize a single-record well-known message from TYPE and PAYLOAD
/// bytes. The record carries both chain flags and uses the short form
/// whenever the payload fits it; the bytes then go through the normal
/// parse path so the record's views point into its own buffer.
///
/// `rtd` tags the result and should correspond to `rec_type` for parse
/// round trips to be exact.
///
/// # Errors
///
/// Returns [`NdefError::TypeTooLong`] or [`NdefError::PayloadTooLarge`]
/// when a field does not fit its wire-format length field.
pub fn build_well_known(rtd: Rtd, rec_type: &[u8], payload: &[u8]) -> Result<Arc<NdefRec>> {
    if rec_type.len() > 0xff {
        return Err(NdefError::TypeTooLong(rec_type.len()));
    }
    if payload.len() as u64 > u64::from(MAX_PAYLOAD_LENGTH) {
        return Err(NdefError::PayloadTooLarge(payload.len() as u64));
    }

    let mut hdr = HDR_MB | HDR_ME | Tnf::WellKnown.as_u8();
    let short = payload.len() <= 0xff;
    if short {
        hdr |= HDR_SR;
    }

    let mut buf = Vec::with_capacity(6 + rec_type.len() + payload.len());
    buf.push(hdr);
    buf.push(rec_type.len() as u8);
    if short {
        buf.push(payload.len() as u8);
    } else {
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    }
    let type_offset = buf.len();
    buf.extend_from_slice(rec_type);
    buf.extend_from_slice(payload);

    let info = RecInfo {
        total_len: buf.len(),
        type_offset,
        type_length: rec_type.len(),
        id_length: 0,
        payload_length: payload.len(),
    };
    let mut rec = NdefRec::from_wire(&buf, &info, None);
    rec.rtd = rtd;
    Ok(Arc::new(rec))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tnf_from_bits_clamps_reserved() {
        assert_eq!(Tnf::from_bits(0x00), Tnf::Empty);
        assert_eq!(Tnf::from_bits(0x01), Tnf::WellKnown);
        assert_eq!(Tnf::from_bits(0x06), Tnf::Unchanged);
        assert_eq!(Tnf::from_bits(0x07), Tnf::Unknown);
    }

    #[test]
    fn test_rtd_dispatch_table() {
        assert_eq!(Rtd::from_type_bytes(b"U"), Rtd::Uri);
        assert_eq!(Rtd::from_type_bytes(b"T"), Rtd::Text);
        assert_eq!(Rtd::from_type_bytes(b"Sp"), Rtd::SmartPoster);
        assert_eq!(Rtd::from_type_bytes(b"Hr"), Rtd::HandoverRequest);
        assert_eq!(Rtd::from_type_bytes(b"Hs"), Rtd::HandoverSelect);
        assert_eq!(Rtd::from_type_bytes(b"Hc"), Rtd::HandoverCarrier);
        assert_eq!(Rtd::from_type_bytes(b"ac"), Rtd::AlternativeCarrier);
        assert_eq!(Rtd::from_type_bytes(b"cr"), Rtd::CollisionResolution);
        assert_eq!(Rtd::from_type_bytes(b"err"), Rtd::Error);
        assert_eq!(Rtd::from_type_bytes(b"x"), Rtd::Unknown);
        assert_eq!(Rtd::from_type_bytes(b""), Rtd::Unknown);
    }

    #[test]
    fn test_rtd_type_bytes_inverse() {
        for rtd in [
            Rtd::Uri,
            Rtd::Text,
            Rtd::SmartPoster,
            Rtd::HandoverRequest,
            Rtd::HandoverSelect,
            Rtd::HandoverCarrier,
            Rtd::AlternativeCarrier,
            Rtd::CollisionResolution,
            Rtd::Error,
        ] {
            assert_eq!(Rtd::from_type_bytes(rtd.type_bytes().unwrap()), rtd);
        }
        assert_eq!(Rtd::Unknown.type_bytes(), None);
    }

    #[test]
    fn test_well_known_tag_only_types() {
        let rec = parse_message(&[0xd1, 0x02, 0x00, b'S', b'p']).unwrap();
        assert_eq!(rec.rtd(), Rtd::SmartPoster);
        assert_eq!(rec.decoded(), &DecodedPayload::None);
    }

    #[test]
    fn test_id_field_views() {
        // MB|ME|SR|IL, TNF=1, type "T", id "ab", text payload
        let block = [
            0xd9, 0x01, 0x04, 0x02, b'T', b'a', b'b', 0x02, b'e', b'n', b'H',
        ];
        let rec = parse_message(&block).unwrap();
        assert_eq!(rec.id().as_ref(), b"ab");
        assert_eq!(rec.type_bytes().as_ref(), b"T");
        assert_eq!(rec.payload().as_ref(), &[0x02, b'e', b'n', b'H']);
        assert_eq!(rec.text(), Some("H"));
    }

    #[test]
    fn test_bad_uri_payload_degrades_to_generic() {
        // Type "U" with an empty payload is not a valid URI record.
        let rec = parse_message(&[0xd1, 0x01, 0x00, b'U']).unwrap();
        assert_eq!(rec.tnf(), Tnf::WellKnown);
        assert_eq!(rec.rtd(), Rtd::Unknown);
        assert_eq!(rec.decoded(), &DecodedPayload::None);
    }

    #[test]
    fn test_bad_text_payload_degrades_to_generic() {
        // Reserved status bit set.
        let rec = parse_message(&[0xd1, 0x01, 0x01, b'T', 0x40]).unwrap();
        assert_eq!(rec.rtd(), Rtd::Unknown);
        assert_eq!(rec.text(), None);
    }

    #[test]
    fn test_zero_type_length_well_known() {
        // Accepted by the parser; nothing to dispatch on.
        let rec = parse_message(&[0xd1, 0x00, 0x00]).unwrap();
        assert_eq!(rec.tnf(), Tnf::WellKnown);
        assert_eq!(rec.rtd(), Rtd::Unknown);
        assert!(rec.type_bytes().is_empty());
    }

    #[test]
    fn test_non_well_known_tnf_skips_dispatch() {
        // TNF=4 (external) with type bytes "U" must not decode as a URI.
        let rec = parse_message(&[0xd4, 0x01, 0x02, b'U', 0x01, b'x']).unwrap();
        assert_eq!(rec.tnf(), Tnf::ExternalType);
        assert_eq!(rec.rtd(), Rtd::Unknown);
        assert_eq!(rec.uri(), None);
    }

    #[test]
    fn test_flags_reported_as_observed() {
        // Neither MB nor ME set; the parser does not repair.
        let rec = parse_message(&[0x11, 0x01, 0x00, b'x']).unwrap();
        assert_eq!(rec.flags(), 0);
        assert!(!rec.is_first());
        assert!(!rec.is_last());
    }

    #[test]
    fn test_new_uri_compresses_prefix() {
        let rec = NdefRec::new_uri("http://www.nfc.com").unwrap();
        assert_eq!(rec.tnf(), Tnf::WellKnown);
        assert_eq!(rec.rtd(), Rtd::Uri);
        assert_eq!(rec.uri(), Some("http://www.nfc.com"));
        assert_eq!(rec.payload().as_ref(), &[&[0x01][..], b"nfc.com"].concat());
    }

    #[test]
    fn test_new_text() {
        let rec = NdefRec::new_text("Hello", "en", TextEncoding::Utf8).unwrap();
        assert_eq!(rec.rtd(), Rtd::Text);
        assert_eq!(rec.lang(), Some("en"));
        assert_eq!(rec.text(), Some("Hello"));
        assert_eq!(rec.encoding(), Some(TextEncoding::Utf8));
        assert!(rec.is_first() && rec.is_last());
    }

    #[test]
    fn test_new_text_rejects_bad_language() {
        assert_eq!(
            NdefRec::new_text("x", "", TextEncoding::Utf8).unwrap_err(),
            NdefError::InvalidLanguage
        );
    }

    #[test]
    fn test_build_long_form() {
        let payload = vec![0xab; 0x100];
        let rec = build_well_known(Rtd::Unknown, b"x", &payload).unwrap();
        assert_eq!(rec.raw().len(), 1 + 1 + 4 + 1 + 0x100);
        assert_eq!(rec.raw()[0], HDR_MB | HDR_ME | 0x01);
        assert_eq!(&rec.raw()[2..6], &[0x00, 0x00, 0x01, 0x00]);
        assert_eq!(rec.payload().len(), 0x100);
    }

    #[test]
    fn test_build_rejects_oversized_type() {
        let long_type = vec![b'a'; 0x100];
        assert_eq!(
            build_well_known(Rtd::Unknown, &long_type, b"").unwrap_err(),
            NdefError::TypeTooLong(0x100)
        );
    }

    #[test]
    fn test_chain_iter() {
        let first = NdefRec::new_uri("tel:123").unwrap();
        let second = NdefRec::new_text("x", "en", TextEncoding::Utf8).unwrap();
        let mut bytes = first.raw().to_vec();
        bytes.extend_from_slice(second.raw());
        // The two single-record messages concatenate into a mis-flagged
        // two-record chain; flags are still reported as observed.
        let head = parse_message(&bytes).unwrap();
        let recs: Vec<_> = head.iter().collect();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].rtd(), Rtd::Uri);
        assert_eq!(recs[1].rtd(), Rtd::Text);
        assert!(recs[0].is_first() && recs[0].is_last());
    }
}
