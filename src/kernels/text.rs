//! This module contains the pure, stateless kernels for text transcoding and
//! the hex-string fallback encoding.
//!
//! Double-byte text columns arrive as UTF-16LE and must leave as UTF-8. The
//! transcoder works at the code-unit level rather than through `char` so a
//! stray unpaired surrogate degrades to a 3-byte sequence instead of
//! aborting the batch.

/// Hard cap on the byte length of any length-prefixed text payload; the wire
/// length prefix is an unsigned 16-bit integer.
pub const MAX_TEXT_BYTES: usize = u16::MAX as usize;

/// Hex-encoded fallback payloads are capped below the text limit so the
/// encoded length stays an even number of hex digits.
///
/// Earlier versions declared a 32 767-byte cap, but with two digits per
/// source byte the odd last slot could never be filled and the advertised
/// length overstated the payload by one. Rounding the cap down to 32 766
/// makes the length prefix exact.
pub const MAX_HEX_BYTES: usize = 32_766;

//==================================================================================
// 1. UTF-16LE -> UTF-8
//==================================================================================

/// Transcodes UTF-16LE bytes to UTF-8, appending to `out`, and returns the
/// number of UTF-8 bytes produced.
///
/// Surrogate pairs (lead 0xD800-0xDBFF followed by a trail unit) are
/// combined into a single code point >= 0x10000 and re-encoded as 4 bytes.
/// A trailing odd byte is dropped; an unpaired surrogate is encoded as its
/// own 3-byte sequence rather than rejected.
pub fn utf16le_to_utf8(raw: &[u8], out: &mut Vec<u8>) -> usize {
    let start = out.len();
    let mut i = 0;
    while i + 1 < raw.len() {
        let w1 = u16::from_le_bytes([raw[i], raw[i + 1]]) as u32;
        i += 2;
        let cp = if (0xD800..=0xDBFF).contains(&w1) && i + 1 < raw.len() {
            let w2 = u16::from_le_bytes([raw[i], raw[i + 1]]) as u32;
            i += 2;
            (((w1 & 0x3FF) << 10) | (w2 & 0x3FF)) + 0x10000
        } else {
            w1
        };
        push_utf8(cp, out);
    }
    out.len() - start
}

/// Appends the UTF-8 encoding of one code point.
fn push_utf8(cp: u32, out: &mut Vec<u8>) {
    if cp < 0x80 {
        out.push(cp as u8);
    } else if cp < 0x800 {
        out.push((cp >> 6) as u8 | 0xC0);
        out.push((cp & 0x3F) as u8 | 0x80);
    } else if cp < 0x10000 {
        out.push((cp >> 12) as u8 | 0xE0);
        out.push(((cp >> 6) & 0x3F) as u8 | 0x80);
        out.push((cp & 0x3F) as u8 | 0x80);
    } else {
        out.push((cp >> 18) as u8 | 0xF0);
        out.push(((cp >> 12) & 0x3F) as u8 | 0x80);
        out.push(((cp >> 6) & 0x3F) as u8 | 0x80);
        out.push((cp & 0x3F) as u8 | 0x80);
    }
}

//==================================================================================
// 2. Hex Fallback
//==================================================================================

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Hex-encodes raw bytes as uppercase ASCII, appending to `out`, and returns
/// the number of encoded bytes produced (two per source byte, capped at
/// [`MAX_HEX_BYTES`]).
///
/// This is the catch-all wire form for column kinds the codec does not
/// recognize; truncation is deliberate so an oversized blob cannot overrun
/// the batch buffer's row headroom.
pub fn hex_encode_capped(raw: &[u8], out: &mut Vec<u8>) -> usize {
    let encoded = (raw.len() * 2).min(MAX_HEX_BYTES);
    out.reserve(encoded);
    for &byte in &raw[..encoded / 2] {
        out.push(HEX_DIGITS[(byte >> 4) as usize]);
        out.push(HEX_DIGITS[(byte & 0x0F) as usize]);
    }
    encoded
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn transcode(raw: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        utf16le_to_utf8(raw, &mut out);
        out
    }

    #[test]
    fn test_ascii_passes_through() {
        // "Hi" in UTF-16LE.
        assert_eq!(transcode(&[0x48, 0x00, 0x69, 0x00]), b"Hi");
    }

    #[test]
    fn test_two_and_three_byte_sequences() {
        // U+00E9 (é) and U+20AC (€).
        assert_eq!(transcode(&[0xE9, 0x00]), "é".as_bytes());
        assert_eq!(transcode(&[0xAC, 0x20]), "€".as_bytes());
    }

    #[test]
    fn test_surrogate_pair_becomes_four_bytes() {
        // U+1F600 as the pair D83D DE00.
        let utf8 = transcode(&[0x3D, 0xD8, 0x00, 0xDE]);
        assert_eq!(utf8, [0xF0, 0x9F, 0x98, 0x80]);
    }

    #[test]
    fn test_trailing_odd_byte_is_dropped() {
        assert_eq!(transcode(&[0x41, 0x00, 0x42]), b"A");
    }

    #[test]
    fn test_unpaired_surrogate_degrades_to_three_bytes() {
        // Lead surrogate with no trail unit left in the buffer.
        let utf8 = transcode(&[0x3D, 0xD8]);
        assert_eq!(utf8.len(), 3);
    }

    #[test]
    fn test_hex_encoding_is_uppercase() {
        let mut out = Vec::new();
        let written = hex_encode_capped(&[0xDE, 0xAD, 0x01], &mut out);
        assert_eq!(written, 6);
        assert_eq!(out, b"DEAD01");
    }

    #[test]
    fn test_hex_encoding_caps_oversized_input() {
        let raw = vec![0xAB; 20_000];
        let mut out = Vec::new();
        let written = hex_encode_capped(&raw, &mut out);
        assert_eq!(written, MAX_HEX_BYTES);
        assert_eq!(out.len(), MAX_HEX_BYTES);
        assert!(out.iter().all(|&b| b == b'A' || b == b'B'));
    }
}
