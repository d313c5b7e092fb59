//! The type codec: maps one non-null column value to its canonical wire byte
//! encoding, appended directly into the batch buffer.
//!
//! Wire conventions (all multi-byte integers big-endian):
//!
//! | semantic kind        | wire form                                        |
//! |----------------------|--------------------------------------------------|
//! | Integer/SmallInt/ByteInt | sign-extended 4-byte signed int              |
//! | BigInt               | 8-byte signed int                                |
//! | Float                | raw IEEE-754 bit pattern as big-endian u64       |
//! | VarChar/Char         | 2-byte length prefix + UTF-8 (or raw Latin) text |
//! | Date                 | 4-byte day count since 1970-01-01                |
//! | Time                 | 8-byte picoseconds since midnight                |
//! | Timestamp            | 8-byte microseconds since the epoch              |
//! | Decimal (<= 8 bytes) | 8-byte signed unscaled value                     |
//! | Decimal (16 bytes)   | 16 bytes, big-endian two's complement            |
//! | Opaque               | 2-byte length prefix + uppercase hex ASCII       |
//!
//! The codec is total: short or oversized raw values are zero-padded or
//! truncated, never rejected. Null handling is the caller's job: the 1-byte
//! null flag for a column is always written before any value bytes.

use crate::kernels::{decimal, temporal, text};
use crate::types::{CharSet, ColumnDescriptor, ColumnKind};

//==================================================================================
// 1. Defensive Little-Endian Field Readers
//==================================================================================

/// Reads a little-endian u32 field, zero-padding past the end of `raw`.
fn read_le_u32(raw: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    for (i, slot) in bytes.iter_mut().enumerate() {
        *slot = raw.get(offset + i).copied().unwrap_or(0);
    }
    u32::from_le_bytes(bytes)
}

/// Reads a little-endian u16 field, zero-padding past the end of `raw`.
fn read_le_u16(raw: &[u8], offset: usize) -> u16 {
    let lo = raw.get(offset).copied().unwrap_or(0);
    let hi = raw.get(offset + 1).copied().unwrap_or(0);
    u16::from_le_bytes([lo, hi])
}

fn read_u8(raw: &[u8], offset: usize) -> u8 {
    raw.get(offset).copied().unwrap_or(0)
}

//==================================================================================
// 2. The Codec
//==================================================================================

/// Encodes one non-null column value into its wire form, appending to `out`.
///
/// For `VarChar` the runtime value length is `raw.len()`; for `Char` the
/// descriptor's fixed byte width governs (clamped to the bytes actually
/// present).
pub fn encode_value(desc: &ColumnDescriptor, raw: &[u8], out: &mut Vec<u8>) {
    match desc.kind {
        ColumnKind::Integer | ColumnKind::SmallInt | ColumnKind::ByteInt => {
            let width = desc.byte_width.clamp(1, 4).min(raw.len().max(1));
            let value = decimal::sign_extend_le(&raw[..width.min(raw.len())]) as i32;
            out.extend_from_slice(&value.to_be_bytes());
        }
        ColumnKind::BigInt => {
            let value = decimal::sign_extend_le(raw);
            out.extend_from_slice(&value.to_be_bytes());
        }
        ColumnKind::Float => {
            // The receiver reinterprets the bits; no float arithmetic here.
            let bits = u64::from_le_bytes([
                read_u8(raw, 0),
                read_u8(raw, 1),
                read_u8(raw, 2),
                read_u8(raw, 3),
                read_u8(raw, 4),
                read_u8(raw, 5),
                read_u8(raw, 6),
                read_u8(raw, 7),
            ]);
            out.extend_from_slice(&bits.to_be_bytes());
        }
        ColumnKind::VarChar => encode_text(raw, raw.len(), desc.charset, out),
        ColumnKind::Char => encode_text(raw, desc.byte_width.min(raw.len()), desc.charset, out),
        ColumnKind::Date => {
            let packed = read_le_u32(raw, 0) as i32;
            let days = temporal::packed_date_to_epoch_days(packed);
            out.extend_from_slice(&days.to_be_bytes());
        }
        ColumnKind::Time => {
            let scaled_seconds = read_le_u32(raw, 0);
            let picos =
                temporal::packed_time_to_picos(scaled_seconds, read_u8(raw, 4), read_u8(raw, 5));
            out.extend_from_slice(&picos.to_be_bytes());
        }
        ColumnKind::Timestamp => {
            let micros = temporal::packed_timestamp_to_epoch_micros(
                read_le_u32(raw, 0),
                read_le_u16(raw, 4),
                read_u8(raw, 6),
                read_u8(raw, 7),
                read_u8(raw, 8),
                read_u8(raw, 9),
            );
            out.extend_from_slice(&micros.to_be_bytes());
        }
        ColumnKind::Decimal => {
            if desc.byte_width <= 8 {
                let unscaled = decimal::sign_extend_le(raw);
                out.extend_from_slice(&unscaled.to_be_bytes());
            } else {
                out.extend_from_slice(&decimal::to_be_bytes_128(raw));
            }
        }
        ColumnKind::Opaque => {
            // Reserve the prefix slot, encode, then patch the real length in.
            let prefix_at = out.len();
            out.extend_from_slice(&[0, 0]);
            let written = text::hex_encode_capped(raw, out);
            out[prefix_at..prefix_at + 2].copy_from_slice(&(written as u16).to_be_bytes());
        }
    }
}

/// Length-prefixed text: transcoded for double-byte sources, copied raw for
/// single-byte sources, truncated to what a 2-byte length can describe.
fn encode_text(raw: &[u8], len: usize, charset: CharSet, out: &mut Vec<u8>) {
    let prefix_at = out.len();
    out.extend_from_slice(&[0, 0]);
    let written = match charset {
        CharSet::Unicode => {
            let produced = text::utf16le_to_utf8(&raw[..len], out);
            let mut written = produced.min(text::MAX_TEXT_BYTES);
            if written < produced {
                // The cut must land on a sequence boundary, or the wire
                // string ends in an invalid partial code point.
                while written > 0 && out[prefix_at + 2 + written] & 0xC0 == 0x80 {
                    written -= 1;
                }
            }
            written
        }
        CharSet::Latin => {
            let len = len.min(text::MAX_TEXT_BYTES);
            out.extend_from_slice(&raw[..len]);
            len
        }
    };
    out.truncate(prefix_at + 2 + written);
    out[prefix_at..prefix_at + 2].copy_from_slice(&(written as u16).to_be_bytes());
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
