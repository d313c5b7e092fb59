//! This module contains the pure, stateless kernels for fixed-point decimal
//! values.
//!
//! Decimals arrive as little-endian two's-complement integers of 1, 2, 4, 8,
//! or 16 bytes carrying the unscaled value; the scale travels separately in
//! the handshake schema, never per value. Short decimals (<= 8 bytes) are
//! sign-extended to 64 bits; the 16-byte form is shipped verbatim with its
//! byte order flipped to big-endian.

/// Sign-extends a little-endian two's-complement integer of up to 8 bytes
/// into an `i64`.
///
/// Inputs wider than 8 bytes are truncated to their low 8 bytes; an empty
/// input decodes to zero.
pub fn sign_extend_le(raw: &[u8]) -> i64 {
    let width = raw.len().min(8);
    if width == 0 {
        return 0;
    }
    let negative = raw[width - 1] & 0x80 != 0;
    let mut bytes = if negative { [0xFFu8; 8] } else { [0u8; 8] };
    bytes[..width].copy_from_slice(&raw[..width]);
    i64::from_le_bytes(bytes)
}

/// Converts a little-endian two's-complement integer of up to 16 bytes into
/// its 16-byte big-endian representation.
///
/// Narrow inputs are sign-extended to the full width before the byte order
/// is flipped, so a 1-byte `-1` and a 16-byte `-1` produce the same wire
/// bytes.
pub fn to_be_bytes_128(raw: &[u8]) -> [u8; 16] {
    let width = raw.len().min(16);
    let negative = width > 0 && raw[width - 1] & 0x80 != 0;
    let mut le = if negative { [0xFFu8; 16] } else { [0u8; 16] };
    le[..width].copy_from_slice(&raw[..width]);
    le.reverse();
    le
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend_all_short_widths() {
        assert_eq!(sign_extend_le(&(-5i8).to_le_bytes()), -5);
        assert_eq!(sign_extend_le(&(-1234i16).to_le_bytes()), -1234);
        assert_eq!(sign_extend_le(&123_456_789i32.to_le_bytes()), 123_456_789);
        assert_eq!(
            sign_extend_le(&(-987_654_321_012i64).to_le_bytes()),
            -987_654_321_012
        );
    }

    #[test]
    fn test_sign_extend_edge_values() {
        assert_eq!(sign_extend_le(&[]), 0);
        assert_eq!(sign_extend_le(&[0x80]), -128);
        assert_eq!(sign_extend_le(&[0x7F]), 127);
        assert_eq!(sign_extend_le(&[0xFF, 0xFF]), -1);
    }

    #[test]
    fn test_decimal128_byte_reversal() {
        // Little-endian 1 becomes big-endian 1.
        let mut le = [0u8; 16];
        le[0] = 0x01;
        let be = to_be_bytes_128(&le);
        let mut expected = [0u8; 16];
        expected[15] = 0x01;
        assert_eq!(be, expected);
    }

    #[test]
    fn test_decimal128_negative_one_any_width() {
        assert_eq!(to_be_bytes_128(&[0xFF]), [0xFF; 16]);
        assert_eq!(to_be_bytes_128(&[0xFF; 16]), [0xFF; 16]);
    }

    #[test]
    fn test_decimal128_round_trips_through_i128() {
        for value in [0i128, 1, -1, 170_141_183_460_469_231_731_687_303_715_884_105_727] {
            let be = to_be_bytes_128(&value.to_le_bytes());
            assert_eq!(i128::from_be_bytes(be), value);
        }
    }
}
