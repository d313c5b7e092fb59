//! Per-batch compression behind the handshake's compression flag.
//!
//! The receiver decodes mode 1 with a `java.util.zip` inflater, so zlib
//! frames carry the standard two-byte zlib header and adler32 trailer; mode 2
//! is the raw LZ4 block format with no frame header. A compression failure is
//! terminal for the session; there is no silent fallback to uncompressed
//! frames, because the mode was already announced at handshake time.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Wire compression mode, announced once in the handshake and applied to
/// every frame payload of the session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    #[default]
    None,
    Zlib,
    Lz4,
}

impl CompressionMode {
    /// The `u32` flag value the handshake carries for this mode.
    pub fn wire_flag(self) -> u32 {
        match self {
            CompressionMode::None => 0,
            CompressionMode::Zlib => 1,
            CompressionMode::Lz4 => 2,
        }
    }

    /// Parses the textual form used by configuration and environment
    /// parameters. Unrecognized text is `None` rather than an error; a typo
    /// in an optional tuning knob must not kill the export.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "zlib" | "1" => CompressionMode::Zlib,
            "lz4" | "2" => CompressionMode::Lz4,
            _ => CompressionMode::None,
        }
    }
}

/// Compresses frame payloads, reusing one grow-only scratch buffer across
/// the whole session.
pub struct Compressor {
    mode: CompressionMode,
    scratch: Vec<u8>,
}

impl Compressor {
    pub fn new(mode: CompressionMode) -> Self {
        Self {
            mode,
            scratch: Vec::new(),
        }
    }

    pub fn mode(&self) -> CompressionMode {
        self.mode
    }

    /// Returns the wire form of `payload` under the session's mode. For
    /// `None` this is the payload itself; otherwise the bytes live in the
    /// internal scratch buffer until the next call.
    pub fn compress<'a>(&'a mut self, payload: &'a [u8]) -> Result<&'a [u8], ExportError> {
        match self.mode {
            CompressionMode::None => Ok(payload),
            CompressionMode::Zlib => {
                self.scratch.clear();
                let mut encoder = ZlibEncoder::new(&mut self.scratch, Compression::default());
                encoder
                    .write_all(payload)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| ExportError::CompressionFailure(e.to_string()))?;
                Ok(&self.scratch)
            }
            CompressionMode::Lz4 => {
                let worst_case = lz4_flex::block::get_maximum_output_size(payload.len());
                if self.scratch.len() < worst_case {
                    self.scratch
                        .try_reserve(worst_case - self.scratch.len())
                        .map_err(|e| {
                            ExportError::AllocationFailure(format!("compression scratch: {}", e))
                        })?;
                    self.scratch.resize(worst_case, 0);
                }
                let written = lz4_flex::block::compress_into(payload, &mut self.scratch)
                    .map_err(|e| ExportError::CompressionFailure(e.to_string()))?;
                Ok(&self.scratch[..written])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_wire_flags_match_receiver_contract() {
        assert_eq!(CompressionMode::None.wire_flag(), 0);
        assert_eq!(CompressionMode::Zlib.wire_flag(), 1);
        assert_eq!(CompressionMode::Lz4.wire_flag(), 2);
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!(CompressionMode::parse("ZLIB"), CompressionMode::Zlib);
        assert_eq!(CompressionMode::parse(" lz4 "), CompressionMode::Lz4);
        assert_eq!(CompressionMode::parse("2"), CompressionMode::Lz4);
        assert_eq!(CompressionMode::parse("snappy"), CompressionMode::None);
        assert_eq!(CompressionMode::parse(""), CompressionMode::None);
    }

    #[test]
    fn test_none_passes_payload_through() {
        let mut compressor = Compressor::new(CompressionMode::None);
        let payload = [1u8, 2, 3];
        assert_eq!(compressor.compress(&payload).unwrap(), payload);
    }

    #[test]
    fn test_zlib_round_trip() {
        let payload: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        let mut compressor = Compressor::new(CompressionMode::Zlib);
        let wire = compressor.compress(&payload).unwrap().to_vec();
        assert!(wire.len() < payload.len());

        let mut decoded = Vec::new();
        flate2::read::ZlibDecoder::new(&wire[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_lz4_round_trip() {
        let payload: Vec<u8> = (0..4096u32).map(|i| (i % 5) as u8).collect();
        let mut compressor = Compressor::new(CompressionMode::Lz4);
        let wire = compressor.compress(&payload).unwrap().to_vec();

        let decoded = lz4_flex::block::decompress(&wire, payload.len()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_scratch_is_reused_across_frames() {
        let mut compressor = Compressor::new(CompressionMode::Zlib);
        let first = compressor.compress(b"frame one, frame one").unwrap().to_vec();
        let second = compressor.compress(b"frame one, frame one").unwrap().to_vec();
        assert_eq!(first, second);
    }
}
