//! The host boundary: traits the embedding database export worker
//! implements to hand rows to the session.
//!
//! `RowSource` mirrors the host's pull primitive: advance one row, then
//! read each cell's raw little-endian bytes. `ColumnarSink` is the
//! alternative embedding for hosts that want typed column values instead of
//! the socket protocol (an Arrow-style builder, for instance);
//! [`drive_columnar`] bridges the two using the same kernels the wire codec
//! uses, so both paths agree on every conversion.

use crate::error::ExportError;
use crate::kernels::{decimal, temporal, text};
use crate::types::{CharSet, ColumnDescriptor, ColumnKind};

/// One cell of the current row: a null flag plus the raw source-encoded
/// value bytes (meaningless when `is_null` is set).
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    pub is_null: bool,
    pub raw: &'a [u8],
}

impl<'a> Cell<'a> {
    pub fn null() -> Self {
        Self {
            is_null: true,
            raw: &[],
        }
    }

    pub fn value(raw: &'a [u8]) -> Self {
        Self { is_null: false, raw }
    }
}

/// Pull-style row access implemented by the host.
///
/// The descriptor slice is fixed for the lifetime of the source; `advance`
/// returning `Ok(false)` means the partition is exhausted. `cell` may only
/// be called for the row most recently advanced to.
pub trait RowSource {
    fn column_descriptors(&self) -> &[ColumnDescriptor];
    fn advance(&mut self) -> Result<bool, ExportError>;
    fn cell(&self, column: usize) -> Cell<'_>;
}

//==================================================================================
// Columnar embedding
//==================================================================================

/// Typed per-column appends for hosts that consume decoded values rather
/// than the socket wire format. One method per coarse wire type; a full row
/// is delimited by `row_complete`.
pub trait ColumnarSink {
    fn append_null(&mut self, column: usize);
    fn append_integer(&mut self, column: usize, value: i32);
    fn append_bigint(&mut self, column: usize, value: i64);
    fn append_double(&mut self, column: usize, value: f64);
    /// UTF-8 text, already transcoded (or hex-encoded for opaque kinds).
    fn append_text(&mut self, column: usize, utf8: &[u8]);
    /// Days since 1970-01-01.
    fn append_date(&mut self, column: usize, epoch_days: i32);
    /// Picoseconds since midnight.
    fn append_time(&mut self, column: usize, picos: i64);
    /// Microseconds since the 1970-01-01 epoch.
    fn append_timestamp(&mut self, column: usize, epoch_micros: i64);
    /// Unscaled short-decimal value; the scale is in the descriptor.
    fn append_decimal_short(&mut self, column: usize, unscaled: i64);
    /// Big-endian two's-complement 128-bit unscaled value.
    fn append_decimal_long(&mut self, column: usize, unscaled_be: [u8; 16]);
    fn row_complete(&mut self);
}

fn read_le_u32(raw: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    for (i, slot) in bytes.iter_mut().enumerate() {
        *slot = raw.get(offset + i).copied().unwrap_or(0);
    }
    u32::from_le_bytes(bytes)
}

fn read_u8(raw: &[u8], offset: usize) -> u8 {
    raw.get(offset).copied().unwrap_or(0)
}

/// Drains `source` into `sink`, one typed append per cell, and returns the
/// number of rows delivered.
pub fn drive_columnar<S: RowSource, K: ColumnarSink>(
    source: &mut S,
    sink: &mut K,
) -> Result<u64, ExportError> {
    let descriptors = source.column_descriptors().to_vec();
    let mut scratch = Vec::new();
    let mut rows = 0u64;
    while source.advance()? {
        for (col, desc) in descriptors.iter().enumerate() {
            let cell = source.cell(col);
            if cell.is_null {
                sink.append_null(col);
                continue;
            }
            append_cell(sink, col, desc, cell.raw, &mut scratch);
        }
        sink.row_complete();
        rows += 1;
    }
    Ok(rows)
}

fn append_cell<K: ColumnarSink>(
    sink: &mut K,
    col: usize,
    desc: &ColumnDescriptor,
    raw: &[u8],
    scratch: &mut Vec<u8>,
) {
    match desc.kind {
        ColumnKind::Integer | ColumnKind::SmallInt | ColumnKind::ByteInt => {
            let width = desc.byte_width.clamp(1, 4).min(raw.len().max(1));
            sink.append_integer(col, decimal::sign_extend_le(&raw[..width.min(raw.len())]) as i32);
        }
        ColumnKind::BigInt => sink.append_bigint(col, decimal::sign_extend_le(raw)),
        ColumnKind::Float => {
            let mut bytes = [0u8; 8];
            for (i, slot) in bytes.iter_mut().enumerate() {
                *slot = read_u8(raw, i);
            }
            sink.append_double(col, f64::from_le_bytes(bytes));
        }
        ColumnKind::VarChar | ColumnKind::Char => {
            let len = if desc.kind == ColumnKind::Char {
                desc.byte_width.min(raw.len())
            } else {
                raw.len()
            };
            scratch.clear();
            match desc.charset {
                CharSet::Unicode => {
                    text::utf16le_to_utf8(&raw[..len], scratch);
                }
                CharSet::Latin => scratch.extend_from_slice(&raw[..len.min(text::MAX_TEXT_BYTES)]),
            }
            scratch.truncate(text::MAX_TEXT_BYTES);
            sink.append_text(col, scratch);
        }
        ColumnKind::Date => {
            let packed = read_le_u32(raw, 0) as i32;
            sink.append_date(col, temporal::packed_date_to_epoch_days(packed));
        }
        ColumnKind::Time => {
            let picos =
                temporal::packed_time_to_picos(read_le_u32(raw, 0), read_u8(raw, 4), read_u8(raw, 5));
            sink.append_time(col, picos);
        }
        ColumnKind::Timestamp => {
            let micros = temporal::packed_timestamp_to_epoch_micros(
                read_le_u32(raw, 0),
                u16::from_le_bytes([read_u8(raw, 4), read_u8(raw, 5)]),
                read_u8(raw, 6),
                read_u8(raw, 7),
                read_u8(raw, 8),
                read_u8(raw, 9),
            );
            sink.append_timestamp(col, micros);
        }
        ColumnKind::Decimal => {
            if desc.byte_width <= 8 {
                sink.append_decimal_short(col, decimal::sign_extend_le(raw));
            } else {
                sink.append_decimal_long(col, decimal::to_be_bytes_128(raw));
            }
        }
        ColumnKind::Opaque => {
            scratch.clear();
            text::hex_encode_capped(raw, scratch);
            sink.append_text(col, scratch);
        }
    }
}
