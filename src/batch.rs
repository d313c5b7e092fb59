//! Batch assembly: rows are appended to a single growable buffer behind four
//! reserved header bytes, and the big-endian row count is patched in at flush
//! time.
//!
//! A batch flushes on whichever trips first: the configured row-count
//! threshold, or the buffer crossing its safety margin. The margin leaves a
//! full maximum-row's worth of headroom so a row already half-encoded can
//! always finish in the current buffer.

use crate::error::ExportError;

/// Target capacity of the batch buffer.
pub const BUFFER_CAPACITY: usize = 4 * 1024 * 1024;

/// Flush once the payload grows past `BUFFER_CAPACITY - FLUSH_MARGIN`. The
/// margin is sized to the largest row the codec can produce.
pub const FLUSH_MARGIN: usize = 1024 * 1024;

const HEADER_LEN: usize = 4;

/// Accumulates encoded rows into one frame payload.
///
/// The payload layout is `[u32 row_count]` followed by the concatenated row
/// encodings. `buffer_mut` exposes the tail of the buffer so the codec can
/// append value bytes directly; [`BatchAssembler::row_finished`] commits the
/// row to the count.
pub struct BatchAssembler {
    buf: Vec<u8>,
    row_count: u32,
    max_rows: u32,
}

impl BatchAssembler {
    /// Reserves the full batch buffer up front so the streaming loop never
    /// reallocates mid-row. The one large allocation is fallible: a worker
    /// that cannot get its buffer must report, not abort the process.
    pub fn new(max_rows: u32) -> Result<Self, ExportError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(BUFFER_CAPACITY)
            .map_err(|e| ExportError::AllocationFailure(format!("batch buffer: {}", e)))?;
        buf.extend_from_slice(&[0u8; HEADER_LEN]);
        Ok(Self {
            buf,
            row_count: 0,
            max_rows: max_rows.max(1),
        })
    }

    /// The buffer the codec appends the current row's bytes into.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Commits the row appended since the last call.
    pub fn row_finished(&mut self) {
        self.row_count += 1;
    }

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Pre-compression byte length of the pending payload, header included.
    pub fn payload_len(&self) -> usize {
        self.buf.len()
    }

    /// True once the row threshold is met or the buffer has crossed its
    /// safety margin.
    pub fn is_full(&self) -> bool {
        self.row_count >= self.max_rows || self.buf.len() > BUFFER_CAPACITY - FLUSH_MARGIN
    }

    /// Patches the row-count header, hands the finished payload to `sink`,
    /// and resets the assembler for the next batch.
    ///
    /// A zero-row batch is skipped entirely: the empty payload is never
    /// surfaced, so the zero-length terminator frame stays unambiguous.
    pub fn flush_with<E>(
        &mut self,
        sink: impl FnOnce(&[u8]) -> Result<(), E>,
    ) -> Result<(), E> {
        if self.row_count == 0 {
            return Ok(());
        }
        self.buf[..HEADER_LEN].copy_from_slice(&self.row_count.to_be_bytes());
        let result = sink(&self.buf);
        self.buf.clear();
        self.buf.extend_from_slice(&[0u8; HEADER_LEN]);
        self.row_count = 0;
        result
    }
}
