//! This module defines the single, unified error type for the entire rowbridge
//! library. It uses the `thiserror` crate to provide ergonomic, context-aware
//! error handling.
//!
//! Every variant is terminal for the current export session: the protocol
//! performs exactly one connection attempt and one linear pass over the row
//! stream, so nothing here is ever retried internally. Each variant carries a
//! stable numeric code that ends up in the session's status record.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    // =========================================================================
    // === Session-Terminal Protocol Errors
    // =========================================================================
    #[error("Connect to {endpoint} failed: {reason}")]
    ConnectFailure { endpoint: String, reason: String },

    #[error("Handshake send failed: {0}")]
    HandshakeSendFailure(String),

    #[error("Batch send failed: {0}")]
    BatchSendFailure(String),

    #[error("Compression failed: {0}")]
    CompressionFailure(String),

    #[error("Buffer allocation failed: {0}")]
    AllocationFailure(String),

    #[error("Row source provided no usable column descriptors")]
    MetadataUnavailable,

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library during schema serialization.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl ExportError {
    /// The numeric code reported in the session status record.
    ///
    /// Zero is reserved for success; everything here is non-zero so a status
    /// consumer can distinguish outcomes without parsing the message text.
    pub fn code(&self) -> i32 {
        match self {
            ExportError::ConnectFailure { .. } => 1001,
            ExportError::HandshakeSendFailure(_) => 1002,
            ExportError::BatchSendFailure(_) => 1003,
            ExportError::CompressionFailure(_) => 1004,
            ExportError::AllocationFailure(_) => 1005,
            ExportError::MetadataUnavailable => 1006,
            ExportError::Io(_) => 1007,
            ExportError::SerdeJson(_) => 1008,
        }
    }
}
