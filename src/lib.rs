//! This file is the root of the `rowbridge` Rust crate.
//!
//! `rowbridge` is the sending half of a database-to-warehouse export bridge:
//! a partition worker embedded in the source database pulls typed rows from
//! the host, encodes them into a self-describing big-endian wire format,
//! groups them into length-framed batches (optionally zlib- or
//! LZ4-compressed), and streams them over one blocking TCP connection to a
//! receiver that was told what to expect by a JSON schema handshake.
//!
//! The host implements [`source::RowSource`], builds an
//! [`config::ExportConfig`], and calls [`session::ExportSession::run`]; the
//! session returns a [`stats::SessionReport`] for every outcome, never a
//! panic.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod batch;
pub mod codec;
pub mod compress;
pub mod config;
pub mod error;
pub mod kernels;
pub mod session;
pub mod source;
pub mod stats;
pub mod types;

//==================================================================================
// 2. Public Re-exports
//==================================================================================
pub use compress::CompressionMode;
pub use config::{Endpoint, ExportConfig};
pub use error::ExportError;
pub use session::{ExportSession, SessionState};
pub use source::{Cell, ColumnarSink, RowSource};
pub use stats::{ExportStats, SessionReport};
pub use types::{CharSet, CoarseType, ColumnDescriptor, ColumnKind, WireSchema};
