//! The export session: one connection, one handshake, one linear pass over
//! the row stream, one summary record.
//!
//! All state lives in the [`ExportSession`] value; nothing is process-global,
//! so a host may run many sessions in one process without interference. The
//! protocol is deliberately primitive (blocking I/O, stop-and-wait, a single
//! connection attempt with no retry) because the host runs one session per
//! partition worker and restarts failed partitions itself.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::batch::BatchAssembler;
use crate::codec;
use crate::compress::Compressor;
use crate::config::{Endpoint, ExportConfig};
use crate::error::ExportError;
use crate::source::RowSource;
use crate::stats::{ExportStats, SessionReport};
use crate::types::{ColumnDescriptor, WireSchema};

/// Where the session currently is in its linear lifecycle. `Errored` is
/// absorbing: any failure parks the session there permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    EndpointSelected,
    Connected,
    HandshakeSent,
    Streaming,
    Terminated,
    Closed,
    Errored,
}

/// One export invocation. Construct, call [`ExportSession::run`] once, read
/// the report.
pub struct ExportSession {
    config: ExportConfig,
    state: SessionState,
}

impl ExportSession {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            state: SessionState::Created,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Streams every row of `source` to the selected endpoint and returns
    /// the summary record. Never panics and never returns an error: any
    /// failure is folded into the report's status line, because the host
    /// expects exactly one output row per worker no matter what happened.
    pub fn run<S: RowSource>(&mut self, source: &mut S) -> SessionReport {
        let column_count = source.column_descriptors().len();
        let mut stats = ExportStats::default();
        match self.stream(source, &mut stats) {
            Ok(endpoint) => {
                log::info!(
                    "worker {} exported {} rows in {} batches to {}",
                    self.config.worker_id,
                    stats.rows_processed,
                    stats.batches_sent,
                    endpoint
                );
                SessionReport::success(
                    self.config.worker_id,
                    column_count,
                    &stats,
                    &endpoint,
                    &self.config.query_id,
                )
            }
            Err(error) => {
                self.state = SessionState::Errored;
                log::error!(
                    "worker {} export aborted after {} rows: {}",
                    self.config.worker_id,
                    stats.rows_processed,
                    error
                );
                SessionReport::failure(self.config.worker_id, column_count, &stats, &error)
            }
        }
    }

    fn stream<S: RowSource>(
        &mut self,
        source: &mut S,
        stats: &mut ExportStats,
    ) -> Result<Endpoint, ExportError> {
        let descriptors = source.column_descriptors().to_vec();
        if descriptors.is_empty() {
            return Err(ExportError::MetadataUnavailable);
        }

        let endpoint = self
            .config
            .select_endpoint()
            .ok_or_else(|| ExportError::ConnectFailure {
                endpoint: "(none)".to_string(),
                reason: "no endpoints configured".to_string(),
            })?;
        self.state = SessionState::EndpointSelected;
        log::info!(
            "worker {} selected endpoint {} of {} configured",
            self.config.worker_id,
            endpoint,
            self.config.endpoints().len()
        );

        let mut stream = self.connect(&endpoint)?;
        self.state = SessionState::Connected;

        self.send_handshake(&mut stream, &descriptors)?;
        self.state = SessionState::HandshakeSent;

        self.state = SessionState::Streaming;
        let mut assembler = BatchAssembler::new(self.config.effective_batch_rows())?;
        let mut compressor = Compressor::new(self.config.compression);
        while source.advance()? {
            let mut nulls_in_row = 0u64;
            for (col, desc) in descriptors.iter().enumerate() {
                let cell = source.cell(col);
                let buf = assembler.buffer_mut();
                if cell.is_null {
                    buf.push(1);
                    nulls_in_row += 1;
                } else {
                    buf.push(0);
                    codec::encode_value(desc, cell.raw, buf);
                }
            }
            assembler.row_finished();
            stats.record_row(nulls_in_row);
            if assembler.is_full() {
                send_batch(&mut stream, &mut assembler, &mut compressor, stats)?;
            }
        }
        send_batch(&mut stream, &mut assembler, &mut compressor, stats)?;

        self.terminate(&mut stream)?;
        self.state = SessionState::Closed;
        Ok(endpoint)
    }

    fn connect(&self, endpoint: &Endpoint) -> Result<TcpStream, ExportError> {
        let connect_err = |reason: String| ExportError::ConnectFailure {
            endpoint: endpoint.to_string(),
            reason,
        };
        let addr = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("hostname resolved to no addresses".to_string()))?;
        let stream =
            TcpStream::connect_timeout(&addr, Duration::from_millis(self.config.connect_timeout_ms))
                .map_err(|e| connect_err(e.to_string()))?;
        let io_timeout = Some(Duration::from_millis(self.config.io_timeout_ms));
        stream.set_read_timeout(io_timeout)?;
        stream.set_write_timeout(io_timeout)?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Handshake layout, all lengths big-endian u32:
    /// `[token_len][token?] [query_id_len][query_id] [compression_flag]
    /// [schema_len][schema_json]`. The token length is always present; zero
    /// means no token.
    fn send_handshake(
        &self,
        stream: &mut TcpStream,
        descriptors: &[ColumnDescriptor],
    ) -> Result<(), ExportError> {
        let schema = serde_json::to_vec(&WireSchema::from_descriptors(descriptors))?;

        let token = self.config.security_token.as_deref().unwrap_or("");
        let query_id = self.config.query_id.as_str();
        let mut handshake = Vec::with_capacity(16 + token.len() + query_id.len() + schema.len() + 4);
        handshake.extend_from_slice(&(token.len() as u32).to_be_bytes());
        handshake.extend_from_slice(token.as_bytes());
        handshake.extend_from_slice(&(query_id.len() as u32).to_be_bytes());
        handshake.extend_from_slice(query_id.as_bytes());
        handshake.extend_from_slice(&self.config.compression.wire_flag().to_be_bytes());
        handshake.extend_from_slice(&(schema.len() as u32).to_be_bytes());
        handshake.extend_from_slice(&schema);

        stream
            .write_all(&handshake)
            .and_then(|_| stream.flush())
            .map_err(|e| ExportError::HandshakeSendFailure(e.to_string()))
    }

    /// Zero-length sentinel frame, then a bounded read for the receiver's
    /// short acknowledgment. The ack bytes themselves are discarded; what
    /// matters is that the receiver got everything before we close.
    fn terminate(&mut self, stream: &mut TcpStream) -> Result<(), ExportError> {
        self.state = SessionState::Terminated;
        stream
            .write_all(&0u32.to_be_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| ExportError::BatchSendFailure(e.to_string()))?;

        let mut ack = [0u8; 8];
        let read = stream
            .read(&mut ack)
            .map_err(|e| ExportError::BatchSendFailure(format!("acknowledgment read: {}", e)))?;
        log::debug!("received {}-byte acknowledgment", read);
        Ok(())
    }
}

fn send_batch(
    stream: &mut TcpStream,
    assembler: &mut BatchAssembler,
    compressor: &mut Compressor,
    stats: &mut ExportStats,
) -> Result<(), ExportError> {
    if assembler.is_empty() {
        return Ok(());
    }
    let payload_bytes = assembler.payload_len() as u64;
    let rows = assembler.row_count();
    assembler.flush_with(|payload| {
        let wire = compressor.compress(payload)?;
        stream
            .write_all(&(wire.len() as u32).to_be_bytes())
            .and_then(|_| stream.write_all(wire))
            .map_err(|e| ExportError::BatchSendFailure(e.to_string()))
    })?;
    stats.record_batch(payload_bytes);
    log::debug!("sent batch: {} rows, {} payload bytes", rows, payload_bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Cell;

    struct EmptySchemaSource;

    impl RowSource for EmptySchemaSource {
        fn column_descriptors(&self) -> &[ColumnDescriptor] {
            &[]
        }
        fn advance(&mut self) -> Result<bool, ExportError> {
            Ok(false)
        }
        fn cell(&self, _column: usize) -> Cell<'_> {
            Cell::null()
        }
    }

    #[test]
    fn test_missing_descriptors_yield_metadata_error_report() {
        let mut session = ExportSession::new(ExportConfig::default());
        let report = session.run(&mut EmptySchemaSource);
        assert_eq!(session.state(), SessionState::Errored);
        assert!(report.status.starts_with("ERROR 1006:"));
        assert_eq!(report.rows_processed, 0);
        assert_eq!(report.input_column_count, 0);
    }

    struct OneColumnSource {
        descriptors: Vec<ColumnDescriptor>,
    }

    impl RowSource for OneColumnSource {
        fn column_descriptors(&self) -> &[ColumnDescriptor] {
            &self.descriptors
        }
        fn advance(&mut self) -> Result<bool, ExportError> {
            Ok(false)
        }
        fn cell(&self, _column: usize) -> Cell<'_> {
            Cell::null()
        }
    }

    #[test]
    fn test_empty_endpoint_list_yields_connect_error_report() {
        let mut session = ExportSession::new(ExportConfig::default());
        let mut source = OneColumnSource {
            descriptors: vec![ColumnDescriptor::plain(crate::types::ColumnKind::Integer, 4)],
        };
        let report = session.run(&mut source);
        assert!(report.status.starts_with("ERROR 1001:"));
        assert_eq!(session.state(), SessionState::Errored);
    }
}
