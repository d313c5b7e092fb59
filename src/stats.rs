//! Running counters for one export session and the single output record the
//! host receives when the session ends.

use serde::{Deserialize, Serialize};

use crate::config::Endpoint;
use crate::error::ExportError;

/// Counters accumulated while streaming. Byte counts are pre-compression
/// frame bytes, so they measure the data exported rather than the codec's
/// luck with a particular compressor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub rows_processed: u64,
    pub null_count: u64,
    pub bytes_sent: u64,
    pub batches_sent: u64,
}

impl ExportStats {
    pub fn record_row(&mut self, nulls_in_row: u64) {
        self.rows_processed += 1;
        self.null_count += nulls_in_row;
    }

    pub fn record_batch(&mut self, payload_bytes: u64) {
        self.batches_sent += 1;
        self.bytes_sent += payload_bytes;
    }
}

/// The one-row summary returned to the host for every session outcome,
/// success or failure alike.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub worker_id: i32,
    pub rows_processed: i64,
    pub bytes_sent: i64,
    pub null_count: i64,
    pub batches_sent: i64,
    pub input_column_count: i32,
    pub status: String,
}

impl SessionReport {
    fn from_stats(worker_id: i32, column_count: usize, stats: &ExportStats, status: String) -> Self {
        Self {
            worker_id,
            rows_processed: stats.rows_processed as i64,
            bytes_sent: stats.bytes_sent as i64,
            null_count: stats.null_count as i64,
            batches_sent: stats.batches_sent as i64,
            input_column_count: column_count as i32,
            status,
        }
    }

    /// Success record: the status line names the endpoint actually used, the
    /// worker (AMP) id, this process's pid, and the correlation id, so one
    /// grep over collected reports reconstructs the whole topology.
    pub fn success(
        worker_id: i32,
        column_count: usize,
        stats: &ExportStats,
        endpoint: &Endpoint,
        query_id: &str,
    ) -> Self {
        let status = format!(
            "[{}] AMP:{} PID:{} SUCCESS (Query: {})",
            endpoint,
            worker_id,
            std::process::id(),
            query_id
        );
        Self::from_stats(worker_id, column_count, stats, status)
    }

    /// Failure record: counters reflect what was delivered before the error.
    pub fn failure(
        worker_id: i32,
        column_count: usize,
        stats: &ExportStats,
        error: &ExportError,
    ) -> Self {
        let status = format!("ERROR {}: {}", error.code(), error);
        Self::from_stats(worker_id, column_count, stats, status)
    }
}
