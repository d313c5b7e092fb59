//! Session configuration: resolved once per invocation from explicit
//! parameters, environment fallbacks, and hard defaults, in that order.
//!
//! The host usually passes parameters through its own custom-clause
//! machinery, but operators also run ad hoc exports where only the
//! environment is available, so every connection parameter has an
//! `EXPORT_*` fallback.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

use crate::compress::CompressionMode;

pub const DEFAULT_PORT: u16 = 9999;
pub const DEFAULT_BATCH_ROWS: u32 = 1_000;
pub const MAX_BATCH_ROWS: u32 = 100_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 30_000;

const ENV_HOSTS: &str = "EXPORT_BRIDGE_HOSTS";
const ENV_QUERY_ID: &str = "EXPORT_QUERY_ID";
const ENV_TOKEN: &str = "EXPORT_SECURITY_TOKEN";
const ENV_BATCH_SIZE: &str = "EXPORT_BATCH_SIZE";
const ENV_COMPRESSION: &str = "EXPORT_COMPRESSION";

/// One resolved receiver address.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// All knobs for one export session.
///
/// `hosts` is the raw comma-separated `host[:port]` list as supplied;
/// [`ExportConfig::endpoints`] parses it. The worker id is the partition
/// index the host assigned this instance and drives deterministic endpoint
/// selection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct ExportConfig {
    pub hosts: String,
    pub query_id: String,
    pub security_token: Option<String>,
    pub batch_rows: u32,
    pub compression: CompressionMode,
    pub worker_id: i32,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            hosts: String::new(),
            query_id: String::new(),
            security_token: None,
            batch_rows: DEFAULT_BATCH_ROWS,
            compression: CompressionMode::None,
            worker_id: 0,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ExportConfig {
    /// Resolves a config from explicit parameters, filling the gaps from the
    /// `EXPORT_*` environment and finally from hard defaults. Explicit
    /// parameters always win over the environment.
    pub fn resolve(
        hosts: Option<String>,
        query_id: Option<String>,
        security_token: Option<String>,
        worker_id: i32,
    ) -> Self {
        let hosts = non_blank(hosts)
            .or_else(|| non_blank(env::var(ENV_HOSTS).ok()))
            .unwrap_or_default();
        let query_id = non_blank(query_id)
            .or_else(|| non_blank(env::var(ENV_QUERY_ID).ok()))
            .unwrap_or_default();
        let security_token =
            non_blank(security_token).or_else(|| non_blank(env::var(ENV_TOKEN).ok()));
        let batch_rows = non_blank(env::var(ENV_BATCH_SIZE).ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_BATCH_ROWS);
        let compression = non_blank(env::var(ENV_COMPRESSION).ok())
            .map(|v| CompressionMode::parse(&v))
            .unwrap_or_default();
        Self {
            hosts,
            query_id,
            security_token,
            batch_rows,
            compression,
            worker_id,
            ..Self::default()
        }
    }

    /// The batch row threshold, clamped to a sane operating range.
    pub fn effective_batch_rows(&self) -> u32 {
        self.batch_rows.clamp(1, MAX_BATCH_ROWS)
    }

    /// Parses the comma-separated endpoint list. Entries are
    /// whitespace-trimmed and empty entries skipped; a missing port falls
    /// back to [`DEFAULT_PORT`]. An unparsable port is treated as missing
    /// rather than fatal.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.hosts
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.rsplit_once(':') {
                Some((host, port)) => {
                    let host = host.trim();
                    match port.trim().parse() {
                        Ok(port) if !host.is_empty() => Endpoint {
                            host: host.to_string(),
                            port,
                        },
                        _ => Endpoint {
                            host: entry.to_string(),
                            port: DEFAULT_PORT,
                        },
                    }
                }
                None => Endpoint {
                    host: entry.to_string(),
                    port: DEFAULT_PORT,
                },
            })
            .collect()
    }

    /// Picks this worker's endpoint: partition index modulo the list length.
    /// Deterministic per worker, and spreads a fleet of workers evenly over
    /// the receiver fleet. Returns `None` for an empty list.
    pub fn select_endpoint(&self) -> Option<Endpoint> {
        let endpoints = self.endpoints();
        if endpoints.is_empty() {
            return None;
        }
        let idx = (self.worker_id as i64).rem_euclid(endpoints.len() as i64) as usize;
        Some(endpoints[idx].clone())
    }
}
