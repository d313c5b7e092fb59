//! End-to-end protocol tests against an in-process stand-in bridge: a real
//! `TcpListener` that decodes the handshake and frame stream exactly the way
//! the receiving side does, then replies with the short acknowledgment.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};

use rowbridge::{
    Cell, CharSet, ColumnDescriptor, ColumnKind, CompressionMode, ExportConfig, ExportError,
    ExportSession, RowSource, SessionState,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

//==================================================================================
// Bridge stub
//==================================================================================

struct Captured {
    token: Vec<u8>,
    query_id: Vec<u8>,
    compression: u32,
    schema_json: String,
    frames: Vec<Vec<u8>>,
}

fn read_u32(sock: &mut impl Read) -> u32 {
    let mut buf = [0u8; 4];
    sock.read_exact(&mut buf).unwrap();
    u32::from_be_bytes(buf)
}

fn read_block(sock: &mut impl Read) -> Vec<u8> {
    let len = read_u32(sock) as usize;
    let mut buf = vec![0u8; len];
    sock.read_exact(&mut buf).unwrap();
    buf
}

/// Accepts one connection, decodes handshake and frames until the sentinel,
/// acknowledges with "OK", and hands everything seen back to the test.
fn spawn_bridge() -> (SocketAddr, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        let token = read_block(&mut sock);
        let query_id = read_block(&mut sock);
        let compression = read_u32(&mut sock);
        let schema_json = String::from_utf8(read_block(&mut sock)).unwrap();

        let mut frames = Vec::new();
        loop {
            let len = read_u32(&mut sock) as usize;
            if len == 0 {
                break;
            }
            let mut frame = vec![0u8; len];
            sock.read_exact(&mut frame).unwrap();
            frames.push(frame);
        }
        sock.write_all(b"OK").unwrap();
        Captured {
            token,
            query_id,
            compression,
            schema_json,
            frames,
        }
    });
    (addr, handle)
}

//==================================================================================
// Row fixture
//==================================================================================

struct FixtureSource {
    descriptors: Vec<ColumnDescriptor>,
    rows: Vec<Vec<Option<Vec<u8>>>>,
    cursor: usize,
}

impl FixtureSource {
    /// Three rows over (INTEGER, VARCHAR) with one null in each direction.
    fn standard() -> Self {
        Self {
            descriptors: vec![
                ColumnDescriptor::plain(ColumnKind::Integer, 4),
                ColumnDescriptor::text(ColumnKind::VarChar, 0, CharSet::Latin),
            ],
            rows: vec![
                vec![Some(42i32.to_le_bytes().to_vec()), Some(b"hi".to_vec())],
                vec![None, Some(b"x".to_vec())],
                vec![Some(7i32.to_le_bytes().to_vec()), None],
            ],
            cursor: 0,
        }
    }
}

impl RowSource for FixtureSource {
    fn column_descriptors(&self) -> &[ColumnDescriptor] {
        &self.descriptors
    }

    fn advance(&mut self) -> Result<bool, ExportError> {
        if self.cursor < self.rows.len() {
            self.cursor += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn cell(&self, column: usize) -> Cell<'_> {
        match &self.rows[self.cursor - 1][column] {
            Some(raw) => Cell::value(raw),
            None => Cell::null(),
        }
    }
}

/// The expected wire payloads for `FixtureSource::standard` with a
/// two-row batch threshold: frames of 2 and 1 rows.
fn expected_frames() -> [Vec<u8>; 2] {
    // Row 1: non-null 42, non-null "hi".
    let mut row1 = vec![0u8];
    row1.extend_from_slice(&42i32.to_be_bytes());
    row1.extend_from_slice(&[0, 0x00, 0x02]);
    row1.extend_from_slice(b"hi");
    // Row 2: null, non-null "x".
    let mut row2 = vec![1u8];
    row2.extend_from_slice(&[0, 0x00, 0x01]);
    row2.extend_from_slice(b"x");
    // Row 3: non-null 7, null.
    let mut row3 = vec![0u8];
    row3.extend_from_slice(&7i32.to_be_bytes());
    row3.push(1);

    let mut frame1 = 2u32.to_be_bytes().to_vec();
    frame1.extend_from_slice(&row1);
    frame1.extend_from_slice(&row2);
    let mut frame2 = 1u32.to_be_bytes().to_vec();
    frame2.extend_from_slice(&row3);
    [frame1, frame2]
}

fn config_for(addr: SocketAddr, compression: CompressionMode) -> ExportConfig {
    ExportConfig {
        hosts: addr.to_string(),
        query_id: "q-test-1".to_string(),
        batch_rows: 2,
        compression,
        worker_id: 0,
        ..ExportConfig::default()
    }
}

//==================================================================================
// Tests
//==================================================================================

#[test]
fn test_uncompressed_stream_end_to_end() {
    init_logs();
    let (addr, bridge) = spawn_bridge();
    let mut source = FixtureSource::standard();
    let mut session = ExportSession::new(config_for(addr, CompressionMode::None));

    let report = session.run(&mut source);
    let captured = bridge.join().unwrap();

    assert_eq!(session.state(), SessionState::Closed);
    assert!(report.status.contains("SUCCESS (Query: q-test-1)"), "{}", report.status);
    assert!(report.status.contains("AMP:0"));
    assert_eq!(report.rows_processed, 3);
    assert_eq!(report.null_count, 2);
    assert_eq!(report.batches_sent, 2);
    assert_eq!(report.input_column_count, 2);

    assert_eq!(captured.token, b"");
    assert_eq!(captured.query_id, b"q-test-1");
    assert_eq!(captured.compression, 0);
    assert_eq!(
        captured.schema_json,
        r#"{"columns":[{"name":"col_0","type":"INTEGER"},{"name":"col_1","type":"VARCHAR"}]}"#
    );

    let expected = expected_frames();
    assert_eq!(captured.frames, expected);
    assert_eq!(
        report.bytes_sent as usize,
        expected[0].len() + expected[1].len()
    );
}

#[test]
fn test_zlib_frames_decode_to_same_payloads() {
    init_logs();
    let (addr, bridge) = spawn_bridge();
    let mut source = FixtureSource::standard();
    let mut session = ExportSession::new(config_for(addr, CompressionMode::Zlib));

    let report = session.run(&mut source);
    let captured = bridge.join().unwrap();

    assert!(report.status.contains("SUCCESS"), "{}", report.status);
    assert_eq!(captured.compression, 1);

    let decoded: Vec<Vec<u8>> = captured
        .frames
        .iter()
        .map(|frame| {
            let mut payload = Vec::new();
            flate2::read::ZlibDecoder::new(&frame[..])
                .read_to_end(&mut payload)
                .unwrap();
            payload
        })
        .collect();
    assert_eq!(decoded, expected_frames());
}

#[test]
fn test_lz4_frames_decode_to_same_payloads() {
    init_logs();
    let (addr, bridge) = spawn_bridge();
    let mut source = FixtureSource::standard();
    let mut session = ExportSession::new(config_for(addr, CompressionMode::Lz4));

    let report = session.run(&mut source);
    let captured = bridge.join().unwrap();

    assert!(report.status.contains("SUCCESS"), "{}", report.status);
    assert_eq!(captured.compression, 2);

    let expected = expected_frames();
    for (frame, want) in captured.frames.iter().zip(expected.iter()) {
        let payload = lz4_flex::block::decompress(frame, want.len()).unwrap();
        assert_eq!(&payload, want);
    }
}

#[test]
fn test_security_token_is_framed_in_handshake() {
    init_logs();
    let (addr, bridge) = spawn_bridge();
    let mut source = FixtureSource::standard();
    let mut config = config_for(addr, CompressionMode::None);
    config.security_token = Some("s3cret".to_string());
    let mut session = ExportSession::new(config);

    let report = session.run(&mut source);
    let captured = bridge.join().unwrap();

    assert!(report.status.contains("SUCCESS"), "{}", report.status);
    assert_eq!(captured.token, b"s3cret");
}

#[test]
fn test_connect_refused_produces_error_report() {
    init_logs();
    // Bind and immediately drop so the port is very likely unoccupied.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let mut source = FixtureSource::standard();
    let mut session = ExportSession::new(config_for(addr, CompressionMode::None));

    let report = session.run(&mut source);

    assert_eq!(session.state(), SessionState::Errored);
    assert!(report.status.starts_with("ERROR 1001:"), "{}", report.status);
    assert_eq!(report.rows_processed, 0);
    assert_eq!(report.batches_sent, 0);
}

#[test]
fn test_exhausted_source_sends_only_the_sentinel() {
    init_logs();
    let (addr, bridge) = spawn_bridge();
    let mut source = FixtureSource {
        descriptors: vec![ColumnDescriptor::plain(ColumnKind::Integer, 4)],
        rows: Vec::new(),
        cursor: 0,
    };
    let mut session = ExportSession::new(config_for(addr, CompressionMode::None));

    let report = session.run(&mut source);
    let captured = bridge.join().unwrap();

    assert!(report.status.contains("SUCCESS"), "{}", report.status);
    assert_eq!(report.rows_processed, 0);
    assert_eq!(report.batches_sent, 0);
    assert!(captured.frames.is_empty());
}
