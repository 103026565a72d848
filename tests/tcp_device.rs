//! End-to-end tests against a scripted device on a loopback TCP socket.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use siemens_s7::payload::{check_read_response, get_bool, get_f32, get_i16, get_string, get_u32};
use siemens_s7::{Client, ClientConfig, ErrorKind, ReadResponse, S7Error, SessionState};

const CONNECTION_CONFIRM: &str = "0300001611d00001000100c0010ac1020100c2020102";
const NEGOTIATE_ACK: &str = "0300001b02f080320300000400000800000000f0000001000100f0";

/// Builds a read response carrying `data` with item return code `code`.
fn read_response(code: u8, data: &[u8]) -> Vec<u8> {
    let total = 25 + data.len();
    let data_len = 4 + data.len();
    let bit_len = data.len() * 8;
    let mut bytes = vec![
        0x03, 0x00, (total >> 8) as u8, total as u8, // TPKT
        0x02, 0xF0, 0x80, // COTP data
        0x32, 0x03, 0x00, 0x00, 0x05, 0x00, 0x00, 0x02, // S7 ack-data header
        (data_len >> 8) as u8, data_len as u8,
        0x00, 0x00, // error class/code
        0x04, 0x01, // read var, 1 item
        code, 0x04, (bit_len >> 8) as u8, bit_len as u8,
    ];
    bytes.extend_from_slice(data);
    bytes
}

/// Accepts one connection and answers each request in turn with the next reply.
fn spawn_device(replies: Vec<Vec<u8>>) -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>) {
    spawn_slow_device(replies, Duration::ZERO)
}

/// Like [`spawn_device`], but waits `delay` before each reply.
fn spawn_slow_device(
    replies: Vec<Vec<u8>>,
    delay: Duration,
) -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut requests = Vec::new();
        for reply in replies {
            let request = read_request(&mut stream);
            if request.is_empty() {
                break;
            }
            requests.push(request);
            thread::sleep(delay);
            if stream.write_all(&reply).is_err() {
                break;
            }
        }
        // Drain until the client hangs up
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
        requests
    });

    (addr, handle)
}

/// Reads one TPKT-framed request.
fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 4];
    if stream.read_exact(&mut header).is_err() {
        return Vec::new();
    }
    let len = u16::from_be_bytes([header[2], header[3]]) as usize;
    let mut request = header.to_vec();
    request.resize(len, 0);
    stream.read_exact(&mut request[4..]).unwrap();
    request
}

fn handshake_replies() -> Vec<Vec<u8>> {
    vec![
        hex::decode(CONNECTION_CONFIRM).unwrap(),
        hex::decode(NEGOTIATE_ACK).unwrap(),
    ]
}

fn config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::from_addr(addr, 0, 2).with_timeout(Duration::from_secs(2))
}

#[test]
fn test_connect_read_close() {
    let mut data = Vec::new();
    data.extend_from_slice(&(-1234i16).to_be_bytes());
    data.extend_from_slice(&21.5f32.to_be_bytes());
    data.extend_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
    data.push(0b0000_0101);
    data.extend_from_slice(&[0x04, b'P', b'L', b'C', b'1']);

    let mut replies = handshake_replies();
    replies.push(read_response(0xFF, &data));
    let (addr, device) = spawn_device(replies);

    let mut client = Client::new(config(addr)).unwrap();
    client.connect().unwrap();
    assert_eq!(client.state(), SessionState::Connected);
    assert_eq!(client.pdu_length(), Some(240));

    let mut buffer = [0u8; 512];
    let n = client.read(&mut buffer, 5, 0, data.len() as u16).unwrap();
    let response = &buffer[..n];

    check_read_response(response).unwrap();
    assert_eq!(get_i16(response, 0).unwrap(), -1234);
    assert_eq!(get_f32(response, 2).unwrap(), 21.5);
    assert_eq!(get_u32(response, 6).unwrap(), 0xDEAD_BEEF);
    assert!(get_bool(response, 10, 0).unwrap());
    assert!(!get_bool(response, 10, 1).unwrap());
    assert!(get_bool(response, 10, 2).unwrap());
    assert_eq!(get_string(response, 11, 4).unwrap(), "PLC1");

    client.close().unwrap();
    assert_eq!(client.state(), SessionState::Disconnected);

    let requests = device.join().unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(&requests[0][20..22], &[0x01, 0x02]);
    assert_eq!(requests[1].len(), 25);
    assert_eq!(requests[2].len(), 31);
    assert_eq!(&requests[2][23..27], &[0x00, data.len() as u8, 0x00, 0x05]);
}

#[test]
fn test_device_reported_read_failure() {
    let mut replies = handshake_replies();
    // 0x0A: object does not exist
    replies.push(read_response(0x0A, &[]));
    let (addr, device) = spawn_device(replies);

    let mut client = Client::new(config(addr)).unwrap();
    client.connect().unwrap();

    let mut buffer = [0u8; 512];
    let n = client.read(&mut buffer, 999, 0, 4).unwrap();
    let err = ReadResponse::parse(&buffer[..n]).unwrap_err();
    assert!(matches!(err, S7Error::ReadRejected { code: 0x0A }));

    client.close().unwrap();
    device.join().unwrap();
}

#[test]
fn test_upgrade_rejected_by_device() {
    let mut refusal = hex::decode(CONNECTION_CONFIRM).unwrap();
    // disconnect request instead of connection confirm
    refusal[5] = 0x80;
    let (addr, device) = spawn_device(vec![refusal]);

    let mut client = Client::new(config(addr)).unwrap();
    let err = client.connect().unwrap_err();

    assert!(matches!(err, S7Error::UpgradeRejected { code: 0x80 }));
    assert_eq!(client.state(), SessionState::Disconnected);
    assert_eq!(device.join().unwrap().len(), 1);
}

#[test]
fn test_dial_failure_leaves_client_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client = Client::new(config(addr)).unwrap();
    let err = client.connect().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);

    let mut buffer = [0u8; 64];
    assert_eq!(
        client.read(&mut buffer, 1, 0, 1).unwrap_err().kind(),
        ErrorKind::NotConnected
    );
    assert_eq!(client.close().unwrap_err().kind(), ErrorKind::NotConnected);
}

#[test]
fn test_silent_device_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let device = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
    });

    let config = ClientConfig::from_addr(addr, 0, 2).with_timeout(Duration::from_millis(100));
    let mut client = Client::new(config).unwrap();

    let err = client.connect().unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    assert!(!client.is_connected());

    device.join().unwrap();
}

#[test]
fn test_read_after_deadline_fails() {
    let mut replies = handshake_replies();
    replies.push(read_response(0xFF, &[0x01]));
    let (addr, device) = spawn_device(replies);

    let mut client = Client::new(config(addr)).unwrap();
    client.connect().unwrap();
    client
        .set_deadline(Instant::now() + Duration::from_millis(50))
        .unwrap();
    thread::sleep(Duration::from_millis(100));

    let mut buffer = [0u8; 512];
    let err = client.read(&mut buffer, 1, 0, 1).unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    // The request never reached the device
    assert!(client.is_connected());

    client.close().unwrap();
    assert_eq!(device.join().unwrap().len(), 2);
}

#[test]
fn test_deadline_spans_consecutive_reads() {
    let mut replies = handshake_replies();
    for _ in 0..4 {
        replies.push(read_response(0xFF, &[0x01]));
    }
    let (addr, device) = spawn_slow_device(replies, Duration::from_millis(100));

    let mut client = Client::new(config(addr)).unwrap();
    client.connect().unwrap();

    let start = Instant::now();
    client.set_deadline(start + Duration::from_millis(250)).unwrap();

    let mut buffer = [0u8; 512];
    let mut timed_out = None;
    for attempt in 0..4 {
        match client.read(&mut buffer, 1, 0, 1) {
            Ok(_) => {}
            Err(err) => {
                assert!(err.is_timeout(), "expected timeout, got {:?}", err);
                timed_out = Some(attempt);
                break;
            }
        }
    }

    assert!(timed_out.is_some(), "every read succeeded past the deadline");
    assert!(start.elapsed() < Duration::from_millis(400));

    client.close().unwrap();
    device.join().unwrap();
}
