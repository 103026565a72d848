//! # Siemens S7 Client Library
//!
//! A Rust library for reading data blocks from Siemens S7 PLCs over
//! ISO-on-TCP.
//!
//! This is a **protocol-only** library: no polling, schedulers, or
//! application-level features. Each read produces exactly 1 request and
//! 1 response. No automatic retries, caching, or reconnection.
//!
//! ## Features
//!
//! - **Protocol-only** - connection handshake, block reads, payload decoding
//! - **Deterministic** - each call performs at most one blocking transport call per step
//! - **Type-safe** - generic big-endian decoding for every supported field type
//! - **No panics** - all errors returned as `Result<T, S7Error>`, never out-of-bounds reads
//! - **Pluggable transport** - TCP by default, any blocking byte stream via [`Connector`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use siemens_s7::{Client, ClientConfig, ReadResponse};
//! use std::net::Ipv4Addr;
//!
//! fn main() -> siemens_s7::Result<()> {
//!     // S7-300 CPU in rack 0, slot 2
//!     let config = ClientConfig::new(Ipv4Addr::new(192, 168, 0, 1), 0, 2);
//!     let mut client = Client::new(config)?;
//!     client.connect()?;
//!
//!     // Read 16 bytes from DB10
//!     let mut buffer = [0u8; 512];
//!     let n = client.read(&mut buffer, 10, 0, 16)?;
//!     let response = ReadResponse::parse(&buffer[..n])?;
//!
//!     let counter: i32 = response.get(0)?;
//!     let setpoint: f32 = response.get(4)?;
//!     let enabled = response.get_bool(8, 0)?;
//!     println!("counter={} setpoint={} enabled={}", counter, setpoint, enabled);
//!
//!     client.close()
//! }
//! ```
//!
//! ## Connection Lifecycle
//!
//! | Step | Request | Accepted response |
//! |------|---------|-------------------|
//! | Dial | TCP connect with timeout | - |
//! | Upgrade | COTP connection request (22 bytes) | exactly 22 bytes, PDU type `0xD0` |
//! | Negotiate | Setup communication (25 bytes) | exactly 27 bytes, error class/code `0` |
//!
//! The client reports [`SessionState::Connected`] only after all steps
//! succeed; any failure leaves it [`SessionState::Disconnected`].
//!
//! ## Payload Decoding
//!
//! The [`payload`] module decodes values from a raw read response. Offsets
//! are relative to the payload (the 25-byte header is skipped for you):
//!
//! ```
//! use siemens_s7::payload::{check_read_response, get_i16, get_string};
//!
//! let mut response = vec![0u8; 25];
//! response[21] = 0xFF; // item return code: success
//! response.extend_from_slice(&[0xFF, 0x9C, 0x04, b'S', b'7']);
//!
//! check_read_response(&response)?;
//! assert_eq!(get_i16(&response, 0)?, -100);
//! assert_eq!(get_string(&response, 2, 2)?, "S7");
//! # Ok::<(), siemens_s7::S7Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, S7Error>`]. Compare by [`ErrorKind`]
//! or match on the variant for context:
//!
//! ```no_run
//! use siemens_s7::{Client, ClientConfig, S7Error};
//! use std::net::Ipv4Addr;
//!
//! let mut client = Client::new(ClientConfig::new(Ipv4Addr::new(192, 168, 0, 1), 0, 2))?;
//!
//! match client.connect() {
//!     Ok(()) => println!("connected, PDU {:?}", client.pdu_length()),
//!     Err(e) if e.is_timeout() => println!("PLC did not answer in time"),
//!     Err(S7Error::UpgradeRejected { code }) => println!("rack/slot refused (0x{:02X})", code),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok::<(), S7Error>(())
//! ```
//!
//! ## Logging
//!
//! Handshake steps and reads emit [`tracing`] events (`debug` and `trace`
//! levels). The library never installs a subscriber.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
mod error;
pub mod frame;
pub mod payload;
mod transport;

// Public re-exports
pub use client::{Client, ClientConfig, SessionState, RESPONSE_BUFFER_SIZE};
pub use error::{ErrorKind, Result, S7Error};
pub use payload::{BigEndian, ReadResponse, READ_RESPONSE_HEADER_SIZE, STRING_HEADER_SIZE};
pub use transport::{
    Connector, TcpConnector, TcpTransport, Transport, DEFAULT_ISO_TCP_PORT, DEFAULT_TIMEOUT,
};
