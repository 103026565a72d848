//! S7 client: connection lifecycle and block reads.
//!
//! This module provides the [`Client`] struct, which owns the transport to
//! one PLC and drives the connection handshake:
//!
//! 1. Dial the device (ISO-on-TCP, port 102 by default)
//! 2. Upgrade the stream with a COTP connection request addressed by rack/slot
//! 3. Negotiate the PDU size
//!
//! Only after all three steps succeed is the client connected. A failure at
//! any step closes the fresh transport and leaves the client disconnected.
//!
//! # Example
//!
//! ```no_run
//! use siemens_s7::{payload, Client, ClientConfig};
//! use std::net::Ipv4Addr;
//!
//! let config = ClientConfig::new(Ipv4Addr::new(192, 168, 0, 1), 0, 2);
//! let mut client = Client::new(config)?;
//! client.connect()?;
//!
//! let mut buffer = [0u8; 256];
//! let n = client.read(&mut buffer, 10, 0, 8)?;
//! let response = &buffer[..n];
//! payload::check_read_response(response)?;
//!
//! let speed = payload::get_f32(response, 0)?;
//! let running = payload::get_bool(response, 4, 0)?;
//! println!("speed = {}, running = {}", speed, running);
//!
//! client.close()?;
//! # Ok::<(), siemens_s7::S7Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Every operation takes `&mut self` and blocks on at most one transport
//! call per step. Share a client between threads only behind a lock, or
//! keep one client per worker.

use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::{Result, S7Error};
use crate::frame::{
    build_negotiate_frame, build_read_frame, build_upgrade_frame, check_negotiate_response,
    check_upgrade_response, NEGOTIATE_FRAME_SIZE, UPGRADE_FRAME_SIZE,
};
use crate::transport::{Connector, TcpConnector, Transport, DEFAULT_ISO_TCP_PORT, DEFAULT_TIMEOUT};

/// Size of the scratch buffer used for handshake responses.
pub const RESPONSE_BUFFER_SIZE: usize = 512;

/// Configuration for creating an S7 client.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientConfig {
    /// PLC socket address.
    pub plc_addr: SocketAddr,
    /// Rack of the CPU.
    pub rack: u16,
    /// Slot of the CPU.
    pub slot: u16,
    /// Timeout for dialing and for each handshake step.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a new client configuration.
    ///
    /// Uses the ISO-on-TCP port (102) and the default timeout (2 seconds).
    ///
    /// # Arguments
    ///
    /// * `plc_ip` - PLC IP address
    /// * `rack` - Rack of the CPU (usually 0)
    /// * `slot` - Slot of the CPU (2 on S7-300, 1 or 0 on newer families)
    ///
    /// # Example
    ///
    /// ```
    /// use siemens_s7::ClientConfig;
    /// use std::net::Ipv4Addr;
    ///
    /// let config = ClientConfig::new(Ipv4Addr::new(192, 168, 0, 1), 0, 2);
    /// assert_eq!(config.plc_addr.port(), 102);
    /// ```
    pub fn new(plc_ip: impl Into<IpAddr>, rack: u16, slot: u16) -> Self {
        Self::from_addr(SocketAddr::new(plc_ip.into(), DEFAULT_ISO_TCP_PORT), rack, slot)
    }

    /// Creates a configuration for a full socket address.
    pub fn from_addr(plc_addr: SocketAddr, rack: u16, slot: u16) -> Self {
        Self {
            plc_addr,
            rack,
            slot,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom PLC port (default is 102).
    pub fn with_port(mut self, port: u16) -> Self {
        self.plc_addr.set_port(port);
        self
    }

    /// Sets a custom timeout (default is 2 seconds).
    ///
    /// # Example
    ///
    /// ```
    /// use siemens_s7::ClientConfig;
    /// use std::net::Ipv4Addr;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::new(Ipv4Addr::new(192, 168, 0, 1), 0, 2)
    ///     .with_timeout(Duration::from_millis(500));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Observable connection state of a [`Client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport is held. Initial state, and the state after `close` or a
    /// failed `connect`.
    Disconnected,
    /// The handshake completed; reads may be issued.
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connected => write!(f, "connected"),
        }
    }
}

/// An established session.
struct Session<T> {
    transport: T,
    pdu_length: u16,
}

/// S7 client for reading data blocks from a Siemens PLC.
///
/// Each read produces exactly 1 request and 1 response.
/// No automatic retries, caching, or reconnection.
///
/// The type parameter selects how the byte stream is opened; the default
/// [`TcpConnector`] dials a TCP socket.
pub struct Client<C: Connector = TcpConnector> {
    config: ClientConfig,
    connector: C,
    upgrade_request: [u8; UPGRADE_FRAME_SIZE],
    negotiate_request: [u8; NEGOTIATE_FRAME_SIZE],
    session: Option<Session<C::Transport>>,
    response_buf: Vec<u8>,
}

impl Client<TcpConnector> {
    /// Creates a new, disconnected client. No I/O is performed.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidParameter` if rack and slot do not form a
    /// 16-bit TSAP.
    ///
    /// # Example
    ///
    /// ```
    /// use siemens_s7::{Client, ClientConfig};
    /// use std::net::Ipv4Addr;
    ///
    /// let client = Client::new(ClientConfig::new(Ipv4Addr::new(192, 168, 0, 1), 0, 2)).unwrap();
    /// assert!(!client.is_connected());
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_connector(config, TcpConnector)
    }
}

impl<C: Connector> Client<C> {
    /// Creates a new, disconnected client that opens transports with `connector`.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidParameter` if rack and slot do not form a
    /// 16-bit TSAP.
    pub fn with_connector(config: ClientConfig, connector: C) -> Result<Self> {
        let upgrade_request = build_upgrade_frame(config.rack, config.slot)?;

        Ok(Self {
            config,
            connector,
            upgrade_request,
            negotiate_request: build_negotiate_frame(),
            session: None,
            response_buf: vec![0u8; RESPONSE_BUFFER_SIZE],
        })
    }

    /// Dials the PLC and performs the connection handshake.
    ///
    /// If the client is already connected, the existing transport is closed
    /// first and a new one is dialed. The last handshake deadline stays in
    /// force afterwards; call [`set_deadline`](Self::set_deadline) before
    /// reading later than that.
    ///
    /// # Errors
    ///
    /// - `S7Error::Transport` if dialing, a deadline, a write or a read fails
    /// - `S7Error::ShortResponse` if a handshake response has the wrong length
    /// - `S7Error::UpgradeRejected` if the connection request is refused
    /// - `S7Error::NegotiationRejected` if the PDU negotiation is refused
    ///
    /// On error the client is disconnected.
    pub fn connect(&mut self) -> Result<()> {
        if let Some(mut previous) = self.session.take() {
            debug!(addr = %self.config.plc_addr, "closing previous session before reconnecting");
            if let Err(e) = previous.transport.close() {
                warn!(addr = %self.config.plc_addr, error = %e, "failed to close previous session");
            }
        }

        debug!(
            addr = %self.config.plc_addr,
            rack = self.config.rack,
            slot = self.config.slot,
            timeout = ?self.config.timeout,
            "dialing PLC"
        );
        let mut transport = self
            .connector
            .connect(self.config.plc_addr, self.config.timeout)?;

        match self.handshake(&mut transport) {
            Ok(pdu_length) => {
                debug!(addr = %self.config.plc_addr, pdu_length, "session established");
                self.session = Some(Session {
                    transport,
                    pdu_length,
                });
                Ok(())
            }
            Err(err) => {
                warn!(addr = %self.config.plc_addr, error = %err, "handshake failed");
                if let Err(e) = transport.close() {
                    debug!(error = %e, "failed to close transport after handshake failure");
                }
                Err(err)
            }
        }
    }

    /// Upgrades the stream and negotiates the PDU, returning the granted PDU length.
    fn handshake(&mut self, transport: &mut C::Transport) -> Result<u16> {
        let timeout = self.config.timeout;

        let n = exchange(transport, &self.upgrade_request, &mut self.response_buf, timeout)?;
        check_upgrade_response(&self.response_buf[..n])?;
        debug!(addr = %self.config.plc_addr, "connection upgraded");

        let n = exchange(transport, &self.negotiate_request, &mut self.response_buf, timeout)?;
        check_negotiate_response(&self.response_buf[..n])
    }

    /// Sets the point in time after which transport calls fail.
    ///
    /// The deadline is absolute: it covers every later read and write until
    /// it is replaced.
    ///
    /// # Errors
    ///
    /// - `S7Error::NotConnected` if the client is not connected
    /// - `S7Error::Transport` if the transport rejects the deadline
    pub fn set_deadline(&mut self, deadline: Instant) -> Result<()> {
        let session = self.session.as_mut().ok_or(S7Error::NotConnected)?;
        session.transport.set_deadline(deadline)?;
        Ok(())
    }

    /// Reads `count` bytes of data block `block_number` into `buffer`.
    ///
    /// Writes one request and performs exactly one transport read, returning
    /// the number of bytes received (header included). The response is not
    /// inspected; pass `&buffer[..n]` to
    /// [`check_read_response`](crate::payload::check_read_response) before
    /// decoding values.
    ///
    /// `start_address` is accepted but not sent: reads always begin at
    /// byte 0 of the block, so payload offsets are block offsets.
    ///
    /// # Errors
    ///
    /// - `S7Error::NotConnected` if the client is not connected
    /// - `S7Error::Transport` if the write or the read fails
    pub fn read(
        &mut self,
        buffer: &mut [u8],
        block_number: u16,
        start_address: u32,
        count: u16,
    ) -> Result<usize> {
        let session = self.session.as_mut().ok_or(S7Error::NotConnected)?;

        let request = build_read_frame(block_number, start_address, count);
        trace!(request = ?request, "sending read request");
        session.transport.write_all(&request)?;

        let n = session.transport.read(buffer)?;
        debug!(block = block_number, count, len = n, "read data block");
        Ok(n)
    }

    /// Closes the transport.
    ///
    /// The client is disconnected afterwards even if closing reports an error.
    ///
    /// # Errors
    ///
    /// - `S7Error::NotConnected` if the client is not connected
    /// - `S7Error::Transport` if closing the transport fails
    pub fn close(&mut self) -> Result<()> {
        let mut session = self.session.take().ok_or(S7Error::NotConnected)?;
        debug!(addr = %self.config.plc_addr, "closing session");
        session.transport.close()?;
        Ok(())
    }

    /// Returns the connection state.
    pub fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    /// Returns whether the handshake has completed and the session is open.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the PDU length granted by the PLC, while connected.
    pub fn pdu_length(&self) -> Option<u16> {
        self.session.as_ref().map(|s| s.pdu_length)
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Runs one handshake step: fresh deadline, write `request`, read one response.
fn exchange<T: Transport>(
    transport: &mut T,
    request: &[u8],
    response: &mut [u8],
    timeout: Duration,
) -> Result<usize> {
    transport.set_deadline(Instant::now() + timeout)?;
    trace!(request = ?request, "sending handshake request");
    transport.write_all(request)?;

    let n = transport.read(response)?;
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed during handshake",
        )
        .into());
    }
    trace!(response = ?&response[..n], "received handshake response");
    Ok(n)
}

impl<C: Connector> std::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("pdu_length", &self.pdu_length())
            .finish()
    }
}
