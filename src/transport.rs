//! Byte-stream transport for S7 communication.
//!
//! The protocol layer talks to the device through two small traits:
//!
//! - [`Connector`] - dials a [`Transport`] with a timeout
//! - [`Transport`] - a blocking, ordered byte stream with deadlines
//!
//! The transport knows nothing about S7; it moves bytes and reports I/O
//! errors verbatim. [`TcpConnector`] and [`TcpTransport`] are the default
//! implementation over `std::net::TcpStream`.
//!
//! # Constants
//!
//! - [`DEFAULT_ISO_TCP_PORT`] - ISO-on-TCP port (102)
//! - [`DEFAULT_TIMEOUT`] - Default connection timeout (2 seconds)
//!
//! # Example
//!
//! ```no_run
//! use siemens_s7::{Connector, TcpConnector, Transport};
//! use std::io::Write;
//! use std::time::{Duration, Instant};
//!
//! let mut transport = TcpConnector
//!     .connect("192.168.0.1:102".parse().unwrap(), Duration::from_secs(2))
//!     .unwrap();
//! transport.set_deadline(Instant::now() + Duration::from_secs(1)).unwrap();
//! transport.write_all(&[0x03, 0x00, /* ... */]).unwrap();
//! transport.close().unwrap();
//! ```

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

/// Default ISO-on-TCP port.
pub const DEFAULT_ISO_TCP_PORT: u16 = 102;

/// Default timeout for dialing and for each handshake step.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Blocking byte stream to a device.
///
/// Reads and writes are single calls on the underlying stream: one `read`
/// returns whatever one receive delivers.
pub trait Transport: Read + Write {
    /// Sets the point in time after which blocking reads and writes fail.
    ///
    /// Expiry surfaces as an I/O error from the call in flight.
    fn set_deadline(&mut self, deadline: Instant) -> io::Result<()>;

    /// Closes the stream.
    fn close(&mut self) -> io::Result<()>;
}

/// Opens transports to a device address.
pub trait Connector {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Opens a transport to `addr`, failing if it takes longer than `timeout`.
    fn connect(&self, addr: SocketAddr, timeout: Duration) -> io::Result<Self::Transport>;
}

/// Connector producing [`TcpTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(&self, addr: SocketAddr, timeout: Duration) -> io::Result<TcpTransport> {
        TcpTransport::connect(addr, timeout)
    }
}

/// TCP transport for S7 communication.
///
/// The deadline is a fixed point in time. Before every read or write the
/// socket timeout is set to whatever time is left; once the deadline has
/// passed, calls fail with [`io::ErrorKind::TimedOut`] without touching the
/// socket.
pub struct TcpTransport {
    stream: TcpStream,
    remote_addr: SocketAddr,
    deadline: Option<Instant>,
}

impl TcpTransport {
    /// Connects to the device at `addr`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the connection cannot be established within
    /// `timeout`.
    pub fn connect(addr: SocketAddr, timeout: Duration) -> io::Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        // Requests are small and latency bound
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            remote_addr: addr,
            deadline: None,
        })
    }

    /// Returns the remote device address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Returns the time left before the deadline, `None` if no deadline is set.
    fn remaining(&self) -> io::Result<Option<Duration>> {
        match self.deadline {
            None => Ok(None),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed"))
                } else {
                    Ok(Some(remaining))
                }
            }
        }
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining()?;
        self.stream.set_read_timeout(remaining)?;
        self.stream.read(buf)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.remaining()?;
        self.stream.set_write_timeout(remaining)?;
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpTransport {
    fn set_deadline(&mut self, deadline: Instant) -> io::Result<()> {
        self.deadline = Some(deadline);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.stream.local_addr().ok())
            .field("deadline", &self.deadline)
            .finish()
    }
}
