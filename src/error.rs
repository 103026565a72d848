//! Error types for the S7 client.

use std::io;
use thiserror::Error;

/// Result type alias for S7 operations.
pub type Result<T> = std::result::Result<T, S7Error>;

/// Errors that can occur during S7 communication or payload decoding.
///
/// Use [`S7Error::kind`] to compare errors by kind without matching on
/// the carried context.
#[derive(Debug, Error)]
pub enum S7Error {
    /// I/O error from the underlying transport (dial, read, write, deadline, close).
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// A response was shorter than the protocol mandates.
    #[error("Short response: expected {expected} bytes, got {received}")]
    ShortResponse {
        /// Length required by the protocol.
        expected: usize,
        /// Length actually received.
        received: usize,
    },

    /// The device refused the ISO-on-TCP connection request.
    #[error("Connection upgrade rejected: PDU type 0x{code:02X}")]
    UpgradeRejected {
        /// PDU type byte found where the connection confirm (0xD0) was expected.
        code: u8,
    },

    /// The device refused the PDU negotiation.
    #[error("PDU negotiation rejected: error class 0x{error_class:02X}, error code 0x{error_code:02X}")]
    NegotiationRejected {
        /// Error class byte of the negotiation response.
        error_class: u8,
        /// Error code byte of the negotiation response.
        error_code: u8,
    },

    /// An operation requiring an open session was invoked without one.
    #[error("Not connected")]
    NotConnected,

    /// The device reported a failure for the requested block read.
    #[error("Read rejected: return code 0x{code:02X}")]
    ReadRejected {
        /// Return code of the data item (0xFF is success).
        code: u8,
    },

    /// A field extraction reached past the end of the supplied buffer.
    #[error("Short payload: need {required} bytes, buffer has {available}")]
    ShortPayload {
        /// Buffer length the extraction needs.
        required: usize,
        /// Buffer length supplied.
        available: usize,
    },

    /// Bit index outside 0-7.
    #[error("Invalid bit index {index}: must be 0-7")]
    InvalidIndex {
        /// The rejected bit index.
        index: u8,
    },

    /// Non-positive string length.
    #[error("Invalid string length {length}: must be greater than 0")]
    InvalidLength {
        /// The rejected length.
        length: usize,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },
}

/// Kind of an [`S7Error`], without its context.
///
/// # Example
///
/// ```
/// use siemens_s7::{ErrorKind, S7Error};
///
/// let err = S7Error::NotConnected;
/// assert_eq!(err.kind(), ErrorKind::NotConnected);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`S7Error::Transport`].
    Transport,
    /// See [`S7Error::ShortResponse`].
    ShortResponse,
    /// See [`S7Error::UpgradeRejected`].
    UpgradeRejected,
    /// See [`S7Error::NegotiationRejected`].
    NegotiationRejected,
    /// See [`S7Error::NotConnected`].
    NotConnected,
    /// See [`S7Error::ReadRejected`].
    ReadRejected,
    /// See [`S7Error::ShortPayload`].
    ShortPayload,
    /// See [`S7Error::InvalidIndex`].
    InvalidIndex,
    /// See [`S7Error::InvalidLength`].
    InvalidLength,
    /// See [`S7Error::InvalidParameter`].
    InvalidParameter,
}

impl S7Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            S7Error::Transport(_) => ErrorKind::Transport,
            S7Error::ShortResponse { .. } => ErrorKind::ShortResponse,
            S7Error::UpgradeRejected { .. } => ErrorKind::UpgradeRejected,
            S7Error::NegotiationRejected { .. } => ErrorKind::NegotiationRejected,
            S7Error::NotConnected => ErrorKind::NotConnected,
            S7Error::ReadRejected { .. } => ErrorKind::ReadRejected,
            S7Error::ShortPayload { .. } => ErrorKind::ShortPayload,
            S7Error::InvalidIndex { .. } => ErrorKind::InvalidIndex,
            S7Error::InvalidLength { .. } => ErrorKind::InvalidLength,
            S7Error::InvalidParameter { .. } => ErrorKind::InvalidParameter,
        }
    }

    /// Returns whether this is a transport error caused by an expired deadline.
    ///
    /// The error itself is left untouched; the check only inspects the
    /// wrapped `io::ErrorKind`.
    pub fn is_timeout(&self) -> bool {
        match self {
            S7Error::Transport(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Creates a new `ShortResponse` error.
    ///
    /// # Example
    ///
    /// ```
    /// use siemens_s7::S7Error;
    ///
    /// let err = S7Error::short_response(22, 7);
    /// ```
    pub fn short_response(expected: usize, received: usize) -> Self {
        Self::ShortResponse { expected, received }
    }

    /// Creates a new `ShortPayload` error.
    pub fn short_payload(required: usize, available: usize) -> Self {
        Self::ShortPayload {
            required,
            available,
        }
    }

    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use siemens_s7::S7Error;
    ///
    /// let err = S7Error::invalid_parameter("rack", "TSAP exceeds 16 bits");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}
