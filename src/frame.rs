//! S7 request frames and handshake response validation.
//!
//! Every request sent by the client is one of three fixed-layout frames. Each
//! frame is a constant template plus a short list of 16-bit big-endian
//! substitutions, rendered into a fresh array per call.
//!
//! # Frame Layouts
//!
//! | Frame | Size | Variable bytes |
//! |-------|------|----------------|
//! | Connection request (ISO-on-TCP) | 22 | 20-21: remote TSAP |
//! | PDU negotiation | 25 | none |
//! | Read data block | 31 | 23-24: count, 25-26: DB number |
//!
//! # Example
//!
//! ```
//! use siemens_s7::frame::{build_read_frame, build_upgrade_frame};
//!
//! let upgrade = build_upgrade_frame(0, 1).unwrap();
//! assert_eq!(&upgrade[20..], &[0x01, 0x01]);
//!
//! let read = build_read_frame(10, 0, 4);
//! assert_eq!(&read[23..27], &[0x00, 0x04, 0x00, 0x0A]);
//! ```

use crate::error::{Result, S7Error};

/// Size of the connection request frame.
pub const UPGRADE_FRAME_SIZE: usize = 22;
/// Size of the PDU negotiation frame.
pub const NEGOTIATE_FRAME_SIZE: usize = 25;
/// Size of the read request frame.
pub const READ_FRAME_SIZE: usize = 31;

/// Exact length of a connection confirm.
pub const UPGRADE_RESPONSE_SIZE: usize = 22;
/// Exact length of a PDU negotiation response.
pub const NEGOTIATE_RESPONSE_SIZE: usize = 27;

/// COTP PDU type of a connection confirm.
const CONNECTION_CONFIRM: u8 = 0xD0;

const TSAP_OFFSET: usize = 20;
const COUNT_OFFSET: usize = 23;
const DB_NUMBER_OFFSET: usize = 25;

const UPGRADE_PDU_TYPE_INDEX: usize = 5;
const NEGOTIATE_ERROR_CLASS_INDEX: usize = 17;
const NEGOTIATE_ERROR_CODE_INDEX: usize = 18;
const NEGOTIATE_PDU_LENGTH_INDEX: usize = 25;

const UPGRADE_TEMPLATE: [u8; UPGRADE_FRAME_SIZE] = [
    0x03, 0x00, 0x00, 0x16, // TPKT
    0x11, 0xE0, 0x00, 0x00, 0x00, 0x01, 0x00, // COTP connection request
    0xC0, 0x01, 0x0A, // TPDU size
    0xC1, 0x02, 0x01, 0x00, // local TSAP
    0xC2, 0x02, 0x00, 0x00, // remote TSAP
];

const NEGOTIATE_FRAME: [u8; NEGOTIATE_FRAME_SIZE] = [
    0x03, 0x00, 0x00, 0x19, // TPKT
    0x02, 0xF0, 0x80, // COTP data
    0x32, 0x01, 0x00, 0x00, 0x04, 0x00, 0x00, 0x08, 0x00, 0x00, // S7 job header
    0xF0, 0x00, 0x00, 0x01, 0x00, 0x01, 0x01, 0xE0, // setup communication, PDU 480
];

const READ_TEMPLATE: [u8; READ_FRAME_SIZE] = [
    0x03, 0x00, 0x00, 0x1F, // TPKT
    0x02, 0xF0, 0x80, // COTP data
    0x32, 0x01, 0x00, 0x00, 0x05, 0x00, 0x00, 0x0E, 0x00, 0x00, // S7 job header
    0x04, 0x01, // read var, 1 item
    0x12, 0x0A, 0x10, 0x02, // item spec, transport size BYTE
    0x00, 0x00, // count
    0x00, 0x00, // DB number
    0x84, // area DB
    0x00, 0x00, 0x00, // address
];

/// Renders a template by writing each `(offset, value)` pair big-endian into a copy.
fn render<const N: usize>(template: &[u8; N], fields: &[(usize, u16)]) -> [u8; N] {
    let mut frame = *template;
    for &(offset, value) in fields {
        frame[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }
    frame
}

/// Computes the remote TSAP for a rack and slot: `0x0100 + (rack << 5) + slot`.
///
/// # Errors
///
/// Returns `S7Error::InvalidParameter` if the result does not fit in 16 bits.
///
/// # Example
///
/// ```
/// use siemens_s7::frame::tsap;
///
/// assert_eq!(tsap(0, 2).unwrap(), 0x0102);
/// assert_eq!(tsap(1, 2).unwrap(), 0x0122);
/// ```
pub fn tsap(rack: u16, slot: u16) -> Result<u16> {
    let value = 0x0100u32 + (u32::from(rack) << 5) + u32::from(slot);
    u16::try_from(value).map_err(|_| {
        S7Error::invalid_parameter(
            "rack/slot",
            format!(
                "TSAP 0x{:X} for rack {} slot {} exceeds 16 bits",
                value, rack, slot
            ),
        )
    })
}

/// Builds the ISO-on-TCP connection request for a rack and slot.
///
/// # Errors
///
/// Returns `S7Error::InvalidParameter` if rack and slot overflow the TSAP.
pub fn build_upgrade_frame(rack: u16, slot: u16) -> Result<[u8; UPGRADE_FRAME_SIZE]> {
    let tsap = tsap(rack, slot)?;
    Ok(render(&UPGRADE_TEMPLATE, &[(TSAP_OFFSET, tsap)]))
}

/// Builds the PDU negotiation request.
pub fn build_negotiate_frame() -> [u8; NEGOTIATE_FRAME_SIZE] {
    NEGOTIATE_FRAME
}

/// Builds a read request for `count` bytes of data block `block_number`.
///
/// `start_address` is accepted but not encoded: the request always starts at
/// byte 0 of the block.
pub fn build_read_frame(
    block_number: u16,
    _start_address: u32,
    count: u16,
) -> [u8; READ_FRAME_SIZE] {
    render(
        &READ_TEMPLATE,
        &[(COUNT_OFFSET, count), (DB_NUMBER_OFFSET, block_number)],
    )
}

/// Validates a connection confirm.
///
/// # Errors
///
/// - `S7Error::ShortResponse` if the response is not exactly 22 bytes
/// - `S7Error::UpgradeRejected` if byte 5 is not the connection confirm type
pub fn check_upgrade_response(response: &[u8]) -> Result<()> {
    if response.len() != UPGRADE_RESPONSE_SIZE {
        return Err(S7Error::short_response(
            UPGRADE_RESPONSE_SIZE,
            response.len(),
        ));
    }
    let code = response[UPGRADE_PDU_TYPE_INDEX];
    if code != CONNECTION_CONFIRM {
        return Err(S7Error::UpgradeRejected { code });
    }
    Ok(())
}

/// Validates a PDU negotiation response and returns the PDU length granted
/// by the device.
///
/// # Errors
///
/// - `S7Error::ShortResponse` if the response is not exactly 27 bytes
/// - `S7Error::NegotiationRejected` if the error class or code is non-zero
pub fn check_negotiate_response(response: &[u8]) -> Result<u16> {
    if response.len() != NEGOTIATE_RESPONSE_SIZE {
        return Err(S7Error::short_response(
            NEGOTIATE_RESPONSE_SIZE,
            response.len(),
        ));
    }
    let error_class = response[NEGOTIATE_ERROR_CLASS_INDEX];
    let error_code = response[NEGOTIATE_ERROR_CODE_INDEX];
    if error_class != 0x00 || error_code != 0x00 {
        return Err(S7Error::NegotiationRejected {
            error_class,
            error_code,
        });
    }
    Ok(u16::from_be_bytes([
        response[NEGOTIATE_PDU_LENGTH_INDEX],
        response[NEGOTIATE_PDU_LENGTH_INDEX + 1],
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn connection_confirm() -> Vec<u8> {
        hex::decode("0300001611d00001000100c0010ac1020100c2020102").unwrap()
    }

    fn negotiate_ack() -> Vec<u8> {
        hex::decode("0300001b02f080320300000400000800000000f0000001000100f0").unwrap()
    }

    #[test]
    fn test_upgrade_frame_rack0_slot0() {
        let frame = build_upgrade_frame(0, 0).unwrap();
        assert_eq!(frame.len(), UPGRADE_FRAME_SIZE);
        assert_eq!(&frame[20..22], &[0x01, 0x00]);
    }

    #[test]
    fn test_upgrade_frame_rack1_slot2() {
        let frame = build_upgrade_frame(1, 2).unwrap();
        assert_eq!(&frame[20..22], &[0x01, 0x22]);
    }

    #[test]
    fn test_upgrade_frame_serialization() {
        let frame = build_upgrade_frame(0, 2).unwrap();
        assert_eq!(
            hex::encode(frame),
            "0300001611e00000000100c0010ac1020100c2020102"
        );
    }

    #[test]
    fn test_upgrade_frame_does_not_alias_template() {
        let first = build_upgrade_frame(3, 4).unwrap();
        let second = build_upgrade_frame(0, 0).unwrap();
        assert_eq!(&first[20..22], &[0x01, 0x64]);
        assert_eq!(&second[20..22], &[0x01, 0x00]);
        assert_eq!(&UPGRADE_TEMPLATE[20..22], &[0x00, 0x00]);
    }

    #[test]
    fn test_tsap_overflow_rejected() {
        let err = tsap(0x07FF, 0x00FF).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err = build_upgrade_frame(0, 0xFFFF).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_tsap_upper_bound() {
        // 0x0100 + (0x07F7 << 5) + 0x1F = 0xFFFF
        assert_eq!(tsap(0x07F7, 0x1F).unwrap(), 0xFFFF);
    }

    #[test]
    fn test_negotiate_frame_serialization() {
        let frame = build_negotiate_frame();
        assert_eq!(
            hex::encode(frame),
            "0300001902f08032010000040000080000f0000001000101e0"
        );
    }

    #[test]
    fn test_read_frame_serialization() {
        let frame = build_read_frame(0x0102, 0, 0x0304);
        assert_eq!(frame.len(), READ_FRAME_SIZE);
        assert_eq!(
            hex::encode(frame),
            "0300001f02f080320100000500000e00000401120a10020304010284000000"
        );
    }

    #[test]
    fn test_read_frame_ignores_start_address() {
        assert_eq!(build_read_frame(7, 0, 16), build_read_frame(7, 1234, 16));
    }

    #[test]
    fn test_check_upgrade_response() {
        assert!(check_upgrade_response(&connection_confirm()).is_ok());
    }

    #[test]
    fn test_check_upgrade_response_wrong_length() {
        let err = check_upgrade_response(&connection_confirm()[..21]).unwrap_err();
        assert!(matches!(
            err,
            S7Error::ShortResponse {
                expected: 22,
                received: 21
            }
        ));
    }

    #[test]
    fn test_check_upgrade_response_rejected() {
        let mut response = connection_confirm();
        response[5] = 0x80;
        let err = check_upgrade_response(&response).unwrap_err();
        assert!(matches!(err, S7Error::UpgradeRejected { code: 0x80 }));
    }

    #[test]
    fn test_check_negotiate_response() {
        assert_eq!(check_negotiate_response(&negotiate_ack()).unwrap(), 0x00F0);
    }

    #[test]
    fn test_check_negotiate_response_wrong_length() {
        let err = check_negotiate_response(&negotiate_ack()[..26]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShortResponse);
    }

    #[test]
    fn test_check_negotiate_response_rejected() {
        let mut response = negotiate_ack();
        response[17] = 0x81;
        response[18] = 0x04;
        let err = check_negotiate_response(&response).unwrap_err();
        assert!(matches!(
            err,
            S7Error::NegotiationRejected {
                error_class: 0x81,
                error_code: 0x04
            }
        ));

        let mut response = negotiate_ack();
        response[18] = 0x01;
        let err = check_negotiate_response(&response).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NegotiationRejected);
    }
}
