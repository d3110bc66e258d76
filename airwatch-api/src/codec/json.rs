//! Length-prefixed JSON framing, the secondary protocol:
//!
//! ```text
//! Header(4) | uint16be length | length bytes of UTF-8 JSON | Checksum(1)
//! ```
//!
//! The payload is the serde form of [`Measurement`]; the checksum covers the
//! payload bytes only, same rule as the fixed framing.

use crate::measurement::Measurement;

use super::error::DecodeError;
use super::{HEADER, checksum};

/// Length prefix plus header plus checksum; the smallest possible frame.
pub const MIN_FRAME_LEN: usize = HEADER.len() + 2 + 1;

/// Upper bound on the declared payload length. The real payload is well
/// under 100 bytes; anything larger is a corrupt or hostile length prefix.
pub const MAX_PAYLOAD_LEN: usize = 4096;

/// Encodes a measurement into one length-prefixed frame.
pub fn encode(measurement: &Measurement) -> Vec<u8> {
    let payload =
        serde_json::to_vec(measurement).expect("a measurement is always JSON-serializable");

    let mut frame = Vec::with_capacity(MIN_FRAME_LEN + payload.len());
    frame.extend_from_slice(&HEADER);
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(&payload);
    frame.push(checksum(&payload));

    frame
}

/// Decodes one length-prefixed frame.
pub fn decode(data: &[u8]) -> Result<Measurement, DecodeError> {
    if data.len() < MIN_FRAME_LEN {
        return Err(DecodeError::InvalidLength {
            expected: MIN_FRAME_LEN,
            actual: data.len(),
        });
    }

    if data[..HEADER.len()] != HEADER {
        return Err(DecodeError::InvalidHeader([
            data[0], data[1], data[2], data[3],
        ]));
    }

    let declared = u16::from_be_bytes([data[4], data[5]]) as usize;
    if declared > MAX_PAYLOAD_LEN {
        return Err(DecodeError::PayloadTooLarge(declared));
    }

    let total = MIN_FRAME_LEN + declared;
    if data.len() != total {
        return Err(DecodeError::InvalidLength {
            expected: total,
            actual: data.len(),
        });
    }

    let payload = &data[6..6 + declared];
    let carried = data[total - 1];
    let computed = checksum(payload);
    if computed != carried {
        return Err(DecodeError::ChecksumMismatch { computed, carried });
    }

    serde_json::from_slice(payload).map_err(|e| DecodeError::InvalidPayload(e.to_string()))
}
