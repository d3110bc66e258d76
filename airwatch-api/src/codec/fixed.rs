//! Fixed 12-byte binary framing, the node's native format:
//!
//! ```text
//! ┌───────────┬──────────────┬───────────────┬────────────┬──────────┬─────────────┐
//! │ Header(4) │ int16be t*10 │ uint16be h*10 │ uint16be   │ uint8    │ Checksum(1) │
//! │ AABBCCDD  │ temperature  │ humidity      │ pm25 µg/m³ │ noise dB │ sum & 0xFF  │
//! └───────────┴──────────────┴───────────────┴────────────┴──────────┴─────────────┘
//! ```

use crate::measurement::Measurement;

use super::error::DecodeError;
use super::{HEADER, checksum};

/// Total frame length on the wire.
pub const FRAME_LEN: usize = 12;

const PAYLOAD_START: usize = HEADER.len();
const PAYLOAD_END: usize = FRAME_LEN - 1;

/// Encodes a measurement into one wire frame.
pub fn encode(measurement: &Measurement) -> [u8; FRAME_LEN] {
    let temperature = (measurement.temperature * 10.0).round() as i16;
    let humidity = (measurement.humidity * 10.0).round() as u16;

    let mut frame = [0u8; FRAME_LEN];
    frame[..PAYLOAD_START].copy_from_slice(&HEADER);
    frame[4..6].copy_from_slice(&temperature.to_be_bytes());
    frame[6..8].copy_from_slice(&humidity.to_be_bytes());
    frame[8..10].copy_from_slice(&measurement.pm25.to_be_bytes());
    frame[10] = measurement.noise;
    frame[11] = checksum(&frame[PAYLOAD_START..PAYLOAD_END]);

    frame
}

/// Decodes one wire frame.
///
/// Validates length, header and checksum before parsing; a failed check
/// rejects the whole frame.
pub fn decode(data: &[u8]) -> Result<Measurement, DecodeError> {
    if data.len() != FRAME_LEN {
        return Err(DecodeError::InvalidLength {
            expected: FRAME_LEN,
            actual: data.len(),
        });
    }

    if data[..PAYLOAD_START] != HEADER {
        return Err(DecodeError::InvalidHeader([
            data[0], data[1], data[2], data[3],
        ]));
    }

    let payload = &data[PAYLOAD_START..PAYLOAD_END];
    let computed = checksum(payload);
    if computed != data[PAYLOAD_END] {
        return Err(DecodeError::ChecksumMismatch {
            computed,
            carried: data[PAYLOAD_END],
        });
    }

    Ok(Measurement {
        temperature: i16::from_be_bytes([payload[0], payload[1]]) as f32 / 10.0,
        humidity: u16::from_be_bytes([payload[2], payload[3]]) as f32 / 10.0,
        pm25: u16::from_be_bytes([payload[4], payload[5]]),
        noise: payload[6],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Measurement {
        Measurement {
            temperature: 25.0,
            humidity: 60.5,
            pm25: 50,
            noise: 75,
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let original = sample();
        let frame = encode(&original);
        assert_eq!(decode(&frame).unwrap(), original);
    }

    #[test]
    fn negative_temperature_roundtrip() {
        let original = Measurement {
            temperature: -12.7,
            humidity: 80.0,
            pm25: 0,
            noise: 30,
        };
        assert_eq!(decode(&encode(&original)).unwrap(), original);
    }

    #[test]
    fn frame_layout_is_big_endian() {
        let frame = encode(&sample());
        assert_eq!(&frame[..4], &HEADER);
        // 25.0°C → 250, 60.5% → 605
        assert_eq!(&frame[4..6], &250i16.to_be_bytes());
        assert_eq!(&frame[6..8], &605u16.to_be_bytes());
        assert_eq!(&frame[8..10], &50u16.to_be_bytes());
        assert_eq!(frame[10], 75);
        assert_eq!(frame[11], checksum(&frame[4..11]));
    }

    #[test]
    fn rejects_wrong_length() {
        let frame = encode(&sample());
        assert_eq!(
            decode(&frame[..11]),
            Err(DecodeError::InvalidLength {
                expected: FRAME_LEN,
                actual: 11
            })
        );
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn rejects_bad_header() {
        let mut frame = encode(&sample());
        frame[0] = 0xAB;
        assert!(matches!(
            decode(&frame),
            Err(DecodeError::InvalidHeader(_))
        ));
    }

    #[test]
    fn any_flipped_payload_byte_fails_the_checksum() {
        let frame = encode(&sample());
        for index in 4..11 {
            let mut corrupted = frame;
            corrupted[index] ^= 0x01;
            assert!(
                matches!(
                    decode(&corrupted),
                    Err(DecodeError::ChecksumMismatch { .. })
                ),
                "flip at byte {index} went undetected"
            );
        }
    }

    #[test]
    fn flipped_checksum_byte_is_detected() {
        let mut frame = encode(&sample());
        frame[11] ^= 0xFF;
        assert!(matches!(
            decode(&frame),
            Err(DecodeError::ChecksumMismatch { .. })
        ));
    }
}
