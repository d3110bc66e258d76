/// Frame decode failures.
///
/// Decoding is total over any byte slice: malformed input always yields one
/// of these variants, never a panic or a partially-populated measurement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid header {0:02X?}")]
    InvalidHeader([u8; 4]),

    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("declared payload length {0} exceeds the frame size limit")]
    PayloadTooLarge(usize),

    #[error("checksum mismatch: computed {computed:#04X}, frame carries {carried:#04X}")]
    ChecksumMismatch { computed: u8, carried: u8 },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
