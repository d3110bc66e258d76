use crate::measurement::Measurement;

use super::error::DecodeError;
use super::protocol::WireProtocol;
use super::{HEADER, fixed, json};

/// Reassembles frames from an arbitrarily-chunked byte stream.
///
/// A socket read may deliver a fraction of a frame or several frames at
/// once; callers [`extend`](Self::extend) the buffer with whatever arrived
/// and drain decoded measurements with [`next_frame`](Self::next_frame).
///
/// A decode failure consumes the faulty frame's bytes and resynchronises to
/// the next header candidate, so one corrupt frame never poisons the rest of
/// the stream.
#[derive(Debug)]
pub struct FrameAssembler {
    protocol: WireProtocol,
    buffer: Vec<u8>,
}

impl FrameAssembler {
    pub fn new(protocol: WireProtocol) -> Self {
        Self {
            protocol,
            buffer: Vec::with_capacity(256),
        }
    }

    pub fn protocol(&self) -> WireProtocol {
        self.protocol
    }

    /// Appends bytes received from the socket.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes buffered towards the next frame. Non-zero across a read timeout
    /// means the peer stalled mid-frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discards any partial frame, e.g. before a reconnect.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Pops at most one frame. `Ok(None)` means more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Measurement>, DecodeError> {
        if self.buffer.len() < HEADER.len() {
            return Ok(None);
        }

        if self.buffer[..HEADER.len()] != HEADER {
            let bad = [self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]];
            self.resync();
            return Err(DecodeError::InvalidHeader(bad));
        }

        let total = match self.protocol {
            WireProtocol::Fixed => fixed::FRAME_LEN,
            WireProtocol::Json => {
                if self.buffer.len() < HEADER.len() + 2 {
                    return Ok(None);
                }
                let declared = u16::from_be_bytes([self.buffer[4], self.buffer[5]]) as usize;
                if declared > json::MAX_PAYLOAD_LEN {
                    self.resync();
                    return Err(DecodeError::PayloadTooLarge(declared));
                }
                json::MIN_FRAME_LEN + declared
            }
        };

        if self.buffer.len() < total {
            return Ok(None);
        }

        let result = match self.protocol {
            WireProtocol::Fixed => fixed::decode(&self.buffer[..total]),
            WireProtocol::Json => json::decode(&self.buffer[..total]),
        };
        self.buffer.drain(..total);

        result.map(Some)
    }

    /// Drops bytes up to the next plausible header start.
    fn resync(&mut self) {
        match self.buffer.iter().skip(1).position(|&b| b == HEADER[0]) {
            Some(offset) => {
                self.buffer.drain(..offset + 1);
            }
            None => self.buffer.clear(),
        }
    }
}
