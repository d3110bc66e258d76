pub mod codec;
pub mod measurement;

pub use codec::{DecodeError, FrameAssembler, WireProtocol};
pub use measurement::{Measurement, SensorKind};
