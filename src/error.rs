//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::hal::{ClockError, IoError};
use crate::protocol::{DecodeError, EncodeError};
use crate::types::TimeError;

/// Errors surfaced by the engine's public API.
///
/// Malformed network input never appears here — decode failures are
/// handled inside the engine by dropping the packet. What does appear
/// is what the hosting application must act on: configuration
/// rejection at startup and hardware failures that latched the port
/// into `Faulty`.
#[derive(Debug, Error)]
pub enum PtpError {
    /// Configuration rejected at startup or reconfiguration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A hardware clock operation failed; the port is now `Faulty`.
    #[error("clock hardware error: {0}")]
    Clock(#[from] ClockError),

    /// A transmit operation failed; the port is now `Faulty`.
    #[error("transport error: {0}")]
    Io(#[from] IoError),

    /// Outbound message did not fit the transmit buffer.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Time arithmetic left the representable range.
    #[error("time error: {0}")]
    Time(#[from] TimeError),

    /// Inbound message was rejected by the codec.
    ///
    /// Only produced by the standalone codec API; the engine handles
    /// these internally.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}
