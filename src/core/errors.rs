/*!
 * Error Types
 * Centralized error handling with thiserror and serde support
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-fatal wire protocol errors
///
/// Any of these terminates the connection: the reader loop logs the error
/// and tears the engine down.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProtocolError {
    #[error("Invalid packet header ({0} bytes read)")]
    ShortHeader(usize),

    #[error("Invalid size field ({0})")]
    BadSizeField(u32),

    #[error("Packet body of {size} bytes exceeds maximum of {max}")]
    Oversized { size: usize, max: usize },

    #[error("Invalid packet body ({got} of {expected} bytes read)")]
    ShortBody { expected: usize, got: usize },

    #[error("Unknown packet kind {0}")]
    UnknownKind(u8),

    #[error("Short write ({wrote} of {expected} bytes)")]
    ShortWrite { expected: usize, wrote: usize },
}

/// Bounded codec failures
///
/// Raised by `PacketWriter` when an append would exceed the configured
/// maximum. Recoverable: nothing is partially appended.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum CodecError {
    #[error("Write of {requested} bytes exceeds packet maximum of {max}")]
    Overflow { requested: usize, max: usize },
}
