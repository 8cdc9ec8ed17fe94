//! Surface Transport
//!
//! Carries [`GameIntent`](crate::events::GameIntent)s from a remote surface to
//! the controller and [`GameMessage`](crate::messages::GameMessage)s back,
//! as checksummed JSON frames over any byte stream (the daemon uses Unix
//! domain sockets).

pub mod frame;

pub use frame::{encode, read_frame, write_frame, FrameDecoder, MAX_FRAME_SIZE};

use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Peer closed the stream
    #[error("Connection closed")]
    ConnectionClosed,

    /// Message serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Declared frame length exceeds [`MAX_FRAME_SIZE`]
    #[error("Frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared size
        size: usize,
        /// Allowed size
        max: usize,
    },

    /// Frame checksum mismatch - data corruption detected
    #[error("Checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Expected checksum value
        expected: u32,
        /// Actual checksum value received
        actual: u32,
    },

    /// IO error from the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
