//! Frame Protocol
//!
//! ```text
//! +----------------+----------------+------------------------------------------+
//! | Length (4)     | Checksum (4)   | JSON Payload (variable)                  |
//! | big-endian u32 | CRC32, BE      | GameIntent or GameMessage                |
//! +----------------+----------------+------------------------------------------+
//! ```
//!
//! Length counts the payload only. The length is checked against
//! [`MAX_FRAME_SIZE`] before anything is buffered for it.

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::TransportError;

/// Maximum payload size (1 MiB). Snapshots are a few KiB at most.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

const HEADER_SIZE: usize = 8;

fn header(bytes: &[u8]) -> (usize, u32) {
    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let checksum = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    (len, checksum)
}

fn check_len(len: usize) -> Result<(), TransportError> {
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(())
}

fn parse_payload<T: DeserializeOwned>(payload: &[u8], expected: u32) -> Result<T, TransportError> {
    let actual = crc32fast::hash(payload);
    if actual != expected {
        return Err(TransportError::ChecksumMismatch { expected, actual });
    }
    serde_json::from_slice(payload).map_err(|e| TransportError::SerializationError(e.to_string()))
}

/// Encode a message into one frame
///
/// # Errors
///
/// Fails if serialization fails or the payload is larger than
/// [`MAX_FRAME_SIZE`].
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, TransportError> {
    let json =
        serde_json::to_vec(msg).map_err(|e| TransportError::SerializationError(e.to_string()))?;
    check_len(json.len())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + json.len());
    buf.extend_from_slice(&(json.len() as u32).to_be_bytes());
    buf.extend_from_slice(&crc32fast::hash(&json).to_be_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Write one frame and flush
///
/// # Errors
///
/// Encoding or IO failure.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read exactly one frame
///
/// # Errors
///
/// [`TransportError::ConnectionClosed`] on a clean EOF before a header,
/// otherwise IO, size, checksum or JSON failures.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut head = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut head).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let (len, checksum) = header(&head);
    check_len(len)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    parse_payload(&payload, checksum)
}

/// Incremental decoder for frames arriving in arbitrary chunks
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes buffered but not yet decoded
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Decode the next complete frame
    ///
    /// `Ok(None)` means more data is needed. A frame that fails its checksum
    /// or JSON parse is consumed, so the caller may keep decoding.
    ///
    /// # Errors
    ///
    /// Oversized, corrupted or unparseable frames.
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<Option<T>, TransportError> {
        if self.buffer.len() < HEADER_SIZE {
            return Ok(None);
        }
        let (len, checksum) = header(&self.buffer);
        check_len(len)?;
        if self.buffer.len() < HEADER_SIZE + len {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buffer.drain(..HEADER_SIZE + len).collect();
        parse_payload(&frame[HEADER_SIZE..], checksum).map(Some)
    }
}
