//! Length-prefixed message framing.
//!
//! A frame is a 4-byte little-endian payload length followed by exactly
//! that many bytes of JSON-serialized [`Message`]. The daemon reads frames
//! asynchronously; the CLI client reads them over a blocking stream, so
//! both flavours of decode live here.

use crate::protocol::Message;
use std::io::Read;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the length header, in bytes.
const HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum CodecError {
    /// The serialized message cannot be represented on the wire.
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// The stream closed or faulted before a complete frame arrived.
    #[error("failed to read frame: {0}")]
    Framing(String),

    /// A complete frame arrived but its payload is not a well-formed message.
    #[error("failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CodecError {
    /// Whether this error is a clean end-of-stream before any frame data,
    /// i.e. the peer simply hung up between requests.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, CodecError::Framing(msg) if msg == CLEAN_CLOSE)
    }
}

const CLEAN_CLOSE: &str = "stream closed";

/// Encode a message into a single wire frame.
pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    let body = serde_json::to_vec(message).map_err(|e| CodecError::Encode(e.to_string()))?;

    let len = u32::try_from(body.len())
        .map_err(|_| CodecError::Encode("message too long for a 4-byte length header".into()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&body);

    Ok(frame)
}

/// Parse a frame payload once fully collected.
fn decode_payload(payload: &[u8]) -> Result<Message, CodecError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Read one frame from an async stream.
///
/// A clean close before the first header byte yields a `Framing` error for
/// which [`CodecError::is_clean_close`] returns true; a close mid-frame is
/// a genuine fault.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let mut read = 0;
    while read < HEADER_LEN {
        match reader.read(&mut header[read..]).await {
            Ok(0) if read == 0 => return Err(CodecError::Framing(CLEAN_CLOSE.into())),
            Ok(0) => {
                return Err(CodecError::Framing(format!(
                    "stream closed after {read} of {HEADER_LEN} header bytes"
                )));
            }
            Ok(n) => read += n,
            Err(e) => return Err(CodecError::Framing(e.to_string())),
        }
    }

    let len = u32::from_le_bytes(header) as usize;
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| CodecError::Framing(format!("short payload (wanted {len} bytes): {e}")))?;

    decode_payload(&payload)
}

/// Read one frame from a blocking stream. Used by the CLI client.
pub fn read_message_blocking<R: Read>(reader: &mut R) -> Result<Message, CodecError> {
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .map_err(|e| CodecError::Framing(format!("short header: {e}")))?;

    let len = u32::from_le_bytes(header) as usize;
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .map_err(|e| CodecError::Framing(format!("short payload (wanted {len} bytes): {e}")))?;

    decode_payload(&payload)
}
