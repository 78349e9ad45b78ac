//! JSON text codec for protocol frames
//!
//! One frame per WebSocket text message. Decoding is lenient about frame
//! tags (unknown tags decode to `ServerFrame::Unknown`) but strict about
//! shape: a known tag with missing fields is an error.

use crate::error::ProtocolError;
use crate::message::{ClientFrame, ServerFrame};

/// Largest text frame accepted by the decoder (16MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encode a client frame as a JSON text message
pub fn encode_client(frame: &ClientFrame) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(frame)?)
}

/// Decode a server frame
pub fn decode_server(text: &str) -> Result<ServerFrame, ProtocolError> {
    check_size(text)?;
    let frame: ServerFrame = serde_json::from_str(text)?;
    if matches!(frame, ServerFrame::Unknown) {
        tracing::trace!("Decoded frame with unknown type tag");
    }
    Ok(frame)
}

fn check_size(text: &str) -> Result<(), ProtocolError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: text.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(())
}
