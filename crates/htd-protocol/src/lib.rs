//! htd-protocol: Terminal socket frame protocol for holdthedoor
//!
//! This crate defines the tagged JSON frames exchanged between the client
//! and the terminal proxy over a persistent WebSocket. Each text message
//! carries exactly one frame.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{decode_server, encode_client, MAX_FRAME_SIZE};
pub use error::ProtocolError;
pub use message::{ClientFrame, FrameType, ServerFrame, TerminalSize};
