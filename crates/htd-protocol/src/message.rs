//! Frame types for the holdthedoor terminal protocol
//!
//! Every frame is a JSON object tagged by its `type` field. The client
//! sends `input` and `resize`; the proxy sends `output` and `error`.
//!
//! # Message Flow
//!
//! 1. Client opens the socket for one machine
//! 2. Client sends `resize` with its current geometry as soon as the socket opens
//! 3. `input` and `output` frames flow until either side closes
//! 4. `resize` is re-sent on every viewport change
//! 5. `error` frames may arrive at any time and do not end the session
//!
//! Resizes are never acknowledged. A burst of resizes may be applied out of
//! order on the far side; the displayed geometry converges on the last one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Number of columns
    pub cols: u16,
    /// Number of rows
    pub rows: u16,
}

impl TerminalSize {
    /// Create a new terminal size
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Default terminal size (80x24)
    pub fn default_size() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self::default_size()
    }
}

impl fmt::Display for TerminalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Frame type identifier, as it appears in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Keystrokes or pasted text (client → proxy)
    Input,
    /// Terminal geometry (client → proxy)
    Resize,
    /// Shell output (proxy → client)
    Output,
    /// Human-readable fault (proxy → client)
    Error,
    /// Any tag this client does not understand
    Unknown,
}

impl FrameType {
    /// Wire name of the frame type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Resize => "resize",
            Self::Output => "output",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frames sent from the client to the terminal proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Raw keystroke/paste data for the remote shell
    Input { data: String },

    /// Current terminal geometry
    Resize { cols: u16, rows: u16 },
}

impl ClientFrame {
    /// Wrap local input
    pub fn input(data: impl Into<String>) -> Self {
        Self::Input { data: data.into() }
    }

    /// Build a resize frame from a terminal size
    pub fn resize(size: TerminalSize) -> Self {
        Self::Resize {
            cols: size.cols,
            rows: size.rows,
        }
    }

    /// Get the frame type
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Input { .. } => FrameType::Input,
            Self::Resize { .. } => FrameType::Resize,
        }
    }
}

/// Frames sent from the terminal proxy to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Raw bytes produced by the remote shell
    Output { data: String },

    /// Fault message rendered inline; the connection stays open
    Error { data: String },

    /// Frame with a tag this client does not know
    #[serde(other)]
    Unknown,
}

impl ServerFrame {
    /// Get the frame type
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Output { .. } => FrameType::Output,
            Self::Error { .. } => FrameType::Error,
            Self::Unknown => FrameType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_size_default() {
        let size = TerminalSize::default();
        assert_eq!(size.cols, 80);
        assert_eq!(size.rows, 24);
        assert_eq!(size.to_string(), "80x24");
    }

    #[test]
    fn test_resize_from_size() {
        let frame = ClientFrame::resize(TerminalSize::new(132, 43));
        assert_eq!(frame, ClientFrame::Resize { cols: 132, rows: 43 });
        assert_eq!(frame.frame_type(), FrameType::Resize);
    }

    #[test]
    fn test_frame_type_names() {
        assert_eq!(ClientFrame::input("x").frame_type().as_str(), "input");
        assert_eq!(
            ServerFrame::Error { data: "x".into() }.frame_type().as_str(),
            "error"
        );
        assert_eq!(ServerFrame::Unknown.frame_type().to_string(), "unknown");
    }
}
