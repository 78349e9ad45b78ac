//! Events consumed by the session event loop

use tokio::sync::mpsc;

use htd_core::error::DirectoryError;
use htd_core::{ConnectionId, Machine};

/// Everything that can change session state.
///
/// Producers (timers, pollers, socket tasks, the front end) only post
/// events; the loop owning the [`AuthGate`](crate::gate::AuthGate) applies
/// them one at a time.
#[derive(Debug)]
pub enum Event {
    /// Session clock tick from the run identified by `generation`
    ClockTick { generation: u64 },

    /// Machine list fetch finished for the poll run identified by `generation`
    Directory {
        generation: u64,
        result: Result<Vec<Machine>, DirectoryError>,
    },

    /// Something happened on a terminal socket
    Socket(SocketEvent),

    /// Local keystrokes or paste
    Input(String),

    /// The local viewport changed size
    ViewportResized,

    /// Operator selected a machine (id or name)
    Attach(String),

    /// Operator asked to drop the current attachment
    Detach,

    /// Operator asked to log out
    Logout,
}

/// A socket event tagged with the connection it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEvent {
    /// Connection the event was raised on
    pub connection: ConnectionId,
    /// What happened
    pub kind: SocketEventKind,
}

impl SocketEvent {
    /// Create a socket event
    pub fn new(connection: ConnectionId, kind: SocketEventKind) -> Self {
        Self { connection, kind }
    }
}

/// Socket events, one per underlying transport callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEventKind {
    /// Handshake completed
    Opened,
    /// One text frame arrived
    Message(String),
    /// Transport reported a fault; a close may or may not follow
    Error(String),
    /// The proxy refused the token during the handshake (HTTP 401)
    Unauthorized,
    /// Socket is closed (by either side or by failure)
    Closed,
}

/// Sending half of the event channel
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Receiving half of the event channel
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Create the event channel
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
