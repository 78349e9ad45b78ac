//! Terminal socket seam
//!
//! Opening a socket is non-blocking: [`Transport::open`] returns a handle
//! at once and reports the outcome later as [`SocketEvent`]s tagged with
//! the [`ConnectionId`] it was given.
//!
//! [`SocketEvent`]: crate::event::SocketEvent

use reqwest::Url;

use htd_core::error::ConnectionError;
use htd_core::ConnectionId;

/// Write side of one open (or opening) socket
pub trait Socket: Send {
    /// Queue one text frame
    fn send(&mut self, text: String) -> Result<(), ConnectionError>;

    /// Start closing the socket. Safe to call more than once.
    fn close(&mut self);
}

/// Opens terminal sockets
pub trait Transport: Send {
    /// Request a socket to `url`; events for it will carry `id`
    fn open(&mut self, id: ConnectionId, url: &Url) -> Result<Box<dyn Socket>, ConnectionError>;
}
