//! Terminal connection manager
//!
//! At most one terminal socket exists at any time. Selecting a new machine
//! closes the current socket and disposes its renderer before the next
//! socket is requested.
//!
//! # States
//!
//! ```text
//! Idle ──attach──▶ Connecting ──opened──▶ Attached
//!   ▲                  │                     │
//!   └──closed/detach───┴──────(Closing)──────┘
//! ```
//!
//! Every socket gets its own [`ConnectionId`]. Events raised on a socket
//! that has since been replaced are dropped, so a late close from the old
//! machine never tears down the new attachment.

use std::fmt;

use htd_core::error::ConnectionError;
use htd_core::{ConnectionId, ConnectionState, Credential, Machine, MachineId};
use htd_protocol::{codec, ClientFrame, ServerFrame, TerminalSize};

use crate::endpoint::Endpoints;
use crate::event::{SocketEvent, SocketEventKind};
use crate::renderer::{Renderer, RendererFactory};
use crate::transport::{Socket, Transport};

/// Operator-facing connection status
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// Nothing to report
    #[default]
    None,
    /// Socket requested for the named machine
    Connecting(String),
    /// Attached to the named machine
    Connected(String),
    /// Socket closed
    Disconnected,
    /// Socket reported a fault
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::None => Ok(()),
            Status::Connecting(name) => write!(f, "connecting to {}", name),
            Status::Connected(name) => write!(f, "connected to {}", name),
            Status::Disconnected => write!(f, "disconnected"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// What a socket event did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOutcome {
    /// Applied to the current connection
    Applied,
    /// Raised on a replaced or closed socket
    Ignored,
    /// The proxy refused the credential; the caller must log out
    CredentialRejected,
}

/// Live socket state
enum Link {
    Idle,
    Connecting {
        id: ConnectionId,
        machine: Machine,
        socket: Box<dyn Socket>,
    },
    Attached {
        id: ConnectionId,
        machine: Machine,
        socket: Box<dyn Socket>,
    },
    Closing,
}

impl Link {
    fn state(&self) -> ConnectionState {
        match self {
            Link::Idle => ConnectionState::Idle,
            Link::Connecting { .. } => ConnectionState::Connecting,
            Link::Attached { .. } => ConnectionState::Attached,
            Link::Closing => ConnectionState::Closing,
        }
    }

    fn id(&self) -> Option<ConnectionId> {
        match self {
            Link::Connecting { id, .. } | Link::Attached { id, .. } => Some(*id),
            Link::Idle | Link::Closing => None,
        }
    }
}

struct RendererSlot {
    renderer: Box<dyn Renderer>,
    /// Cleared when the socket closes; the last screen stays visible
    accepting: bool,
}

/// The one terminal session, owned by the connection manager
pub struct Session {
    target: Option<MachineId>,
    link: Link,
    renderer: Option<RendererSlot>,
    status: Status,
}

impl Session {
    fn new() -> Self {
        Self {
            target: None,
            link: Link::Idle,
            renderer: None,
            status: Status::None,
        }
    }

    /// Machine currently attached, if any
    pub fn target_machine_id(&self) -> Option<&MachineId> {
        self.target.as_ref()
    }

    /// Machine the live socket belongs to (connecting or attached)
    pub fn machine(&self) -> Option<&Machine> {
        match &self.link {
            Link::Connecting { machine, .. } | Link::Attached { machine, .. } => Some(machine),
            Link::Idle | Link::Closing => None,
        }
    }

    /// Connection state
    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Operator-facing status
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Id of the live socket
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.link.id()
    }

    /// Whether a socket handle is held
    pub fn has_connection(&self) -> bool {
        self.link.id().is_some()
    }

    /// Whether a renderer is held (live or frozen)
    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }
}

/// What [`ConnectionManager::attach`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Already attached to that machine; nothing changed
    AlreadyAttached,
    /// A new socket was requested
    Connecting(ConnectionId),
}

/// Owns the terminal socket and renderer
pub struct ConnectionManager {
    transport: Box<dyn Transport>,
    renderers: Box<dyn RendererFactory>,
    endpoints: Endpoints,
    session: Session,
    last_connection: ConnectionId,
}

impl ConnectionManager {
    /// Create an idle manager
    pub fn new(
        transport: Box<dyn Transport>,
        renderers: Box<dyn RendererFactory>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            transport,
            renderers,
            endpoints,
            session: Session::new(),
            last_connection: ConnectionId(0),
        }
    }

    /// The current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Attach to `machine`, replacing any existing connection.
    ///
    /// Re-selecting the machine that is already attached is a no-op. The
    /// socket URL is built before anything is torn down, so an unusable
    /// endpoint leaves the current session alone.
    pub fn attach(
        &mut self,
        machine: &Machine,
        credential: &Credential,
    ) -> Result<AttachOutcome, ConnectionError> {
        if let Link::Attached { machine: current, .. } = &self.session.link {
            if current.id == machine.id {
                tracing::debug!(machine = %machine.id, "Already attached");
                return Ok(AttachOutcome::AlreadyAttached);
            }
        }

        let url = self.endpoints.terminal_url(&machine.id, &credential.token)?;

        self.teardown();

        let mut renderer = self.renderers.create();
        let size = renderer.fit();
        self.session.renderer = Some(RendererSlot {
            renderer,
            accepting: false,
        });

        self.last_connection = self.last_connection.next();
        let id = self.last_connection;

        let socket = match self.transport.open(id, &url) {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!(machine = %machine.id, "Failed to open terminal socket: {}", e);
                self.session.status = Status::Error;
                return Err(e);
            }
        };

        tracing::info!(
            connection = %id,
            machine = %machine.id,
            name = %machine.name,
            %size,
            "Connecting"
        );
        self.session.status = Status::Connecting(machine.name.clone());
        self.session.link = Link::Connecting {
            id,
            machine: machine.clone(),
            socket,
        };

        Ok(AttachOutcome::Connecting(id))
    }

    /// Drop the current attachment: close the socket, dispose the renderer
    pub fn detach(&mut self) {
        self.teardown();
        self.session.status = Status::None;
    }

    /// Route one socket event.
    ///
    /// A token rejected by the proxy is reported back rather than handled
    /// here: recovering from it means logging out.
    pub fn on_socket_event(&mut self, event: SocketEvent) -> SocketOutcome {
        let SocketEvent { connection, kind } = event;

        if self.session.connection_id() != Some(connection) {
            tracing::debug!(%connection, ?kind, "Ignoring event from a replaced socket");
            return SocketOutcome::Ignored;
        }

        match kind {
            SocketEventKind::Opened => self.on_open(connection),
            SocketEventKind::Message(text) => self.on_remote_message(connection, &text),
            SocketEventKind::Error(reason) => self.on_error(connection, &reason),
            SocketEventKind::Unauthorized => {
                tracing::info!(%connection, "Terminal proxy rejected the credential");
                self.session.status = Status::Error;
                return SocketOutcome::CredentialRejected;
            }
            SocketEventKind::Closed => self.on_close(connection),
        }
        SocketOutcome::Applied
    }

    /// Forward local input; dropped unless attached
    pub fn on_local_input(&mut self, data: &str) -> bool {
        let Link::Attached { socket, .. } = &mut self.session.link else {
            tracing::trace!(len = data.len(), "Dropping input while not attached");
            return false;
        };
        send_frame(socket.as_mut(), &ClientFrame::input(data))
    }

    /// Refit the renderer and report the new geometry; no-op unless attached
    pub fn on_viewport_resize(&mut self) -> Option<TerminalSize> {
        let Link::Attached { socket, .. } = &mut self.session.link else {
            return None;
        };
        let slot = self.session.renderer.as_mut()?;
        let size = slot.renderer.fit();
        send_frame(socket.as_mut(), &ClientFrame::resize(size));
        tracing::debug!(%size, "Viewport resized");
        Some(size)
    }

    /// Apply one text frame from the proxy
    pub fn on_remote_message(&mut self, connection: ConnectionId, text: &str) {
        match &self.session.link {
            Link::Attached { id, .. } if *id == connection => {}
            _ => {
                tracing::debug!(%connection, "Ignoring frame outside an attachment");
                return;
            }
        }

        let frame = match codec::decode_server(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(%connection, "Dropping undecodable frame: {}", e);
                return;
            }
        };

        let Some(slot) = self.session.renderer.as_mut().filter(|s| s.accepting) else {
            return;
        };

        match frame {
            ServerFrame::Output { data } => slot.renderer.write(&data),
            ServerFrame::Error { data } => {
                tracing::info!(%connection, "Remote reported: {}", data);
                slot.renderer.write(&format_remote_error(&data));
            }
            ServerFrame::Unknown => {
                tracing::debug!(%connection, "Ignoring frame of unknown type");
            }
        }
    }

    fn on_open(&mut self, connection: ConnectionId) {
        let link = std::mem::replace(&mut self.session.link, Link::Idle);
        let (machine, mut socket) = match link {
            Link::Connecting { machine, socket, .. } => (machine, socket),
            other => {
                tracing::debug!(%connection, "Duplicate open ignored");
                self.session.link = other;
                return;
            }
        };

        let size = match self.session.renderer.as_mut() {
            Some(slot) => {
                slot.accepting = true;
                slot.renderer.size()
            }
            None => TerminalSize::default(),
        };

        // The remote side has no geometry until this arrives.
        send_frame(socket.as_mut(), &ClientFrame::resize(size));

        tracing::info!(%connection, machine = %machine.id, %size, "Attached");
        self.session.target = Some(machine.id.clone());
        self.session.status = Status::Connected(machine.name.clone());
        self.session.link = Link::Attached {
            id: connection,
            machine,
            socket,
        };
    }

    fn on_error(&mut self, connection: ConnectionId, reason: &str) {
        tracing::warn!(%connection, "Socket error: {}", reason);
        self.session.status = Status::Error;
    }

    fn on_close(&mut self, connection: ConnectionId) {
        tracing::info!(%connection, "Socket closed");
        self.session.link = Link::Idle;
        self.session.target = None;
        self.session.status = Status::Disconnected;
        if let Some(slot) = self.session.renderer.as_mut() {
            slot.accepting = false;
        }
    }

    fn teardown(&mut self) {
        let previous = std::mem::replace(&mut self.session.link, Link::Closing);
        match previous {
            Link::Connecting { id, mut socket, .. } | Link::Attached { id, mut socket, .. } => {
                tracing::debug!(connection = %id, "Closing socket");
                socket.close();
            }
            Link::Idle | Link::Closing => {}
        }

        if let Some(mut slot) = self.session.renderer.take() {
            slot.renderer.dispose();
        }

        self.session.target = None;
        self.session.link = Link::Idle;
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Inline rendering of a remote `error` frame: red, on its own line
pub fn format_remote_error(message: &str) -> String {
    format!("\r\n\x1b[31m{}\x1b[0m\r\n", message)
}

fn send_frame(socket: &mut dyn Socket, frame: &ClientFrame) -> bool {
    let text = match codec::encode_client(frame) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Failed to encode {} frame: {}", frame.frame_type(), e);
            return false;
        }
    };
    match socket.send(text) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Failed to send {} frame: {}", frame.frame_type(), e);
            false
        }
    }
}
