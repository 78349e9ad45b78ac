//! htd-client: Session core for holdthedoor
//!
//! Owns everything between "operator has a token" and "bytes reach a remote
//! shell":
//!
//! - [`store::CredentialStore`] persists the token and its expiry
//! - [`clock::SessionClock`] counts the credential down and forces logout at zero
//! - [`directory::MachineDirectory`] keeps the list of attachable machines fresh
//! - [`connection::ConnectionManager`] holds at most one terminal socket
//! - [`gate::AuthGate`] wires the above together and owns login/logout
//!
//! All state changes run on a single event loop fed by an unbounded
//! channel of [`Event`]s, so none of the components need locks.

pub mod clock;
pub mod connection;
pub mod directory;
pub mod endpoint;
pub mod event;
pub mod gate;
pub mod http;
pub mod renderer;
pub mod runtime;
pub mod store;
pub mod transport;
pub mod ws;

pub use clock::{ClockOutcome, ClockState, SessionClock};
pub use connection::{AttachOutcome, ConnectionManager, Session, SocketOutcome, Status};
pub use directory::{DirectoryOutcome, MachineDirectory, MachineRegistry};
pub use endpoint::Endpoints;
pub use event::{channel, Event, EventReceiver, EventSender, SocketEvent, SocketEventKind};
pub use gate::{AuthGate, AuthService, Collaborators, GateConfig, GateView};
pub use http::{HttpAuthService, HttpMachineRegistry};
pub use renderer::{Renderer, RendererFactory};
pub use runtime::run_until_logout;
pub use store::{CredentialStore, FileStore, KeyValueStore, MemoryStore};
pub use transport::{Socket, Transport};
pub use ws::WsTransport;
