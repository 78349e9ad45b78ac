//! Auth gate
//!
//! Top-level session state: holds the credential and decides between the
//! unauthenticated and authenticated modes. Logging in starts the session
//! clock and the directory poller; logging out (by request, by expiry or
//! because a collaborator rejected the token) stops both, drops the
//! terminal connection and wipes the persisted credential.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use htd_core::config::ClientConfig;
use htd_core::error::{AuthError, ConnectionError, HtdError, LoginError};
use htd_core::time::{format_countdown, Clock};
use htd_core::{ConnectionState, Credential, Machine, MachineId};

use crate::clock::{ClockOutcome, ClockState, SessionClock};
use crate::connection::{AttachOutcome, ConnectionManager, Session, SocketOutcome};
use crate::directory::{DirectoryOutcome, MachineDirectory, MachineRegistry, DEFAULT_POLL_INTERVAL};
use crate::endpoint::Endpoints;
use crate::event::{Event, EventSender};
use crate::renderer::RendererFactory;
use crate::store::{CredentialStore, KeyValueStore};
use crate::transport::Transport;

/// Shown when the service refuses without saying why
pub const LOGIN_FAILED: &str = "login failed";

/// Shown when the service cannot be reached
pub const CONNECTION_ERROR: &str = "connection error";

/// Exchanges username and password for a credential
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Log in; the returned credential replaces any previous one
    async fn login(&self, username: &str, password: &str) -> Result<Credential, LoginError>;
}

/// Everything the gate talks to
pub struct Collaborators {
    pub auth: Arc<dyn AuthService>,
    pub registry: Arc<dyn MachineRegistry>,
    pub transport: Box<dyn Transport>,
    pub renderers: Box<dyn RendererFactory>,
    pub store: Box<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

/// Gate settings
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Interval between machine list refreshes
    pub poll_interval: Duration,
    /// Server URLs
    pub endpoints: Endpoints,
}

impl GateConfig {
    /// Settings for `endpoints` with the default poll interval
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            endpoints,
        }
    }

    /// Settings from the client configuration file
    pub fn from_client_config(config: &ClientConfig) -> Result<Self, ConnectionError> {
        Ok(Self {
            poll_interval: config.poll_interval,
            endpoints: Endpoints::new(&config.server_url)?,
        })
    }
}

/// Read-only snapshot of the gate for front ends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateView {
    pub logged_in: bool,
    /// `MM:SS`, absent while logged out
    pub countdown: Option<String>,
    pub remaining_seconds: i64,
    pub machines: Vec<Machine>,
    pub stale: bool,
    pub connection: ConnectionState,
    pub target: Option<MachineId>,
    pub status: String,
    pub login_error: Option<String>,
}

/// Owns the credential and every session component
pub struct AuthGate {
    poll_interval: Duration,
    auth: Arc<dyn AuthService>,
    registry: Arc<dyn MachineRegistry>,
    time: Arc<dyn Clock>,
    store: CredentialStore,
    credential: Credential,
    logged_in: bool,
    login_error: Option<String>,
    clock: SessionClock,
    directory: MachineDirectory,
    connection: ConnectionManager,
    events: EventSender,
}

impl AuthGate {
    /// Create an unauthenticated gate. Call [`bootstrap`](Self::bootstrap)
    /// to pick up a persisted credential.
    pub fn new(config: GateConfig, collaborators: Collaborators, events: EventSender) -> Self {
        let Collaborators {
            auth,
            registry,
            transport,
            renderers,
            store,
            clock,
        } = collaborators;

        Self {
            poll_interval: config.poll_interval,
            auth,
            registry,
            time: clock,
            store: CredentialStore::new(store),
            credential: Credential::empty(),
            logged_in: false,
            login_error: None,
            clock: SessionClock::new(),
            directory: MachineDirectory::new(),
            connection: ConnectionManager::new(transport, renderers, config.endpoints),
            events,
        }
    }

    /// Resume a persisted session if it is still valid.
    ///
    /// Returns whether the gate is now logged in.
    pub fn bootstrap(&mut self) -> bool {
        let credential = self.store.load();
        if credential.is_valid(self.time.now()) {
            tracing::info!(
                remaining = credential.remaining(self.time.now()),
                "Resuming persisted session"
            );
            self.activate(credential);
        } else {
            tracing::debug!("No valid persisted session");
        }
        self.logged_in
    }

    /// Exchange username and password for a credential.
    ///
    /// On failure the login error is recorded and any credential already
    /// held is left alone.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        self.login_error = None;

        let credential = match self.auth.login(username, password).await {
            Ok(credential) => credential,
            Err(e) => {
                let message = match &e {
                    LoginError::Rejected(message) if !message.trim().is_empty() => message.clone(),
                    LoginError::Rejected(_) => LOGIN_FAILED.to_string(),
                    LoginError::Transport(reason) => {
                        tracing::warn!("Login request failed: {}", reason);
                        CONNECTION_ERROR.to_string()
                    }
                };
                tracing::info!(user = %username, "Login refused: {}", message);
                self.login_error = Some(message.clone());
                return Err(AuthError::Login(message));
            }
        };

        if let Err(e) = self.store.save(&credential) {
            tracing::warn!("Failed to persist credential: {}", e);
        }

        tracing::info!(user = %username, expires_at = credential.expires_at, "Logged in");
        self.activate(credential);
        Ok(())
    }

    /// Return to the unauthenticated state. Safe to call repeatedly.
    pub fn logout(&mut self) {
        let was_logged_in = self.logged_in;

        self.connection.detach();
        self.clock.stop();
        self.directory.stop();
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to erase persisted credential: {}", e);
        }
        self.credential = Credential::empty();
        self.directory.clear();
        self.logged_in = false;

        if was_logged_in {
            tracing::info!("Logged out");
        }
    }

    /// Attach to a machine by id or display name
    pub fn attach(&mut self, needle: &str) -> Result<AttachOutcome, HtdError> {
        if !self.logged_in {
            return Err(AuthError::NotAuthenticated.into());
        }
        if !self.credential.is_valid(self.time.now()) {
            tracing::info!("Credential expired before attach");
            self.logout();
            return Err(AuthError::Expired.into());
        }

        let machine = self
            .directory
            .find(needle)
            .cloned()
            .ok_or_else(|| ConnectionError::MachineNotFound(needle.to_string()))?;

        Ok(self.connection.attach(&machine, &self.credential)?)
    }

    /// Drop the current attachment
    pub fn detach(&mut self) {
        self.connection.detach();
    }

    /// Forward local input to the attached machine
    pub fn input(&mut self, data: &str) -> bool {
        self.connection.on_local_input(data)
    }

    /// The local viewport changed size
    pub fn viewport_resized(&mut self) {
        self.connection.on_viewport_resize();
    }

    /// Apply one event from the loop
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::ClockTick { generation } => {
                match self.clock.on_tick(generation, self.time.now()) {
                    ClockOutcome::Expired => {
                        tracing::info!("Session expired");
                        self.logout();
                    }
                    ClockOutcome::Tick(_) | ClockOutcome::Ignored => {}
                }
            }
            Event::Directory { generation, result } => {
                if self.directory.apply(generation, result) == DirectoryOutcome::CredentialRejected {
                    self.logout();
                }
            }
            Event::Socket(event) => {
                if self.connection.on_socket_event(event) == SocketOutcome::CredentialRejected {
                    self.logout();
                }
            }
            Event::Input(data) => {
                self.input(&data);
            }
            Event::ViewportResized => self.viewport_resized(),
            Event::Attach(needle) => {
                if let Err(e) = self.attach(&needle) {
                    tracing::warn!(machine = %needle, "Attach failed: {}", e);
                }
            }
            Event::Detach => self.detach(),
            Event::Logout => self.logout(),
        }
    }

    /// Fetch the machine list now instead of waiting for the next poll
    pub async fn refresh_now(&mut self) -> Result<DirectoryOutcome, AuthError> {
        if !self.logged_in {
            return Err(AuthError::NotAuthenticated);
        }
        if !self.credential.is_valid(self.time.now()) {
            self.logout();
            return Err(AuthError::Expired);
        }

        let outcome = self
            .directory
            .refresh(self.registry.as_ref(), &self.credential)
            .await;
        if outcome == DirectoryOutcome::CredentialRejected {
            self.logout();
            return Err(AuthError::NotAuthenticated);
        }
        Ok(outcome)
    }

    /// Whether a credential is held
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// The held credential (empty while logged out)
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Published machines
    pub fn machines(&self) -> &[Machine] {
        self.directory.machines()
    }

    /// The machine directory
    pub fn directory(&self) -> &MachineDirectory {
        &self.directory
    }

    /// The terminal session
    pub fn session(&self) -> &Session {
        self.connection.session()
    }

    /// Countdown state
    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    /// `MM:SS` until expiry; `None` while logged out
    pub fn countdown(&self) -> Option<String> {
        self.logged_in
            .then(|| format_countdown(self.clock.state().remaining_seconds))
    }

    /// Message from the last failed login
    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    /// Snapshot for rendering
    pub fn view(&self) -> GateView {
        let session = self.connection.session();
        GateView {
            logged_in: self.logged_in,
            countdown: self.countdown(),
            remaining_seconds: self.clock.state().remaining_seconds,
            machines: self.directory.machines().to_vec(),
            stale: self.directory.is_stale(),
            connection: session.state(),
            target: session.target_machine_id().cloned(),
            status: session.status().to_string(),
            login_error: self.login_error.clone(),
        }
    }

    fn activate(&mut self, credential: Credential) {
        self.credential = credential;
        self.logged_in = true;
        self.login_error = None;
        self.clock.start(&self.credential, &self.events);
        self.directory.poll(
            self.registry.clone(),
            self.credential.clone(),
            self.poll_interval,
            self.time.clone(),
            &self.events,
        );
    }
}

impl Drop for AuthGate {
    fn drop(&mut self) {
        self.clock.stop();
        self.directory.stop();
    }
}
