//! Machine directory
//!
//! Keeps the published list of attachable machines in sync with the
//! registry. The list is replaced wholesale on every successful fetch and
//! left alone on failure. A rejected token is reported to the caller,
//! never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use htd_core::error::DirectoryError;
use htd_core::time::Clock;
use htd_core::{Credential, Machine};

use crate::event::{Event, EventSender};

/// Default interval between machine list refreshes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Source of the machine list
#[async_trait]
pub trait MachineRegistry: Send + Sync {
    /// Fetch the machines visible to `token`, in display order
    async fn list_machines(&self, token: &str) -> Result<Vec<Machine>, DirectoryError>;
}

/// Result of applying a fetch to the published list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOutcome {
    /// List replaced; carries the new length
    Updated(usize),
    /// Transient failure; the previous list is still published
    Stale,
    /// Registry refused the credential; the gate must log out
    CredentialRejected,
    /// Result belongs to a stopped poll run
    Ignored,
}

/// The published machine list and its polling task
#[derive(Default)]
pub struct MachineDirectory {
    machines: Vec<Machine>,
    stale: bool,
    last_error: Option<DirectoryError>,
    generation: u64,
    poller: Option<CancellationToken>,
}

impl MachineDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Published machines, in server order
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// Whether the last fetch failed and the list may be out of date
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// The failure behind the stale flag
    pub fn last_error(&self) -> Option<&DirectoryError> {
        self.last_error.as_ref()
    }

    /// Find a machine by id, falling back to its display name
    pub fn find(&self, needle: &str) -> Option<&Machine> {
        self.machines
            .iter()
            .find(|m| m.id.as_str() == needle)
            .or_else(|| self.machines.iter().find(|m| m.matches(needle)))
    }

    /// Fetch once and apply the result
    pub async fn refresh(
        &mut self,
        registry: &dyn MachineRegistry,
        credential: &Credential,
    ) -> DirectoryOutcome {
        let result = registry.list_machines(&credential.token).await;
        self.publish(result)
    }

    /// Start polling every `interval`.
    ///
    /// The first fetch happens immediately. Before each fetch the task
    /// checks its liveness token and the credential's validity, and ends
    /// itself when either fails. Any previous run is stopped first.
    pub fn poll(
        &mut self,
        registry: Arc<dyn MachineRegistry>,
        credential: Credential,
        interval: Duration,
        clock: Arc<dyn Clock>,
        events: &EventSender,
    ) {
        self.stop();
        self.generation += 1;

        let generation = self.generation;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let events = events.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if !credential.is_valid(clock.now()) {
                    tracing::debug!(generation, "Credential no longer valid, directory polling stopped");
                    break;
                }

                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    result = registry.list_machines(&credential.token) => result,
                };

                if events.send(Event::Directory { generation, result }).is_err() {
                    break;
                }
            }
        });

        tracing::debug!(generation, ?interval, "Directory polling started");
        self.poller = Some(cancel);
    }

    /// Stop polling. Results already in flight will be ignored.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.poller.take() {
            cancel.cancel();
            tracing::debug!(generation = self.generation, "Directory polling stopped");
        }
    }

    /// Apply a poll result posted to the loop
    pub fn apply(
        &mut self,
        generation: u64,
        result: Result<Vec<Machine>, DirectoryError>,
    ) -> DirectoryOutcome {
        if self.poller.is_none() || generation != self.generation {
            tracing::debug!(generation, "Dropping directory result from a stopped poll run");
            return DirectoryOutcome::Ignored;
        }
        self.publish(result)
    }

    /// Empty the published list
    pub fn clear(&mut self) {
        self.machines.clear();
        self.stale = false;
        self.last_error = None;
    }

    fn publish(&mut self, result: Result<Vec<Machine>, DirectoryError>) -> DirectoryOutcome {
        match result {
            Ok(machines) => {
                tracing::debug!(count = machines.len(), "Machine list refreshed");
                self.machines = machines;
                self.stale = false;
                self.last_error = None;
                DirectoryOutcome::Updated(self.machines.len())
            }
            Err(e) if e.is_credential_error() => {
                tracing::info!("Registry rejected the credential");
                DirectoryOutcome::CredentialRejected
            }
            Err(e) => {
                tracing::warn!("Failed to refresh machine list: {}", e);
                self.stale = true;
                self.last_error = Some(e);
                DirectoryOutcome::Stale
            }
        }
    }
}

impl Drop for MachineDirectory {
    fn drop(&mut self) {
        self.stop();
    }
}
