//! Session clock
//!
//! Ticks once a second while a valid credential is held. Each tick is an
//! [`Event::ClockTick`] carrying the generation of the run that produced
//! it; the loop hands it back to [`SessionClock::on_tick`], which derives
//! the remaining validity and reports expiry exactly once.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use htd_core::Credential;

use crate::event::{Event, EventSender};

/// Tick period of the session clock
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Derived countdown state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockState {
    /// Seconds until the credential expires (never negative)
    pub remaining_seconds: i64,
    /// Whether the clock is running
    pub ticking: bool,
}

/// What a tick meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOutcome {
    /// Tick from a stopped or replaced run
    Ignored,
    /// Credential still valid for this many seconds
    Tick(i64),
    /// Credential just expired; the clock has stopped itself
    Expired,
}

struct Running {
    generation: u64,
    cancel: CancellationToken,
}

/// Repeating one-second countdown over the current credential
pub struct SessionClock {
    period: Duration,
    generation: u64,
    running: Option<Running>,
    expires_at: i64,
    remaining: i64,
}

impl SessionClock {
    /// Create a stopped clock with the standard one-second period
    pub fn new() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    /// Create a stopped clock with a custom period
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            generation: 0,
            running: None,
            expires_at: 0,
            remaining: 0,
        }
    }

    /// Start counting down `credential`.
    ///
    /// Any previous run is stopped first. The first tick is posted
    /// immediately.
    pub fn start(&mut self, credential: &Credential, events: &EventSender) {
        self.stop();
        self.generation += 1;
        self.expires_at = credential.expires_at;

        let generation = self.generation;
        let cancel = CancellationToken::new();
        spawn_ticker(self.period, cancel.clone(), events.clone(), move || {
            Event::ClockTick { generation }
        });

        tracing::debug!(generation, expires_at = self.expires_at, "Session clock started");
        self.running = Some(Running { generation, cancel });
    }

    /// Stop the clock. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            tracing::debug!(generation = running.generation, "Session clock stopped");
        }
    }

    /// Whether a run is active
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Apply a tick from the loop
    pub fn on_tick(&mut self, generation: u64, now: i64) -> ClockOutcome {
        match &self.running {
            Some(running) if running.generation == generation => {}
            _ => return ClockOutcome::Ignored,
        }

        let remaining = self.expires_at - now;
        self.remaining = remaining.max(0);

        if remaining <= 0 {
            self.stop();
            return ClockOutcome::Expired;
        }

        ClockOutcome::Tick(remaining)
    }

    /// Current derived state
    pub fn state(&self) -> ClockState {
        ClockState {
            remaining_seconds: self.remaining,
            ticking: self.is_running(),
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Post `make()` every `period` until `cancel` fires or the loop goes away
fn spawn_ticker<F>(
    period: Duration,
    cancel: CancellationToken,
    events: EventSender,
    make: F,
) -> JoinHandle<()>
where
    F: Fn() -> Event + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if events.send(make()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}
