//! Session event loop

use crate::event::EventReceiver;
use crate::gate::AuthGate;

/// Apply events to `gate` until it is logged out or every sender is gone.
///
/// `observe` runs after each event, e.g. to redraw a status line.
pub async fn run_until_logout<F>(gate: &mut AuthGate, rx: &mut EventReceiver, mut observe: F)
where
    F: FnMut(&AuthGate),
{
    while gate.is_logged_in() {
        let Some(event) = rx.recv().await else {
            tracing::debug!("Event channel closed");
            break;
        };

        gate.handle(event);
        observe(gate);
    }
}
