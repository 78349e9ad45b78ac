//! Connect command: attach the local terminal to a machine

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as TermEvent, KeyEventKind};
use tokio::sync::mpsc;

use htd_client::{AuthGate, EventReceiver};
use htd_core::ConnectionState;

use crate::commands::require_session;
use crate::context::Context;
use crate::output::{print_error, print_info, print_success, print_warning};
use crate::terminal::{is_detach, key_to_input, RawTerminal};

/// Why the interactive session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Detached,
    Disconnected,
    LoggedOut,
}

/// Attach to `machine` (id or name) until detached or disconnected
pub async fn connect_command(ctx: &Context, machine: &str) -> Result<()> {
    let (mut gate, mut events) = ctx.gate()?;
    require_session(&mut gate)?;

    if let Err(e) = gate.refresh_now().await {
        print_warning("The server rejected the session; logged out");
        return Err(e.into());
    }

    print_info(&format!("Attaching to '{}'... (Press Ctrl+] to detach)", machine));

    // The renderer draws on the alternate screen, never over the scrollback
    let terminal = RawTerminal::enter()?;
    if let Err(e) = gate.attach(machine) {
        drop(terminal);
        print_error(&format!("Cannot attach to '{}': {}", machine, e));
        return Err(e.into());
    }

    let ending = run_interactive(&mut gate, &mut events, &terminal).await;
    gate.detach();
    drop(terminal);
    tracing::info!(?ending, "Interactive session ended");

    match ending {
        Ending::Detached => print_success("Detached"),
        Ending::Disconnected => print_warning("Disconnected"),
        Ending::LoggedOut => print_warning("Session ended; log in again to continue"),
    }
    Ok(())
}

async fn run_interactive(
    gate: &mut AuthGate,
    events: &mut EventReceiver,
    terminal: &RawTerminal,
) -> Ending {
    let (key_tx, mut key_rx) = mpsc::channel::<TermEvent>(256);
    let stop = Arc::new(AtomicBool::new(false));
    let reader_stop = stop.clone();
    let reader = tokio::task::spawn_blocking(move || {
        while !reader_stop.load(Ordering::Relaxed) {
            if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                match event::read() {
                    Ok(evt) => {
                        if key_tx.blocking_send(evt).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read terminal event: {}", e);
                        break;
                    }
                }
            }
        }
    });

    let ending = loop {
        tokio::select! {
            Some(event) = events.recv() => gate.handle(event),
            Some(evt) = key_rx.recv() => match evt {
                TermEvent::Key(key) if key.kind != KeyEventKind::Release => {
                    if is_detach(&key) {
                        break Ending::Detached;
                    }
                    let data = key_to_input(key.code, key.modifiers);
                    if !data.is_empty() {
                        gate.input(&data);
                    }
                }
                TermEvent::Paste(text) => {
                    gate.input(&text);
                }
                TermEvent::Resize(..) => gate.viewport_resized(),
                _ => {}
            },
            else => break Ending::Disconnected,
        }

        if !gate.is_logged_in() {
            break Ending::LoggedOut;
        }
        if gate.session().state() == ConnectionState::Idle {
            break Ending::Disconnected;
        }

        let view = gate.view();
        terminal.set_title(view.countdown.as_deref(), &view.status);
    };

    stop.store(true, Ordering::Relaxed);
    let _ = reader.await;
    ending
}
