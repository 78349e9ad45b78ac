//! List command implementation

use anyhow::Result;

use htd_client::DirectoryOutcome;

use crate::commands::require_session;
use crate::context::Context;
use crate::output::{format_machines, print_error, print_warning};

/// Fetch and print the machines the server publishes
pub async fn list_command(ctx: &Context, long: bool) -> Result<()> {
    let (mut gate, _events) = ctx.gate()?;
    require_session(&mut gate)?;

    match gate.refresh_now().await {
        Ok(DirectoryOutcome::Stale) => {
            let reason = gate
                .directory()
                .last_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            print_error(&format!("Failed to list machines: {}", reason));
            anyhow::bail!("Machine registry unavailable");
        }
        Ok(_) => {}
        Err(e) => {
            print_warning("The server rejected the session; logged out");
            return Err(e.into());
        }
    }

    println!("{}", format_machines(gate.machines(), long));
    Ok(())
}
