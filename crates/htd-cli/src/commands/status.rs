//! Status command implementation

use anyhow::Result;
use serde::Serialize;

use htd_core::time::{current_time_secs, format_countdown};

use crate::context::Context;
use crate::output::bracketed_countdown;

#[derive(Serialize)]
struct StatusReport<'a> {
    server: &'a str,
    logged_in: bool,
    expires_at: Option<i64>,
    countdown: Option<String>,
}

/// Show the server and the persisted session
pub fn status_command(ctx: &Context, json: bool) -> Result<()> {
    let (mut gate, _events) = ctx.gate()?;
    let logged_in = gate.bootstrap();
    let remaining = gate.credential().remaining(current_time_secs());

    if json {
        let report = StatusReport {
            server: &ctx.config.server_url,
            logged_in,
            expires_at: logged_in.then(|| gate.credential().expires_at),
            countdown: logged_in.then(|| format_countdown(remaining)),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Server: {}", ctx.config.server_url);
    if logged_in {
        println!("Session: logged in {}", bracketed_countdown(remaining));
    } else {
        println!("Session: logged out");
    }
    Ok(())
}
