//! Login and logout

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context as _, Result};

use htd_core::time::current_time_secs;

use crate::context::Context;
use crate::output::{bracketed_countdown, print_error, print_info, print_success};

/// Exchange username and password for a session
pub async fn login_command(
    ctx: &Context,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt_secret("Password: ")?,
    };

    let (mut gate, _events) = ctx.gate()?;

    if let Err(e) = gate.login(&username, &password).await {
        let message = gate.login_error().map(str::to_string).unwrap_or_else(|| e.to_string());
        print_error(&message);
        anyhow::bail!("Login failed");
    }

    let remaining = gate.credential().remaining(current_time_secs());
    print_success(&format!(
        "Logged in to {} {}",
        ctx.config.server_url,
        bracketed_countdown(remaining)
    ));
    Ok(())
}

/// Forget the persisted session
pub fn logout_command(ctx: &Context) -> Result<()> {
    let (mut gate, _events) = ctx.gate()?;
    let had_session = gate.bootstrap();
    gate.logout();

    if had_session {
        print_success("Logged out");
    } else {
        print_info("No active session");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read the password without echo, or the first line of piped stdin
fn prompt_secret(label: &str) -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return rpassword::prompt_password(label).context("Failed to read password");
    }
    rpassword::read_password_from_bufread(&mut stdin.lock())
        .context("Failed to read password from stdin")
}
