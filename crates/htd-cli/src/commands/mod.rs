//! CLI command implementations

mod auth;
mod config;
mod connect;
mod list;
mod status;

pub use auth::{login_command, logout_command};
pub use config::{config_get, config_init, config_set, config_show};
pub use connect::connect_command;
pub use list::list_command;
pub use status::status_command;

use anyhow::Result;
use htd_client::AuthGate;

/// Resume the persisted session or explain how to get one
pub(crate) fn require_session(gate: &mut AuthGate) -> Result<()> {
    if !gate.bootstrap() {
        anyhow::bail!("Not logged in. Run 'holdthedoor login' first");
    }
    Ok(())
}
