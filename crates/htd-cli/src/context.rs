//! Wiring: configuration to a ready [`AuthGate`]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use htd_client::{
    channel, AuthGate, Collaborators, EventReceiver, FileStore, GateConfig,
    HttpAuthService, HttpMachineRegistry, WsTransport,
};
use htd_core::config::{self, ClientConfig};
use htd_core::time::SystemClock;

use crate::terminal::TerminalRenderers;

/// Resolved configuration for one CLI invocation
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: PathBuf,
    pub config: ClientConfig,
}

impl Context {
    /// Load the config file (defaults when missing) and apply overrides
    pub fn load(config_path: Option<&Path>, server: Option<&str>) -> Result<Self> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config::default_config_path);

        let mut config: ClientConfig = config::load_or_default(&config_path)
            .with_context(|| format!("Failed to load config {:?}", config_path))?;

        if let Some(server) = server {
            config.server_url = server.to_string();
        }
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Build the session core against the configured server
    pub fn gate(&self) -> Result<(AuthGate, EventReceiver)> {
        let gate_config = GateConfig::from_client_config(&self.config)?;
        let endpoints = gate_config.endpoints.clone();
        let timeout = self.config.request_timeout;
        let (tx, rx) = channel();

        let collaborators = Collaborators {
            auth: Arc::new(HttpAuthService::new(endpoints.clone(), timeout)?),
            registry: Arc::new(HttpMachineRegistry::new(endpoints, timeout)?),
            transport: Box::new(WsTransport::new(tx.clone())),
            renderers: Box::new(TerminalRenderers::stdout()),
            store: Box::new(FileStore::open(&self.config.credentials_path)),
            clock: Arc::new(SystemClock),
        };

        Ok((AuthGate::new(gate_config, collaborators, tx), rx))
    }
}
