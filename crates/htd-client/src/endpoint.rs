//! Server endpoint URLs
//!
//! Login, registry and terminal proxy all hang off one configured base
//! URL. The terminal socket cannot carry an `Authorization` header, so the
//! token rides in the `token` query parameter whenever one is held.

use reqwest::Url;

use htd_core::error::ConnectionError;
use htd_core::MachineId;

/// URLs of the three remote collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Parse the server base URL (`http://` or `https://`)
    pub fn new(server_url: &str) -> Result<Self, ConnectionError> {
        let base = Url::parse(server_url)
            .map_err(|e| ConnectionError::InvalidEndpoint(format!("{}: {}", server_url, e)))?;

        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConnectionError::InvalidEndpoint(format!(
                    "unsupported scheme {:?} in {}",
                    other, server_url
                )))
            }
        }
        if base.cannot_be_a_base() {
            return Err(ConnectionError::InvalidEndpoint(server_url.to_string()));
        }

        Ok(Self { base })
    }

    /// `POST` target of the credential exchange
    pub fn login_url(&self) -> Result<Url, ConnectionError> {
        self.join(&["api", "login"])
    }

    /// `GET` target of the machine list
    pub fn machines_url(&self) -> Result<Url, ConnectionError> {
        self.join(&["api", "vms"])
    }

    /// Socket URL for attaching to `machine`.
    ///
    /// `http` becomes `ws` and `https` becomes `wss`. The token is added as
    /// a query parameter unless it is empty.
    pub fn terminal_url(&self, machine: &MachineId, token: &str) -> Result<Url, ConnectionError> {
        let mut url = self.join(&["ws", "terminal", machine.as_str()])?;

        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| ConnectionError::InvalidEndpoint(format!("cannot use {} scheme", scheme)))?;

        if !token.is_empty() {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    fn join(&self, segments: &[&str]) -> Result<Url, ConnectionError> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| ConnectionError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
