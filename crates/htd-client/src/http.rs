//! HTTP collaborators: login and machine registry

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use htd_core::error::{ConnectionError, DirectoryError, LoginError};
use htd_core::{Credential, Machine};

use crate::directory::MachineRegistry;
use crate::endpoint::Endpoints;
use crate::gate::AuthService;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    expires: i64,
}

#[derive(Deserialize, Default)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
}

#[derive(Deserialize)]
struct MachineList {
    #[serde(default)]
    vms: Option<Vec<Machine>>,
}

fn build_client(timeout: Duration) -> Result<Client, ConnectionError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConnectionError::OpenFailed(format!("failed to create HTTP client: {}", e)))
}

/// `POST /api/login`
#[derive(Clone)]
pub struct HttpAuthService {
    client: Client,
    endpoints: Endpoints,
}

impl HttpAuthService {
    /// Create a login client with a per-request timeout
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, ConnectionError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoints,
        })
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<Credential, LoginError> {
        let url = self
            .endpoints
            .login_url()
            .map_err(|e| LoginError::Transport(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| LoginError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorResponse = response.json().await.unwrap_or_default();
            tracing::debug!(%status, "Login rejected");
            return Err(LoginError::Rejected(body.error));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| LoginError::Transport(format!("invalid login response: {}", e)))?;

        Ok(Credential::new(body.token, body.expires))
    }
}

/// `GET /api/vms` with bearer authentication
#[derive(Clone)]
pub struct HttpMachineRegistry {
    client: Client,
    endpoints: Endpoints,
}

impl HttpMachineRegistry {
    /// Create a registry client with a per-request timeout
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, ConnectionError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoints,
        })
    }
}

#[async_trait]
impl MachineRegistry for HttpMachineRegistry {
    async fn list_machines(&self, token: &str) -> Result<Vec<Machine>, DirectoryError> {
        let url = self
            .endpoints
            .machines_url()
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(DirectoryError::Unauthorized),
            status if !status.is_success() => {
                return Err(DirectoryError::Transport(format!("unexpected status {}", status)))
            }
            _ => {}
        }

        let list: MachineList = response
            .json()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))?;

        Ok(list.vms.unwrap_or_default())
    }
}
