//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier for a machine in the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(pub String);

impl MachineId {
    /// Create a new machine ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MachineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MachineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A machine that can be attached to, as published by the registry.
///
/// Snapshots are immutable; the directory replaces the whole list on
/// every successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Registry identifier
    pub id: MachineId,
    /// Display name
    pub name: String,
    /// Network address
    #[serde(alias = "ip", default)]
    pub address: String,
    /// Operating system / platform
    #[serde(alias = "os", default)]
    pub platform: String,
    /// Hostname reported by the machine's agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl Machine {
    /// Create a machine snapshot
    pub fn new(
        id: impl Into<MachineId>,
        name: impl Into<String>,
        address: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            platform: platform.into(),
            hostname: None,
        }
    }

    /// Whether `needle` names this machine, by id or by display name
    pub fn matches(&self, needle: &str) -> bool {
        self.id.as_str() == needle || self.name.eq_ignore_ascii_case(needle)
    }
}

/// Identifies one socket opened by the connection manager.
///
/// Every attach gets a fresh id so events from a replaced socket can be
/// told apart from events of the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Get the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The id following this one
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Terminal connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No machine attached
    Idle,
    /// Socket requested, not yet open
    Connecting,
    /// Socket open, renderer live
    Attached,
    /// Teardown in progress
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Attached => write!(f, "attached"),
            ConnectionState::Closing => write!(f, "closing"),
        }
    }
}
