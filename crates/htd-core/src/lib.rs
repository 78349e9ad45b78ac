//! htd-core: Core types, errors and configuration for holdthedoor
//!
//! This crate provides the domain types shared by the session core and the
//! command-line front end: credentials, machines, connection identifiers,
//! the error taxonomy, configuration files and time helpers.

pub mod config;
pub mod credential;
pub mod error;
pub mod time;
pub mod types;

pub use credential::Credential;
pub use error::HtdError;
pub use types::{ConnectionId, ConnectionState, Machine, MachineId};
