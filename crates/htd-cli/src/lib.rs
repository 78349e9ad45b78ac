//! holdthedoor: terminal client
//!
//! Logs in against a holdthedoor server, lists the machines it publishes
//! and attaches the local terminal to one of them.

pub mod commands;
pub mod context;
pub mod output;
pub mod terminal;
