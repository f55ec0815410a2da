//! DARE Core - Shared functionality for DARE tools
//!
//! Resolves where the local store and the user configuration live.

pub mod config;
pub mod paths;

pub use config::Config;
pub use paths::Paths;
