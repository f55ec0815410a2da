//! dare - Client for the DARE robot execution service
//!
//! Robots are task definitions registered on a remote DARE server. This crate
//! talks to the server over HTTP and keeps a local index of the codes it has
//! been handed back, so later commands can refer to resources by code.

pub mod cli;
pub mod code;
pub mod commands;
pub mod error;
pub mod http;
pub mod period;
pub mod resource;
pub mod store;

pub use code::extract_code;
pub use commands::App;
pub use error::{DareError, Result};
pub use http::{FormParams, HttpBackend, ReqwestBackend, Transport};
pub use period::{Period, PeriodUnit};
pub use resource::{Dare, Execution, Periodical, Robot};
pub use store::Store;
