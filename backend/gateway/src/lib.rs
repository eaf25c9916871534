//! sshpair HTTP API.
//!
//! Thin axum handlers over `sshpair-security`: status polling, relay-code
//! resolution, key submission, sudo grants, and install scripts for accepters.

pub mod error;
pub mod health_api;
pub mod install_api;
pub mod install_script;
pub mod pairing_api;
pub mod server;
pub mod sudo_api;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use server::{router, start_server, GatewayState};
