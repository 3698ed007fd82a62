//! API Module
//!
//! HTTP surface of the sidecar.
//!
//! # Endpoints
//! - `/_flix/*` - Cache, calendar and auth endpoints
//! - everything else - Answered by the interception agent

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
