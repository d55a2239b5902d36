//! HTTP API for the healthcare directory.
//!
//! Routes are nested under `/api/`. Every request passes the request
//! log, the database guard and caller identification before reaching a
//! handler; per-route `require_admin` / `require_patient` layers gate
//! writes and account routes.

pub mod crud;
pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use router::api_router;
pub use server::{serve, start_on, ApiServer, ServerError};
pub use types::ApiContext;
