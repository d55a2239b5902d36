//! API middleware stack.
//!
//! Execution order for `/api` (outermost → innermost):
//! 1. Request log — sees every outcome
//! 2. Database guard — reconnects or fails with 500
//! 3. Identify — resolves bearer tokens into `AuthContext`
//! 4. Per-route `require_admin` / `require_patient`

pub mod audit;
pub mod auth;
pub mod database;
