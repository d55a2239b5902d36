//! API endpoint handlers.
//!
//! Each module builds the router mounted at one `/api/<prefix>`. Plain
//! document resources have no module of their own and are mounted from
//! the generic CRUD routes in `router.rs`.

pub mod accounts;
pub mod admin;
pub mod bookings;
pub mod collections;
pub mod doctors;
pub mod headings;
pub mod health;
pub mod hospitals;
pub mod languages;
pub mod links;
pub mod patients;
pub mod treatments;
pub mod upload;
