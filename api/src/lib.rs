//! `grievance-api`: the HTTP surface for the Public Grievance Redressal
//! backend (C10). Exposes the endpoints of spec §6 over `axum`; the
//! binary in `main.rs` wires this up with the background scheduler loop
//! and graceful shutdown. Split into a library so handler tests can call
//! into it directly with `tokio::test`, the way the `main.rs` binary
//! never could on its own.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
