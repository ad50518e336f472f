//! # Agenda Pro Server
//!
//! HTTP layer - routing, session extraction, and dependency wiring.
//!
//! This crate contains:
//! - The axum routers and handlers for every public operation
//! - The application context that wires ports to adapters and runs
//!   the background workers
//! - The server binary entry point
//!
//! ## Architecture Principles
//! - Depends on `agendapro-domain`, `agendapro-core`, and `agendapro-infra`
//! - Handlers stay thin: parse the request, call a service, map the error
//! - Domain errors translate onto HTTP statuses in exactly one place

pub mod context;
pub mod routes;

pub use context::AppContext;
pub use routes::router;
