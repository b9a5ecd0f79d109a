//! # RosterWatch Gateway
//! Admin HTTP API over the scheduler: status polling and manual triggers.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
