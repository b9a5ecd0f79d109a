//! # RosterWatch Sources
//! HTTP adapters that let the scheduler reach the host web service.
//!
//! The host service owns the database and the site scrapers; this crate
//! only speaks its internal JSON API.

pub mod client;

pub use client::BackendClient;
