//! # RosterWatch Core
//!
//! Shared building blocks for the RosterWatch scraping scheduler:
//! configuration, the error taxonomy, domain entities and the
//! collaborator traits the scheduler talks to.
//!
//! ## Collaborators
//! ```text
//! Scheduler
//!   ├── Repository     — who is stale? does player X exist?
//!   ├── Extractor      — fetch + parse one stats page, save the result
//!   ├── EarningsClient — pull earnings from the wiki site
//!   └── Clock          — "now", swappable in tests
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use config::RosterWatchConfig;
pub use error::{Result, RosterWatchError};
pub use types::{
    DivisionTier, EarningsOutcome, Entity, EntityKind, Player, RefreshSummary, StaleFilter, Team,
    Tournament,
};
