//! # RosterWatch Scheduler
//!
//! Background task scheduler that keeps player, team and tournament data
//! fresh without hammering the remote sites.
//!
//! ## Design Principles
//! - One priority queue, highest priority first, FIFO among equals
//! - Bounded concurrency, one shared rate-limit clock
//! - Failed tasks sink: each retry costs one priority point
//! - Tokio timers only — zero overhead when idle
//!
//! ## Architecture
//! ```text
//! TriggerSet (cron)            admin: update_player_details / earnings
//!   ├── "0 2 * * *"   bulk refresh ───────────────► Extractor (bypasses queue)
//!   ├── "0 3 * * 0"   detailed players ─┐
//!   ├── "0 4 * * 0"   teams ────────────┤
//!   ├── "0 5 * * *"   tournaments ──────┼──► TaskQueue ──tick──► dispatch
//!   └── "0 4 * * 1,4" earnings ─────────┘        ▲                 │
//!                                                │   RateLimiter ◄─┤
//!                                                └── RetryPolicy ◄─┘
//! ```

pub mod cron;
pub mod engine;
pub mod queue;
pub mod rate_limit;
pub mod refresh;
pub mod retry;
pub mod tasks;
pub mod triggers;

pub use engine::{EarningsQueued, RefreshAck, Scheduler, SchedulerStatus, TriggerResponse};
pub use queue::{QueueSnapshot, TaskQueue};
pub use rate_limit::RateLimiter;
pub use refresh::RefreshJob;
pub use retry::{RetryDecision, RetryPolicy};
pub use tasks::{MANUAL_PRIORITY, RateClass, Task, TaskKind};
pub use triggers::{EarningsRequest, RefreshRequest, TriggerAction, TriggerDescriptor};
