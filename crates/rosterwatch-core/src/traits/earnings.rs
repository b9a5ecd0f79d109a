//! Earnings lookups against the wiki-style earnings site.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::EarningsOutcome;

#[async_trait]
pub trait EarningsClient: Send + Sync {
    /// Fetch and store a player's total earnings.
    ///
    /// An `Ok` outcome with `success == false` is still a failed task.
    async fn process(&self, player_id: &str) -> Result<EarningsOutcome>;
}
