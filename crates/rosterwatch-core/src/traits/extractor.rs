//! Fetch + parse + save for the stats site.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RefreshSummary;

/// Every call is one (possibly heavy) round trip to the stats site.
/// Failures are `RosterWatchError::Fetch` or `RosterWatchError::Parse`.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Scrape a player's profile page and persist the parsed fields.
    async fn scrape_player(&self, player_id: &str, source_url: &str) -> Result<bool>;

    async fn update_team(&self, team_id: &str) -> Result<bool>;

    async fn update_tournament(&self, tournament_id: &str) -> Result<bool>;

    /// Bulk re-import of the first `pages` listing pages.
    async fn refresh_pages(&self, pages: u32, detailed: bool) -> Result<RefreshSummary>;
}
