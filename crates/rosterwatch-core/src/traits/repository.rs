//! Read side of the host web service's persistence layer.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Entity, Player, StaleFilter};

#[async_trait]
pub trait Repository: Send + Sync {
    /// Look up one player. `Ok(None)` when the id is unknown.
    async fn find_player(&self, id: &str) -> Result<Option<Player>>;

    /// Entities of `filter.kind` selected by `filter`, ordered and capped as it asks.
    async fn find_stale(&self, filter: &StaleFilter) -> Result<Vec<Entity>>;
}
