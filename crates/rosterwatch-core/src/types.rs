//! Domain entities as the scheduler sees them, plus the stale-selection filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse competition level of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DivisionTier {
    T1,
    T2,
    T3,
    T4,
    Unranked,
}

impl DivisionTier {
    /// Parse "T1".."T4" / "Unranked" (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "T1" => Some(Self::T1),
            "T2" => Some(Self::T2),
            "T3" => Some(Self::T3),
            "T4" => Some(Self::T4),
            "UNRANKED" => Some(Self::Unranked),
            _ => None,
        }
    }
}

impl std::fmt::Display for DivisionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DivisionTier::T1 => write!(f, "T1"),
            DivisionTier::T2 => write!(f, "T2"),
            DivisionTier::T3 => write!(f, "T3"),
            DivisionTier::T4 => write!(f, "T4"),
            DivisionTier::Unranked => write!(f, "Unranked"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    /// Stats-site profile page, required for a detailed scrape.
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub division: Option<DivisionTier>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub playstyle: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub earnings_updated_at: Option<DateTime<Utc>>,
}

impl Player {
    /// Agent, playstyle or division still unknown.
    pub fn missing_details(&self) -> bool {
        blank(&self.agent) || blank(&self.playstyle) || self.division.is_none()
    }
}

fn blank(field: &Option<String>) -> bool {
    field.as_deref().is_none_or(|s| s.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    /// Players judged by their earnings timestamp rather than their profile one.
    PlayerEarnings,
    Team,
    Tournament,
}

/// Anything the repository can hand back from a stale query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Player(Player),
    Team(Team),
    Tournament(Tournament),
}

/// Serializable form of the "which entities are stale" predicate.
///
/// `matches` is the reference semantics; a database-backed repository is
/// expected to translate the same fields into its own query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleFilter {
    pub kind: EntityKind,
    /// Entities last updated before this instant (or never) are stale.
    pub updated_before: DateTime<Utc>,
    /// Players only: also select players with missing agent/playstyle/division.
    #[serde(default)]
    pub missing_details: bool,
    /// Players only: restrict to these tiers. Empty means any.
    #[serde(default)]
    pub divisions: Vec<DivisionTier>,
    /// Players only: highest rating first.
    #[serde(default)]
    pub order_by_rating: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl StaleFilter {
    pub fn new(kind: EntityKind, updated_before: DateTime<Utc>) -> Self {
        Self {
            kind,
            updated_before,
            missing_details: false,
            divisions: Vec::new(),
            order_by_rating: false,
            limit: None,
        }
    }

    fn is_stale(&self, ts: Option<DateTime<Utc>>) -> bool {
        ts.is_none_or(|t| t < self.updated_before)
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        match (self.kind, entity) {
            (EntityKind::Player, Entity::Player(p)) => {
                let incomplete = self.missing_details && p.missing_details();
                self.tier_allowed(p) && (self.is_stale(p.updated_at) || incomplete)
            }
            (EntityKind::PlayerEarnings, Entity::Player(p)) => {
                self.tier_allowed(p) && self.is_stale(p.earnings_updated_at)
            }
            (EntityKind::Team, Entity::Team(t)) => self.is_stale(t.updated_at),
            (EntityKind::Tournament, Entity::Tournament(t)) => self.is_stale(t.updated_at),
            _ => false,
        }
    }

    fn tier_allowed(&self, player: &Player) -> bool {
        self.divisions.is_empty()
            || player.division.is_some_and(|d| self.divisions.contains(&d))
    }

    /// Filter, order and cap an in-memory candidate list.
    pub fn apply<'a, I>(&self, entities: I) -> Vec<Entity>
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        let mut selected: Vec<Entity> = entities
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect();
        if self.order_by_rating {
            // Stable sort keeps repository order among equal ratings.
            selected.sort_by(|a, b| rating(b).total_cmp(&rating(a)));
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

fn rating(entity: &Entity) -> f64 {
    match entity {
        Entity::Player(p) => p.rating,
        _ => 0.0,
    }
}

/// Result shape of the earnings site client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EarningsOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_earnings: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a bulk refresh reports back when it finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshSummary {
    #[serde(default)]
    pub pages_scraped: u32,
    #[serde(default)]
    pub players_saved: u32,
}
