//! Task definitions — the core data model for deferred scraping work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority given to admin-requested tasks so they jump the queue.
pub const MANUAL_PRIORITY: f64 = 999.0;

/// A unit of deferred work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Correlation id for logs.
    pub id: Uuid,
    pub kind: TaskKind,
    /// Higher dequeues first.
    pub priority: f64,
    /// Failures so far.
    pub retries: u32,
    pub enqueued_at: DateTime<Utc>,
}

/// What to fetch. Each variant carries only what its collaborator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    PlayerDetail {
        player_id: String,
        source_url: String,
    },
    PlayerEarnings { player_id: String },
    TeamUpdate { team_id: String },
    TournamentUpdate { tournament_id: String },
}

/// Rate-limit class of an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateClass {
    General,
    /// Full-page parses on the stats site.
    Heavy,
}

impl TaskKind {
    pub fn rate_class(&self) -> RateClass {
        match self {
            TaskKind::PlayerDetail { .. } => RateClass::Heavy,
            _ => RateClass::General,
        }
    }

    pub fn subject_id(&self) -> &str {
        match self {
            TaskKind::PlayerDetail { player_id, .. } | TaskKind::PlayerEarnings { player_id } => {
                player_id
            }
            TaskKind::TeamUpdate { team_id } => team_id,
            TaskKind::TournamentUpdate { tournament_id } => tournament_id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::PlayerDetail { .. } => "player_detail",
            TaskKind::PlayerEarnings { .. } => "player_earnings",
            TaskKind::TeamUpdate { .. } => "team_update",
            TaskKind::TournamentUpdate { .. } => "tournament_update",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.label(), self.subject_id())
    }
}

impl Task {
    /// Create a fresh task with zero retries.
    pub fn new(kind: TaskKind, priority: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            priority,
            retries: 0,
            enqueued_at: Utc::now(),
        }
    }

    pub fn player_detail(player_id: &str, source_url: &str, priority: f64) -> Self {
        Self::new(
            TaskKind::PlayerDetail {
                player_id: player_id.to_string(),
                source_url: source_url.to_string(),
            },
            priority,
        )
    }

    pub fn player_earnings(player_id: &str, priority: f64) -> Self {
        Self::new(
            TaskKind::PlayerEarnings {
                player_id: player_id.to_string(),
            },
            priority,
        )
    }

    pub fn team_update(team_id: &str, priority: f64) -> Self {
        Self::new(
            TaskKind::TeamUpdate {
                team_id: team_id.to_string(),
            },
            priority,
        )
    }

    pub fn tournament_update(tournament_id: &str, priority: f64) -> Self {
        Self::new(
            TaskKind::TournamentUpdate {
                tournament_id: tournament_id.to_string(),
            },
            priority,
        )
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [prio {}, retries {}]",
            self.kind, self.priority, self.retries
        )
    }
}
