//! Periodic triggers and the pure planners behind them.
//!
//! Each `plan_*` function maps candidate entities to tasks and applies the
//! selection rule itself, so the rules can be tested without a clock or
//! the cron loop.

use chrono::{DateTime, Duration, Utc};
use rosterwatch_core::{DivisionTier, Entity, EntityKind, Result, RosterWatchError, StaleFilter};
use serde::Deserialize;

use crate::cron::CronSchedule;
use crate::tasks::Task;

pub const DETAIL_STALE_DAYS: i64 = 7;
pub const TEAM_STALE_DAYS: i64 = 7;
pub const TOURNAMENT_STALE_DAYS: i64 = 1;
pub const TEAM_PRIORITY: f64 = 5.0;
pub const TOURNAMENT_PRIORITY: f64 = 7.0;
pub const EARNINGS_BASE_PRIORITY: f64 = 100.0;
pub const EARNINGS_RANK_STEP: f64 = 0.1;
/// Upper bound for `minDaysSinceUpdate`; about 270 years.
pub const MAX_EARNINGS_DAYS: i64 = 100_000;

/// What a trigger does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Direct bulk scrape, bypasses the queue.
    BasicRefresh,
    DetailedPlayers,
    Teams,
    Tournaments,
    Earnings,
}

impl std::fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerAction::BasicRefresh => write!(f, "basic_refresh"),
            TriggerAction::DetailedPlayers => write!(f, "detailed_players"),
            TriggerAction::Teams => write!(f, "teams"),
            TriggerAction::Tournaments => write!(f, "tournaments"),
            TriggerAction::Earnings => write!(f, "earnings"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TriggerDescriptor {
    pub name: &'static str,
    pub schedule: CronSchedule,
    pub action: TriggerAction,
}

impl TriggerDescriptor {
    pub fn new(
        name: &'static str,
        expression: &str,
        action: TriggerAction,
    ) -> std::result::Result<Self, String> {
        Ok(Self {
            name,
            schedule: CronSchedule::parse(expression)?,
            action,
        })
    }
}

/// The five built-in triggers (UTC).
pub fn default_triggers() -> Vec<TriggerDescriptor> {
    [
        ("Basic data refresh", "0 2 * * *", TriggerAction::BasicRefresh),
        ("Detailed player update", "0 3 * * 0", TriggerAction::DetailedPlayers),
        ("Team update", "0 4 * * 0", TriggerAction::Teams),
        ("Tournament update", "0 5 * * *", TriggerAction::Tournaments),
        ("Earnings update", "0 4 * * 1,4", TriggerAction::Earnings),
    ]
    .into_iter()
    .filter_map(|(name, expr, action)| match TriggerDescriptor::new(name, expr, action) {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::error!("built-in trigger '{name}' rejected: {e}");
            None
        }
    })
    .collect()
}

/// Admin/trigger parameters for an earnings batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsRequest {
    #[serde(default = "default_earnings_limit")]
    pub limit: usize,
    #[serde(default = "default_earnings_divisions")]
    pub divisions: Vec<DivisionTier>,
    #[serde(default = "default_earnings_days")]
    pub min_days_since_update: i64,
}

fn default_earnings_limit() -> usize {
    50
}

fn default_earnings_divisions() -> Vec<DivisionTier> {
    vec![DivisionTier::T1, DivisionTier::T2]
}

fn default_earnings_days() -> i64 {
    30
}

impl Default for EarningsRequest {
    fn default() -> Self {
        Self {
            limit: default_earnings_limit(),
            divisions: default_earnings_divisions(),
            min_days_since_update: default_earnings_days(),
        }
    }
}

/// Parameters of a bulk refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRequest {
    pub pages: u32,
    pub detailed: bool,
}

/// Detail-update priority by division tier.
pub fn tier_priority(division: Option<DivisionTier>) -> f64 {
    match division {
        Some(DivisionTier::T1) => 10.0,
        Some(DivisionTier::T2) => 8.0,
        Some(DivisionTier::T3) => 5.0,
        Some(DivisionTier::T4) => 3.0,
        Some(DivisionTier::Unranked) | None => 1.0,
    }
}

pub fn detail_filter(now: DateTime<Utc>) -> StaleFilter {
    let mut filter = StaleFilter::new(EntityKind::Player, now - Duration::days(DETAIL_STALE_DAYS));
    filter.missing_details = true;
    filter
}

pub fn team_filter(now: DateTime<Utc>) -> StaleFilter {
    StaleFilter::new(EntityKind::Team, now - Duration::days(TEAM_STALE_DAYS))
}

pub fn tournament_filter(now: DateTime<Utc>) -> StaleFilter {
    StaleFilter::new(EntityKind::Tournament, now - Duration::days(TOURNAMENT_STALE_DAYS))
}

/// Earnings selection for a request. Rejects day counts outside
/// `0..=MAX_EARNINGS_DAYS` instead of computing an out-of-range cutoff.
pub fn earnings_filter(now: DateTime<Utc>, req: &EarningsRequest) -> Result<StaleFilter> {
    let days = req.min_days_since_update;
    if !(0..=MAX_EARNINGS_DAYS).contains(&days) {
        return Err(RosterWatchError::InvalidRequest(format!(
            "minDaysSinceUpdate must be between 0 and {MAX_EARNINGS_DAYS}, got {days}"
        )));
    }
    let cutoff = Duration::try_days(days)
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| {
            RosterWatchError::InvalidRequest(format!("minDaysSinceUpdate {days} is out of range"))
        })?;

    let mut filter = StaleFilter::new(EntityKind::PlayerEarnings, cutoff);
    filter.divisions = req.divisions.clone();
    filter.order_by_rating = true;
    filter.limit = Some(req.limit);
    Ok(filter)
}

/// Players stale >7d or missing agent/playstyle/division, weighted by tier.
pub fn plan_detailed_players(entities: &[Entity], now: DateTime<Utc>) -> Vec<Task> {
    detail_filter(now)
        .apply(entities)
        .into_iter()
        .filter_map(|e| match e {
            Entity::Player(p) => match p.profile_url.as_deref().filter(|u| !u.is_empty()) {
                Some(url) => Some(Task::player_detail(&p.id, url, tier_priority(p.division))),
                None => {
                    tracing::debug!("⏭️ Player {} has no profile URL, skipping detail update", p.id);
                    None
                }
            },
            _ => None,
        })
        .collect()
}

pub fn plan_team_updates(entities: &[Entity], now: DateTime<Utc>) -> Vec<Task> {
    team_filter(now)
        .apply(entities)
        .into_iter()
        .filter_map(|e| match e {
            Entity::Team(t) => Some(Task::team_update(&t.id, TEAM_PRIORITY)),
            _ => None,
        })
        .collect()
}

pub fn plan_tournament_updates(entities: &[Entity], now: DateTime<Utc>) -> Vec<Task> {
    tournament_filter(now)
        .apply(entities)
        .into_iter()
        .filter_map(|e| match e {
            Entity::Tournament(t) => Some(Task::tournament_update(&t.id, TOURNAMENT_PRIORITY)),
            _ => None,
        })
        .collect()
}

/// Rank-based priority: best-rated player gets 100, the next 99.9, ...
pub fn plan_earnings(entities: &[Entity], filter: &StaleFilter) -> Vec<Task> {
    filter
        .apply(entities)
        .into_iter()
        .filter_map(|e| match e {
            Entity::Player(p) => Some(p.id),
            _ => None,
        })
        .enumerate()
        .map(|(rank, id)| {
            Task::player_earnings(&id, EARNINGS_BASE_PRIORITY - rank as f64 * EARNINGS_RANK_STEP)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskKind;
    use chrono::TimeZone;
    use rosterwatch_core::{Player, Team, Tournament};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 3, 0, 0).unwrap()
    }

    fn player(id: &str, division: Option<DivisionTier>, rating: f64, days_old: i64) -> Player {
        Player {
            id: id.into(),
            name: id.into(),
            profile_url: Some(format!("https://stats.example/players/{id}")),
            division,
            rating,
            agent: Some("Sova".into()),
            playstyle: Some("Initiator".into()),
            updated_at: Some(now() - Duration::days(days_old)),
            earnings_updated_at: Some(now() - Duration::days(days_old)),
        }
    }

    #[test]
    fn test_default_triggers() {
        let triggers = default_triggers();
        assert_eq!(triggers.len(), 5);
        let exprs: Vec<&str> = triggers.iter().map(|t| t.schedule.expression()).collect();
        assert_eq!(exprs, vec!["0 2 * * *", "0 3 * * 0", "0 4 * * 0", "0 5 * * *", "0 4 * * 1,4"]);
    }

    #[test]
    fn test_detail_selection_and_tier_priority() {
        let mut missing = player("missing", Some(DivisionTier::T2), 1.0, 1);
        missing.playstyle = None;
        let mut no_url = player("no-url", Some(DivisionTier::T1), 1.0, 30);
        no_url.profile_url = None;

        let entities = vec![
            Entity::Player(player("stale-t1", Some(DivisionTier::T1), 1.0, 8)),
            Entity::Player(player("fresh", Some(DivisionTier::T1), 1.0, 2)),
            Entity::Player(missing),
            Entity::Player(player("stale-t4", Some(DivisionTier::T4), 1.0, 9)),
            Entity::Player(player("stale-unranked", Some(DivisionTier::Unranked), 1.0, 9)),
            Entity::Player(no_url),
        ];

        let tasks = plan_detailed_players(&entities, now());
        let got: Vec<(&str, f64)> = tasks
            .iter()
            .map(|t| (t.kind.subject_id(), t.priority))
            .collect();
        assert_eq!(
            got,
            vec![("stale-t1", 10.0), ("missing", 8.0), ("stale-t4", 3.0), ("stale-unranked", 1.0)]
        );
        assert!(matches!(
            &tasks[0].kind,
            TaskKind::PlayerDetail { source_url, .. } if source_url.ends_with("/stale-t1")
        ));
    }

    #[test]
    fn test_player_without_division_gets_lowest_priority() {
        let entities = vec![Entity::Player(player("p", None, 1.0, 0))];
        let tasks = plan_detailed_players(&entities, now());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].priority, 1.0);
        assert_eq!(tier_priority(Some(DivisionTier::T3)), 5.0);
    }

    #[test]
    fn test_team_and_tournament_thresholds() {
        let team = |id: &str, age: Option<Duration>| {
            Entity::Team(Team {
                id: id.into(),
                name: id.to_uppercase(),
                updated_at: age.map(|a| now() - a),
            })
        };
        let tournament = |id: &str, age: Duration| {
            Entity::Tournament(Tournament {
                id: id.into(),
                name: id.to_uppercase(),
                updated_at: Some(now() - age),
            })
        };
        let entities = vec![
            team("old", Some(Duration::days(8))),
            team("new", Some(Duration::days(6))),
            team("never", None),
            tournament("yesterday", Duration::hours(25)),
            tournament("today", Duration::hours(2)),
        ];

        let teams = plan_team_updates(&entities, now());
        let ids: Vec<&str> = teams.iter().map(|t| t.kind.subject_id()).collect();
        assert_eq!(ids, vec!["old", "never"]);
        assert!(teams.iter().all(|t| t.priority == TEAM_PRIORITY));

        let tournaments = plan_tournament_updates(&entities, now());
        assert_eq!(tournaments.len(), 1);
        assert_eq!(tournaments[0].kind.subject_id(), "yesterday");
        assert_eq!(tournaments[0].priority, TOURNAMENT_PRIORITY);
    }

    #[test]
    fn test_earnings_rank_priorities() {
        let entities = vec![
            Entity::Player(player("second", Some(DivisionTier::T2), 1.10, 40)),
            Entity::Player(player("first", Some(DivisionTier::T1), 1.30, 40)),
            Entity::Player(player("tier3", Some(DivisionTier::T3), 2.00, 40)),
            Entity::Player(player("recent", Some(DivisionTier::T1), 1.50, 5)),
        ];

        let filter = earnings_filter(now(), &EarningsRequest::default()).unwrap();
        let tasks = plan_earnings(&entities, &filter);
        let ids: Vec<&str> = tasks.iter().map(|t| t.kind.subject_id()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert!((tasks[0].priority - 100.0).abs() < 1e-9);
        assert!((tasks[1].priority - 99.9).abs() < 1e-9);
    }

    #[test]
    fn test_earnings_limit_cap() {
        let entities: Vec<Entity> = (0..80)
            .map(|i| Entity::Player(player(&format!("p{i}"), Some(DivisionTier::T1), i as f64, 60)))
            .collect();
        let filter = earnings_filter(now(), &EarningsRequest::default()).unwrap();
        let tasks = plan_earnings(&entities, &filter);
        assert_eq!(tasks.len(), 50);
        assert_eq!(tasks[0].kind.subject_id(), "p79");
        assert!(tasks.windows(2).all(|w| w[0].priority > w[1].priority));
    }

    #[test]
    fn test_earnings_request_json_defaults() {
        let body = serde_json::json!({"minDaysSinceUpdate": 10, "divisions": ["T3"]});
        let req: EarningsRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.limit, 50);
        assert_eq!(req.min_days_since_update, 10);
        assert_eq!(req.divisions, vec![DivisionTier::T3]);
    }

    #[test]
    fn test_earnings_days_out_of_range_rejected() {
        for days in [-1, MAX_EARNINGS_DAYS + 1, 1_000_000_000, i64::MAX, i64::MIN] {
            let req = EarningsRequest {
                min_days_since_update: days,
                ..EarningsRequest::default()
            };
            assert!(
                matches!(earnings_filter(now(), &req), Err(RosterWatchError::InvalidRequest(_))),
                "days = {days}"
            );
        }
    }

    #[test]
    fn test_earnings_days_bounds_accepted() {
        for days in [0, MAX_EARNINGS_DAYS] {
            let req = EarningsRequest {
                min_days_since_update: days,
                ..EarningsRequest::default()
            };
            let filter = earnings_filter(now(), &req).unwrap();
            assert_eq!(filter.updated_before, now() - Duration::days(days));
        }
    }
}
