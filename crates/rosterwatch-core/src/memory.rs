//! In-memory collaborators for development runs and tests.
//!
//! `MemoryRepository` answers stale queries with `StaleFilter::apply`.
//! `ScriptedExtractor` and `ScriptedEarnings` record every call and can be
//! told to fail a subject a fixed number of times, optionally sleeping to
//! simulate a slow remote.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Result, RosterWatchError};
use crate::traits::{EarningsClient, Extractor, Repository};
use crate::types::{EarningsOutcome, Entity, Player, RefreshSummary, StaleFilter};

/// Repository over a plain `Vec<Entity>`.
#[derive(Default)]
pub struct MemoryRepository {
    entities: Mutex<Vec<Entity>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: Vec<Entity>) -> Self {
        Self {
            entities: Mutex::new(entities),
        }
    }

    pub fn insert(&self, entity: Entity) {
        if let Ok(mut all) = self.entities.lock() {
            all.push(entity);
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Entity>>> {
        self.entities
            .lock()
            .map_err(|e| RosterWatchError::Repository(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_player(&self, id: &str) -> Result<Option<Player>> {
        let all = self.lock()?;
        Ok(all.iter().find_map(|e| match e {
            Entity::Player(p) if p.id == id => Some(p.clone()),
            _ => None,
        }))
    }

    async fn find_stale(&self, filter: &StaleFilter) -> Result<Vec<Entity>> {
        let all = self.lock()?;
        Ok(filter.apply(all.iter()))
    }
}

/// Failure script + call log shared by the scripted collaborators.
#[derive(Default)]
struct Script {
    /// subject id → remaining failures
    failures: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Mutex<Duration>,
}

impl Script {
    async fn run(&self, subject: &str) -> std::result::Result<(), String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(subject.to_string());
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = self.latency.lock().map(|d| *d).unwrap_or_default();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut failures = self.failures.lock().map_err(|e| e.to_string())?;
        match failures.get_mut(subject) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(format!("scripted failure for {subject}"))
            }
            _ => Ok(()),
        }
    }

    fn fail(&self, subject: &str, times: u32) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(subject.to_string(), times);
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

macro_rules! scripted_accessors {
    () => {
        /// Fail the next `times` calls for `subject`.
        pub fn fail(&self, subject: &str, times: u32) {
            self.script.fail(subject, times);
        }

        /// Sleep this long inside every call.
        pub fn set_latency(&self, latency: Duration) {
            if let Ok(mut l) = self.script.latency.lock() {
                *l = latency;
            }
        }

        /// Subject ids in call order.
        pub fn calls(&self) -> Vec<String> {
            self.script.calls()
        }

        /// Highest number of calls observed running at once.
        pub fn max_in_flight(&self) -> usize {
            self.script.max_in_flight.load(Ordering::SeqCst)
        }
    };
}

#[derive(Default)]
pub struct ScriptedExtractor {
    script: Script,
    refreshes: Mutex<Vec<(u32, bool)>>,
    fail_refresh: std::sync::atomic::AtomicBool,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    scripted_accessors!();

    pub fn fail_refreshes(&self) {
        self.fail_refresh.store(true, Ordering::SeqCst);
    }

    /// `(pages, detailed)` of every bulk refresh requested.
    pub fn refreshes(&self) -> Vec<(u32, bool)> {
        self.refreshes.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn scrape_player(&self, player_id: &str, _source_url: &str) -> Result<bool> {
        self.script.run(player_id).await.map_err(RosterWatchError::Fetch)?;
        Ok(true)
    }

    async fn update_team(&self, team_id: &str) -> Result<bool> {
        self.script.run(team_id).await.map_err(RosterWatchError::Fetch)?;
        Ok(true)
    }

    async fn update_tournament(&self, tournament_id: &str) -> Result<bool> {
        self.script.run(tournament_id).await.map_err(RosterWatchError::Parse)?;
        Ok(true)
    }

    async fn refresh_pages(&self, pages: u32, detailed: bool) -> Result<RefreshSummary> {
        if let Ok(mut r) = self.refreshes.lock() {
            r.push((pages, detailed));
        }
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(RosterWatchError::Fetch("listing page unavailable".into()));
        }
        Ok(RefreshSummary {
            pages_scraped: pages,
            players_saved: pages * 50,
        })
    }
}

/// Earnings client whose scripted failures come back as `success: false`.
#[derive(Default)]
pub struct ScriptedEarnings {
    script: Script,
}

impl ScriptedEarnings {
    pub fn new() -> Self {
        Self::default()
    }

    scripted_accessors!();
}

#[async_trait]
impl EarningsClient for ScriptedEarnings {
    async fn process(&self, player_id: &str) -> Result<EarningsOutcome> {
        Ok(match self.script.run(player_id).await {
            Ok(()) => EarningsOutcome {
                success: true,
                total_earnings: Some(1000.0),
                error: None,
            },
            Err(e) => EarningsOutcome {
                success: false,
                total_earnings: None,
                error: Some(e),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityKind, Team};
    use chrono::Utc;

    #[tokio::test]
    async fn test_memory_repository_find_player() {
        let repo = MemoryRepository::new();
        repo.insert(Entity::Team(Team {
            id: "t1".into(),
            name: "Fnatic".into(),
            updated_at: None,
        }));
        assert!(repo.find_player("t1").await.unwrap().is_none());

        let stale = repo
            .find_stale(&StaleFilter::new(EntityKind::Team, Utc::now()))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
    }

    #[tokio::test]
    async fn test_scripted_extractor_fails_then_succeeds() {
        let ex = ScriptedExtractor::new();
        ex.fail("p1", 1);
        assert!(ex.scrape_player("p1", "url").await.is_err());
        assert!(ex.scrape_player("p1", "url").await.unwrap());
        assert_eq!(ex.calls(), vec!["p1", "p1"]);
    }

    #[tokio::test]
    async fn test_scripted_earnings_reports_failure_in_outcome() {
        let client = ScriptedEarnings::new();
        client.fail("p2", 1);
        let outcome = client.process("p2").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
        assert!(client.process("p2").await.unwrap().success);
    }
}
