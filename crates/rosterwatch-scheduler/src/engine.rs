//! Scheduler Engine — owns the task queue and runs the dispatch loop.
//! Uses tokio::interval for ticking (sleeps between checks) and one
//! tokio task per cron trigger.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use rosterwatch_core::config::SchedulerConfig;
use rosterwatch_core::traits::{Clock, EarningsClient, Extractor, Repository, SystemClock};
use rosterwatch_core::{DivisionTier, Result, RosterWatchError};

use crate::queue::{QueueSnapshot, TaskQueue};
use crate::rate_limit::RateLimiter;
use crate::refresh::RefreshJob;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::tasks::{MANUAL_PRIORITY, Task, TaskKind};
use crate::triggers::{self, EarningsRequest, RefreshRequest, TriggerAction, TriggerDescriptor};

/// What `GET /scraper/status` reports.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub queue_length: usize,
    pub active_requests: usize,
    pub is_running: bool,
    pub priority_distribution: BTreeMap<String, usize>,
    pub registered_triggers: usize,
}

/// Result of a manual single-subject trigger.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResponse {
    fn ok(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            error: None,
        }
    }

    fn err(error: String) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EarningsQueued {
    pub success: bool,
    pub queued_players: usize,
    pub divisions: Vec<DivisionTier>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshAck {
    pub success: bool,
    pub message: String,
    pub job_id: String,
}

/// Mutable state, always accessed under one lock.
#[derive(Default)]
struct SchedulerState {
    queue: TaskQueue,
    active_requests: usize,
    running: bool,
    /// No dispatch before this instant.
    cooldown_until: Option<Instant>,
    /// Bumped by `stop()`; completions from an older generation are ignored.
    generation: u64,
    tick_handle: Option<JoinHandle<()>>,
    trigger_handles: Vec<JoinHandle<()>>,
}

/// Owns the queue, the dispatch loop and the trigger jobs.
pub struct Scheduler {
    config: SchedulerConfig,
    repository: Arc<dyn Repository>,
    extractor: Arc<dyn Extractor>,
    earnings: Arc<dyn EarningsClient>,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    triggers: Vec<TriggerDescriptor>,
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    /// Create a stopped scheduler with the built-in triggers.
    /// Fails on a config the dispatch loop cannot run with.
    pub fn new(
        config: SchedulerConfig,
        repository: Arc<dyn Repository>,
        extractor: Arc<dyn Extractor>,
        earnings: Arc<dyn EarningsClient>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            limiter: RateLimiter::new(config.general_delay(), config.heavy_delay()),
            retry: RetryPolicy::new(config.max_retries),
            config,
            repository,
            extractor,
            earnings,
            clock: Arc::new(SystemClock),
            triggers: triggers::default_triggers(),
            state: Mutex::new(SchedulerState::default()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_triggers(mut self, triggers: Vec<TriggerDescriptor>) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Stopped → Running: register the cron triggers and start the tick loop.
    ///
    /// Calling it again while running registers every trigger a second time.
    pub async fn init(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        if state.running {
            tracing::warn!(
                "⚠️ Scheduler init() called while running — triggers will be registered again ({} already)",
                state.trigger_handles.len()
            );
        }

        if self.config.triggers_enabled {
            for trigger in &self.triggers {
                let this = Arc::clone(self);
                let trigger = trigger.clone();
                state.trigger_handles.push(tokio::spawn(this.run_trigger_schedule(trigger)));
            }
        }
        if state.tick_handle.is_none() {
            let this = Arc::clone(self);
            state.tick_handle = Some(tokio::spawn(this.dispatch_loop()));
        }
        state.running = true;

        tracing::info!(
            "⏰ Scheduler started (tick {}ms, max {} concurrent, {} trigger job(s))",
            self.config.tick_interval_ms,
            self.config.max_concurrent_requests,
            state.trigger_handles.len()
        );
    }

    /// Running → Stopped. Hard reset: the queue is cleared and counters are
    /// zeroed; in-flight calls finish on their own and are then ignored.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(handle) = state.tick_handle.take() {
            handle.abort();
        }
        for handle in state.trigger_handles.drain(..) {
            handle.abort();
        }
        let dropped = state.queue.len();
        state.queue.clear();
        state.active_requests = 0;
        state.cooldown_until = None;
        state.running = false;
        state.generation += 1;
        tracing::info!("🛑 Scheduler stopped ({dropped} pending task(s) discarded)");
    }

    pub async fn add_to_queue(&self, task: Task) {
        tracing::debug!("📥 Enqueue {task}");
        self.state.lock().await.queue.enqueue(task);
    }

    pub async fn add_batch(&self, tasks: Vec<Task>) -> usize {
        self.state.lock().await.queue.enqueue_batch(tasks)
    }

    pub async fn queue_status(&self) -> QueueSnapshot {
        self.state.lock().await.queue.snapshot()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let state = self.state.lock().await;
        let snapshot = state.queue.snapshot();
        SchedulerStatus {
            queue_length: snapshot.length,
            active_requests: state.active_requests,
            is_running: state.running,
            priority_distribution: snapshot.histogram,
            registered_triggers: state.trigger_handles.len(),
        }
    }

    /// Pending tasks in dequeue order.
    pub async fn pending_tasks(&self) -> Vec<Task> {
        self.state.lock().await.queue.iter().cloned().collect()
    }

    // ---- Manual operations ----

    /// Queue-jump a detailed scrape for one player.
    pub async fn update_player_details(&self, player_id: &str) -> TriggerResponse {
        let player = match self.repository.find_player(player_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                return TriggerResponse::err(
                    RosterWatchError::SubjectNotFound(player_id.to_string()).to_string(),
                );
            }
            Err(e) => {
                tracing::warn!("⚠️ Player lookup failed for {player_id}: {e}");
                return TriggerResponse::err(e.to_string());
            }
        };
        let Some(url) = player.profile_url.filter(|u| !u.is_empty()) else {
            return TriggerResponse::err(format!("Player has no profile URL: {player_id}"));
        };

        self.add_to_queue(Task::player_detail(&player.id, &url, MANUAL_PRIORITY)).await;
        tracing::info!("📌 Manual detail update queued for {} ({})", player.name, player.id);
        TriggerResponse::ok(format!("Player {player_id} queued for detailed update"))
    }

    /// Select players for an earnings update and queue them by rank.
    pub async fn queue_earnings_update(&self, request: EarningsRequest) -> Result<EarningsQueued> {
        let filter = triggers::earnings_filter(self.clock.now(), &request)?;
        let entities = self.repository.find_stale(&filter).await?;
        let tasks = triggers::plan_earnings(&entities, &filter);
        let queued = self.add_batch(tasks).await;
        tracing::info!("💰 Queued {queued} player(s) for earnings update");
        Ok(EarningsQueued {
            success: true,
            queued_players: queued,
            divisions: request.divisions,
        })
    }

    /// Start a background bulk refresh. Not routed through the queue or the
    /// rate limiter; returns as soon as the job is spawned.
    pub fn trigger_full_refresh(&self, request: RefreshRequest) -> RefreshAck {
        let job_id = RefreshJob::spawn(Arc::clone(&self.extractor), request).detach();
        RefreshAck {
            success: true,
            message: format!(
                "Full data refresh scheduled ({} pages, detailed: {})",
                request.pages, request.detailed
            ),
            job_id: job_id.to_string(),
        }
    }

    // ---- Triggers ----

    /// Run one trigger action now. Returns the number of tasks queued.
    pub async fn fire_trigger(&self, action: TriggerAction) -> Result<usize> {
        let now = self.clock.now();
        let tasks = match action {
            TriggerAction::BasicRefresh => {
                self.trigger_full_refresh(RefreshRequest {
                    pages: self.config.refresh_pages,
                    detailed: self.config.refresh_detailed,
                });
                return Ok(0);
            }
            TriggerAction::DetailedPlayers => {
                let found = self.repository.find_stale(&triggers::detail_filter(now)).await?;
                triggers::plan_detailed_players(&found, now)
            }
            TriggerAction::Teams => {
                let found = self.repository.find_stale(&triggers::team_filter(now)).await?;
                triggers::plan_team_updates(&found, now)
            }
            TriggerAction::Tournaments => {
                let found = self.repository.find_stale(&triggers::tournament_filter(now)).await?;
                triggers::plan_tournament_updates(&found, now)
            }
            TriggerAction::Earnings => {
                return self
                    .queue_earnings_update(EarningsRequest::default())
                    .await
                    .map(|q| q.queued_players);
            }
        };
        let queued = self.add_batch(tasks).await;
        tracing::info!("📅 Trigger {action}: queued {queued} task(s)");
        Ok(queued)
    }

    async fn run_trigger_schedule(self: Arc<Self>, trigger: TriggerDescriptor) {
        loop {
            let now = self.clock.now();
            let Some(next) = trigger.schedule.next_after(now) else {
                tracing::warn!("⚠️ Trigger '{}' has no upcoming run, giving up", trigger.name);
                return;
            };
            tracing::debug!("⏳ Trigger '{}' next run at {}", trigger.name, next.to_rfc3339());
            tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

            tracing::info!("🔔 Trigger fired: '{}'", trigger.name);
            if let Err(e) = self.fire_trigger(trigger.action).await {
                tracing::warn!("⚠️ Trigger '{}' failed: {e}", trigger.name);
            }
        }
    }

    // ---- Dispatch ----

    async fn dispatch_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// Dispatch at most one task. Returns whether one was dispatched.
    async fn tick(self: &Arc<Self>) -> bool {
        let (task, generation) = {
            let mut state = self.state.lock().await;
            if !state.running || state.active_requests >= self.config.max_concurrent_requests {
                return false;
            }
            if let Some(until) = state.cooldown_until {
                if Instant::now() < until {
                    return false;
                }
                state.cooldown_until = None;
            }
            let Some(task) = state.queue.dequeue_next() else {
                return false;
            };
            state.active_requests += 1;
            (task, state.generation)
        };

        tracing::debug!("🚀 Dispatching {task}");
        tokio::spawn(Arc::clone(self).execute(task, generation));
        true
    }

    async fn execute(self: Arc<Self>, task: Task, generation: u64) {
        let class = task.kind.rate_class();
        self.limiter.await_slot(class).await;
        let outcome = self.run_task(&task.kind).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!("Task {task} finished after stop(), result ignored");
            return;
        }
        state.active_requests = state.active_requests.saturating_sub(1);

        let cool_down = match outcome {
            Ok(()) => {
                tracing::info!("✅ Task done: {task}");
                true
            }
            Err(e) => match self.retry.on_failure(&task, self.clock.now()) {
                RetryDecision::Requeue(next) => {
                    tracing::warn!("⚠️ Task failed: {task}: {e} — requeued as {next}");
                    state.queue.enqueue(next);
                    false
                }
                RetryDecision::Drop(dropped) => {
                    let failure = RosterWatchError::PermanentFailure {
                        task: dropped.to_string(),
                        reason: e.to_string(),
                    };
                    tracing::warn!("❌ {failure} — dropped");
                    true
                }
            },
        };

        if cool_down {
            let until = Instant::now() + self.limiter.delay(class);
            state.cooldown_until = Some(state.cooldown_until.map_or(until, |u| u.max(until)));
        }
    }

    /// Call the collaborator for one task.
    async fn run_task(&self, kind: &TaskKind) -> Result<()> {
        let saved = match kind {
            TaskKind::PlayerDetail { player_id, source_url } => {
                self.extractor.scrape_player(player_id, source_url).await?
            }
            TaskKind::TeamUpdate { team_id } => self.extractor.update_team(team_id).await?,
            TaskKind::TournamentUpdate { tournament_id } => {
                self.extractor.update_tournament(tournament_id).await?
            }
            TaskKind::PlayerEarnings { player_id } => {
                let outcome = self.earnings.process(player_id).await?;
                if !outcome.success {
                    return Err(RosterWatchError::Fetch(
                        outcome.error.unwrap_or_else(|| "earnings lookup failed".into()),
                    ));
                }
                tracing::debug!(
                    "💰 Earnings for {player_id}: {}",
                    outcome.total_earnings.unwrap_or_default()
                );
                true
            }
        };
        if saved {
            Ok(())
        } else {
            Err(RosterWatchError::Parse(format!("nothing extracted for {kind}")))
        }
    }
}
