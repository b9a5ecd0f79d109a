//! API route handlers for the gateway.
//!
//! Admin endpoints only acknowledge; task outcomes show up in the status
//! numbers and in the logs.

use axum::http::StatusCode;
use axum::{Json, extract::State};
use std::sync::Arc;

use rosterwatch_core::{DivisionTier, RosterWatchError};
use rosterwatch_scheduler::{EarningsRequest, RefreshRequest};

use super::server::AppState;

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "rosterwatch-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Queue and worker snapshot.
pub async fn scraper_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let status = state.scheduler.status().await;
    let mut body = serde_json::to_value(&status).unwrap_or_else(|_| serde_json::json!({}));
    body["uptime_secs"] = serde_json::json!(state.start_time.elapsed().as_secs());
    Json(body)
}

/// Queue-jump a detailed update for one player.
pub async fn scraper_update_player(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let response = state.scheduler.update_player_details(&id).await;
    let code = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    let body = serde_json::to_value(&response)
        .unwrap_or_else(|_| serde_json::json!({"success": response.success}));
    (code, Json(body))
}

/// Start a bulk refresh in the background.
pub async fn scraper_refresh(
    State(state): State<Arc<AppState>>,
    body: Option<Json<serde_json::Value>>,
) -> Json<serde_json::Value> {
    let body = body.map(|Json(v)| v).unwrap_or_default();
    let config = state.scheduler.config();
    let request = RefreshRequest {
        pages: body["pages"]
            .as_u64()
            .map(|p| p.min(u32::MAX as u64) as u32)
            .unwrap_or(config.refresh_pages),
        detailed: body["detailed"].as_bool().unwrap_or(config.refresh_detailed),
    };
    let ack = state.scheduler.trigger_full_refresh(request);
    Json(serde_json::to_value(&ack).unwrap_or_else(|_| serde_json::json!({"success": true})))
}

/// Queue a batch of earnings updates ranked by rating.
pub async fn scraper_earnings(
    State(state): State<Arc<AppState>>,
    body: Option<Json<serde_json::Value>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let body = body.map(|Json(v)| v).unwrap_or_default();
    let request = earnings_request(&body);

    match state.scheduler.queue_earnings_update(request).await {
        Ok(queued) => {
            let body = serde_json::to_value(&queued)
                .unwrap_or_else(|_| serde_json::json!({"success": true}));
            (StatusCode::OK, Json(body))
        }
        Err(e @ RosterWatchError::InvalidRequest(_)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": e.to_string()})),
        ),
        Err(e) => {
            tracing::error!("❌ Earnings batch failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"success": false, "error": e.to_string()})),
            )
        }
    }
}

/// Read the optional earnings parameters; unknown tiers are ignored.
fn earnings_request(body: &serde_json::Value) -> EarningsRequest {
    let defaults = EarningsRequest::default();
    let divisions = body["divisions"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_str().and_then(DivisionTier::parse))
                .collect::<Vec<_>>()
        })
        .filter(|d| !d.is_empty())
        .unwrap_or(defaults.divisions);

    EarningsRequest {
        limit: body["limit"]
            .as_u64()
            .map(|l| l as usize)
            .unwrap_or(defaults.limit),
        divisions,
        min_days_since_update: body["minDaysSinceUpdate"]
            .as_i64()
            .unwrap_or(defaults.min_days_since_update),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use rosterwatch_core::config::{GatewayConfig, SchedulerConfig};
    use rosterwatch_core::memory::{MemoryRepository, ScriptedEarnings, ScriptedExtractor};
    use rosterwatch_core::{Entity, Player};
    use rosterwatch_scheduler::Scheduler;

    fn player(id: &str, division: DivisionTier, rating: f64, url: Option<&str>) -> Entity {
        Entity::Player(Player {
            id: id.into(),
            name: id.to_uppercase(),
            profile_url: url.map(String::from),
            division: Some(division),
            rating,
            agent: None,
            playstyle: None,
            updated_at: Some(Utc::now() - ChronoDuration::days(40)),
            earnings_updated_at: None,
        })
    }

    fn test_state_with(extractor: Arc<ScriptedExtractor>) -> State<Arc<AppState>> {
        let repo = Arc::new(MemoryRepository::with_entities(vec![
            player("tenz", DivisionTier::T1, 1.3, Some("https://stats.example/tenz")),
            player("zekken", DivisionTier::T1, 1.2, Some("https://stats.example/zekken")),
            player("nourl", DivisionTier::T2, 1.0, None),
            player("rookie", DivisionTier::T3, 0.9, Some("https://stats.example/rookie")),
        ]));
        let config = SchedulerConfig {
            refresh_pages: 7,
            triggers_enabled: false,
            ..SchedulerConfig::default()
        };
        let scheduler =
            Scheduler::new(config, repo, extractor, Arc::new(ScriptedEarnings::new())).unwrap();
        State(Arc::new(AppState::new(GatewayConfig::default(), Arc::new(scheduler))))
    }

    fn test_state() -> State<Arc<AppState>> {
        test_state_with(Arc::new(ScriptedExtractor::new()))
    }

    // ---- Health & Status ----

    #[tokio::test]
    async fn test_health_check() {
        let json = health_check().await.0;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_of_idle_scheduler() {
        let json = scraper_status(test_state()).await.0;
        assert_eq!(json["queue_length"], 0);
        assert_eq!(json["active_requests"], 0);
        assert_eq!(json["is_running"], false);
        assert!(json["priority_distribution"].as_object().unwrap().is_empty());
    }

    // ---- Manual player update ----

    #[tokio::test]
    async fn test_update_player_queues_task() {
        let state = test_state();
        let (code, json) =
            scraper_update_player(state.clone(), axum::extract::Path("tenz".into())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(json.0["success"], true);
        assert_eq!(json.0["message"], "Player tenz queued for detailed update");

        let status = scraper_status(state).await.0;
        assert_eq!(status["queue_length"], 1);
        assert_eq!(status["priority_distribution"]["999"], 1);
    }

    #[tokio::test]
    async fn test_update_unknown_player_is_bad_request() {
        let (code, json) =
            scraper_update_player(test_state(), axum::extract::Path("ghost".into())).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(json.0["success"], false);
        assert_eq!(json.0["error"], "Player not found: ghost");
    }

    #[tokio::test]
    async fn test_update_player_without_url_is_bad_request() {
        let (code, json) =
            scraper_update_player(test_state(), axum::extract::Path("nourl".into())).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(json.0["error"].as_str().unwrap().contains("no profile URL"));
    }

    // ---- Refresh ----

    #[tokio::test]
    async fn test_refresh_uses_body_params() {
        let extractor = Arc::new(ScriptedExtractor::new());
        let state = test_state_with(extractor.clone());
        let json = scraper_refresh(
            state,
            Some(Json(serde_json::json!({"pages": 3, "detailed": true}))),
        )
        .await
        .0;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Full data refresh scheduled (3 pages, detailed: true)");
        assert!(!json["job_id"].as_str().unwrap().is_empty());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(extractor.refreshes(), vec![(3, true)]);
    }

    #[tokio::test]
    async fn test_refresh_defaults_from_config() {
        let json = scraper_refresh(test_state(), None).await.0;
        assert_eq!(json["message"], "Full data refresh scheduled (7 pages, detailed: false)");
    }

    // ---- Earnings ----

    #[tokio::test]
    async fn test_earnings_default_divisions() {
        let state = test_state();
        let (code, json) = scraper_earnings(state.clone(), None).await;
        assert_eq!(code, StatusCode::OK);
        // T1 + T2 players, all with stale earnings.
        assert_eq!(json.0["queued_players"], 3);
        assert_eq!(json.0["divisions"], serde_json::json!(["T1", "T2"]));

        let status = scraper_status(state).await.0;
        assert_eq!(status["priority_distribution"]["100"], 1);
        assert_eq!(status["priority_distribution"]["99.9"], 1);
    }

    #[tokio::test]
    async fn test_earnings_body_overrides() {
        let body = serde_json::json!({
            "limit": 1,
            "divisions": ["t3", "bogus"],
            "minDaysSinceUpdate": 7,
        });
        let (_, json) = scraper_earnings(test_state(), Some(Json(body))).await;
        assert_eq!(json.0["queued_players"], 1);
        assert_eq!(json.0["divisions"], serde_json::json!(["T3"]));
    }

    #[tokio::test]
    async fn test_earnings_out_of_range_days_is_bad_request() {
        let state = test_state();
        for days in [serde_json::json!(1_000_000_000i64), serde_json::json!(-5)] {
            let body = serde_json::json!({ "minDaysSinceUpdate": days });
            let (code, json) = scraper_earnings(state.clone(), Some(Json(body))).await;
            assert_eq!(code, StatusCode::BAD_REQUEST);
            assert_eq!(json.0["success"], false);
            assert!(json.0["error"].as_str().unwrap().contains("minDaysSinceUpdate"));
        }
        let status = scraper_status(state).await.0;
        assert_eq!(status["queue_length"], 0);
    }

    #[test]
    fn test_earnings_request_parsing() {
        let req = earnings_request(&serde_json::json!({}));
        assert_eq!(req.limit, 50);
        assert_eq!(req.min_days_since_update, 30);
        assert_eq!(req.divisions, vec![DivisionTier::T1, DivisionTier::T2]);

        let req = earnings_request(&serde_json::json!({"divisions": ["nope"], "limit": 5}));
        assert_eq!(req.limit, 5);
        assert_eq!(req.divisions, vec![DivisionTier::T1, DivisionTier::T2]);
    }
}
