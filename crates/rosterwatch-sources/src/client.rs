//! `BackendClient` — Repository, Extractor and EarningsClient over HTTP.
//!
//! Every call is a JSON request under `{base}/internal/`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use rosterwatch_core::config::SourcesConfig;
use rosterwatch_core::traits::{EarningsClient, Extractor, Repository};
use rosterwatch_core::{
    EarningsOutcome, Entity, Player, RefreshSummary, Result, RosterWatchError, StaleFilter,
};

/// Body returned by the scrape endpoints.
#[derive(Debug, Deserialize)]
struct ScrapeAck {
    success: bool,
}

pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RosterWatchError::Http(format!("client build failed: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build API URL for an internal path.
    fn api_url(&self, path: &str) -> String {
        format!("{}/internal/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.api_url(path);
        tracing::debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RosterWatchError::Fetch(format!("GET {url} failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(&url, response).await.map(Some)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let url = self.api_url(path);
        tracing::debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RosterWatchError::Fetch(format!("POST {url} failed: {e}")))?;
        decode(&url, response).await
    }

    async fn scrape(&self, path: &str, body: serde_json::Value) -> Result<bool> {
        let ack: ScrapeAck = self.post(path, body).await?;
        Ok(ack.success)
    }
}

async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if let Some(err) = classify_status(url, status) {
        return Err(err);
    }
    response
        .json()
        .await
        .map_err(|e| RosterWatchError::Parse(format!("{url}: bad response body: {e}")))
}

/// Map a non-success status to the error the retry policy expects.
fn classify_status(url: &str, status: StatusCode) -> Option<RosterWatchError> {
    if status.is_success() {
        None
    } else if status.is_server_error() {
        Some(RosterWatchError::Fetch(format!("{url} returned {status}")))
    } else if status == StatusCode::UNPROCESSABLE_ENTITY {
        Some(RosterWatchError::Parse(format!("{url} could not parse source page")))
    } else {
        Some(RosterWatchError::Http(format!("{url} returned {status}")))
    }
}

#[async_trait]
impl Repository for BackendClient {
    async fn find_player(&self, id: &str) -> Result<Option<Player>> {
        self.get(&format!("players/{id}")).await
    }

    async fn find_stale(&self, filter: &StaleFilter) -> Result<Vec<Entity>> {
        let body = serde_json::to_value(filter)
            .map_err(|e| RosterWatchError::Repository(format!("filter encode failed: {e}")))?;
        self.post("stale", body).await
    }
}

#[async_trait]
impl Extractor for BackendClient {
    async fn scrape_player(&self, player_id: &str, source_url: &str) -> Result<bool> {
        self.scrape(
            "scrape/player",
            serde_json::json!({ "player_id": player_id, "source_url": source_url }),
        )
        .await
    }

    async fn update_team(&self, team_id: &str) -> Result<bool> {
        self.scrape(&format!("scrape/team/{team_id}"), serde_json::json!({}))
            .await
    }

    async fn update_tournament(&self, tournament_id: &str) -> Result<bool> {
        self.scrape(
            &format!("scrape/tournament/{tournament_id}"),
            serde_json::json!({}),
        )
        .await
    }

    async fn refresh_pages(&self, pages: u32, detailed: bool) -> Result<RefreshSummary> {
        self.post(
            "scrape/refresh",
            serde_json::json!({ "pages": pages, "detailed": detailed }),
        )
        .await
    }
}

#[async_trait]
impl EarningsClient for BackendClient {
    async fn process(&self, player_id: &str) -> Result<EarningsOutcome> {
        self.post(&format!("earnings/{player_id}"), serde_json::json!({}))
            .await
    }
}
