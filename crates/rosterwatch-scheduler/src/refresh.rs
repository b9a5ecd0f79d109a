//! Bulk refresh jobs — full re-imports that skip the queue and the rate limiter.
//!
//! Every job gets an id that is returned to the caller and stamped on the
//! completion log line, so an admin request can be matched to its outcome.

use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use rosterwatch_core::traits::Extractor;
use rosterwatch_core::{RefreshSummary, Result, RosterWatchError};

use crate::triggers::RefreshRequest;

pub struct RefreshJob {
    pub id: Uuid,
    pub request: RefreshRequest,
    handle: JoinHandle<Result<RefreshSummary>>,
}

impl RefreshJob {
    /// Start the refresh in the background.
    pub fn spawn(extractor: Arc<dyn Extractor>, request: RefreshRequest) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(
            "🔄 Refresh job {id} started ({} pages, detailed: {})",
            request.pages,
            request.detailed
        );
        let handle = tokio::spawn(async move {
            extractor.refresh_pages(request.pages, request.detailed).await
        });
        Self {
            id,
            request,
            handle,
        }
    }

    /// Wait for the job and return its outcome.
    pub async fn wait(self) -> Result<RefreshSummary> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(RosterWatchError::Fetch(format!("refresh job {} aborted: {e}", self.id))),
        }
    }

    /// Hand the job to a watcher task that logs the outcome; returns the job id.
    pub fn detach(self) -> Uuid {
        let id = self.id;
        tokio::spawn(async move {
            match self.wait().await {
                Ok(summary) => tracing::info!(
                    "✅ Refresh job {id} done: {} pages, {} players saved",
                    summary.pages_scraped,
                    summary.players_saved
                ),
                Err(e) => tracing::error!("❌ Refresh job {id} failed: {e}"),
            }
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosterwatch_core::memory::ScriptedExtractor;

    #[tokio::test]
    async fn test_job_reports_summary() {
        let extractor = Arc::new(ScriptedExtractor::new());
        let request = RefreshRequest {
            pages: 3,
            detailed: true,
        };
        let job = RefreshJob::spawn(extractor.clone(), request);
        let summary = job.wait().await.unwrap();
        assert_eq!(summary.pages_scraped, 3);
        assert_eq!(extractor.refreshes(), vec![(3, true)]);
    }

    #[tokio::test]
    async fn test_job_failure_is_returned() {
        let extractor = Arc::new(ScriptedExtractor::new());
        extractor.fail_refreshes();
        let request = RefreshRequest {
            pages: 1,
            detailed: false,
        };
        let job = RefreshJob::spawn(extractor, request);
        assert!(matches!(job.wait().await, Err(RosterWatchError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_detached_job_still_runs() {
        let extractor = Arc::new(ScriptedExtractor::new());
        let request = RefreshRequest {
            pages: 2,
            detailed: false,
        };
        let job = RefreshJob::spawn(extractor.clone(), request);
        let expected = job.id;
        assert_eq!(job.detach(), expected);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(extractor.refreshes(), vec![(2, false)]);
    }
}
