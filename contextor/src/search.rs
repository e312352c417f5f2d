//! Search Gateway: one kNN query per call, bounded by a timeout.

use std::{sync::Arc, time::Duration, time::Instant};

use rag_store::{ScoredPassage, SearchService};
use tokio::time::timeout;
use tracing::{error, info};

use crate::error::{ContextorError, Stage};
use crate::rewrite::timed_out;
use crate::short;

pub struct SearchGateway {
    search: Arc<dyn SearchService>,
    top_k: u64,
    timeout: Duration,
}

impl SearchGateway {
    pub fn new(search: Arc<dyn SearchService>, top_k: u64, timeout: Duration) -> Self {
        Self {
            search,
            top_k,
            timeout,
        }
    }

    pub fn top_k(&self) -> u64 {
        self.top_k
    }

    /// Returns at most `top_k` passages in index order (not re-sorted).
    /// `query` is only used for logging.
    ///
    /// # Errors
    /// `Upstream { stage: Search }` on transport/index failure or timeout;
    /// no partial result is returned.
    pub async fn search(
        &self,
        query: &str,
        vector: Vec<f32>,
    ) -> Result<Vec<ScoredPassage>, ContextorError> {
        let started = Instant::now();
        let mut hits = match timeout(self.timeout, self.search.knn(vector, self.top_k)).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                error!(stage = "search", query = %short(query), error = %e, "vector search failed");
                return Err(ContextorError::upstream(Stage::Search, e));
            }
            Err(_) => {
                error!(stage = "search", query = %short(query), "vector search timed out");
                return Err(timed_out(Stage::Search, self.timeout));
            }
        };
        hits.truncate(self.top_k as usize);
        info!(
            stage = "search",
            hits = hits.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "vector search completed"
        );
        Ok(hits)
    }
}
