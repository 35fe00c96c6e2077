//! Debounced stop-name search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use transight_transit::{Position, SearchResult, TransitBackend, TransitError};
use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    Results(Vec<SearchResult>),
    /// Query too short to send, or nothing matched
    Empty,
    /// A newer query was typed; this one was dropped
    Superseded,
    Failed(TransitError),
}

/// Turns keystrokes into at most one backend query per pause in typing.
///
/// Every call to [`search`](Self::search) takes the next sequence number and
/// waits out the debounce window; only the newest call reaches the backend,
/// and only the newest response is returned as results.
pub struct SearchIndexClient {
    backend: Arc<dyn TransitBackend>,
    debounce: Duration,
    min_chars: usize,
    latest: AtomicU64,
    last_results: Mutex<Vec<SearchResult>>,
}

impl SearchIndexClient {
    pub fn new(backend: Arc<dyn TransitBackend>, debounce: Duration, min_chars: usize) -> Self {
        Self {
            backend,
            debounce,
            min_chars,
            latest: AtomicU64::new(0),
            last_results: Mutex::new(Vec::new()),
        }
    }

    /// Results of the newest query that completed; kept across failures
    pub fn last_results(&self) -> Vec<SearchResult> {
        self.last_results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn search(&self, query: &str, around: Option<Position>) -> SearchOutcome {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();

        if query.graphemes(true).count() < self.min_chars {
            self.store(Vec::new());
            return SearchOutcome::Empty;
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_latest(seq) {
            tracing::debug!(seq, "search superseded while debouncing");
            return SearchOutcome::Superseded;
        }

        tracing::debug!(seq, query, "searching stops");
        let response = self.backend.search_stops(query, around).await;
        if !self.is_latest(seq) {
            tracing::debug!(seq, "discarded superseded search response");
            return SearchOutcome::Superseded;
        }

        match response {
            Ok(results) if results.is_empty() => {
                self.store(Vec::new());
                SearchOutcome::Empty
            }
            Ok(results) => {
                self.store(results.clone());
                SearchOutcome::Results(results)
            }
            Err(error) => {
                tracing::warn!(%error, "stop search failed");
                SearchOutcome::Failed(error)
            }
        }
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == seq
    }

    fn store(&self, results: Vec<SearchResult>) {
        *self
            .last_results
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = results;
    }
}
