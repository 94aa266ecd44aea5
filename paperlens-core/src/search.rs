//! Search-as-you-type query executor.
//!
//! Each non-blank query is posted to `POST /api/search` under the
//! `"search"` operation. Race safety comes entirely from the request
//! coordinator: a response is applied only if no newer query was issued in
//! the meantime, so a slow earlier query can never replace the results of a
//! later one. Applied results replace the session wholesale.

use crate::coordinator::RequestCoordinator;
use crate::transport::ApiRequest;
use crate::types::{PaperSummary, SearchRequest, SearchResponse};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const SEARCH_OPERATION: &str = "search";
pub const SEARCH_PATH: &str = "/api/search";

/// Results of the most recently applied query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSession {
    pub query: String,
    /// Sequence number of the request that produced these results (0 = none yet).
    pub sequence: u64,
    pub results: Vec<PaperSummary>,
    /// Set when the query failed; `results` is empty in that case.
    pub error: Option<String>,
}

/// What happened to a `search` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank query; no request was sent.
    Ignored,
    Applied { sequence: u64, results: usize },
    /// A newer query was issued before this one returned.
    Superseded { sequence: u64 },
    Failed { sequence: u64, error: String },
}

/// Executes search queries and owns the current [`SearchSession`].
#[derive(Clone)]
pub struct SearchExecutor {
    coordinator: Arc<RequestCoordinator>,
    limit: usize,
    session: Arc<Mutex<SearchSession>>,
}

impl SearchExecutor {
    pub fn new(coordinator: Arc<RequestCoordinator>, limit: usize) -> Self {
        Self {
            coordinator,
            limit,
            session: Arc::new(Mutex::new(SearchSession::default())),
        }
    }

    pub fn session(&self) -> SearchSession {
        self.session.lock().unwrap().clone()
    }

    /// Run `query` and, if it is still the latest when it returns, replace
    /// the session with its results.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            debug!("Ignoring blank search query");
            return SearchOutcome::Ignored;
        }

        let body = SearchRequest {
            query: query.to_string(),
            limit: self.limit,
        };
        let issued = self
            .coordinator
            .issue::<SearchResponse>(SEARCH_OPERATION, ApiRequest::post(SEARCH_PATH, &body))
            .await;
        let sequence = issued.handle.sequence;

        let mut session = self.session.lock().unwrap();
        match issued.outcome {
            Err(e) if e.is_superseded() => SearchOutcome::Superseded { sequence },
            // `clear` may have moved the session past this sequence.
            _ if sequence <= session.sequence => SearchOutcome::Superseded { sequence },
            Ok(response) => {
                let results = response.results.len();
                debug!(query, sequence, results, "Applying search results");
                *session = SearchSession {
                    query: query.to_string(),
                    sequence,
                    results: response.results,
                    error: None,
                };
                SearchOutcome::Applied { sequence, results }
            }
            Err(e) => {
                warn!(query, sequence, error = %e, "Search failed; clearing results");
                *session = SearchSession {
                    query: query.to_string(),
                    sequence,
                    results: Vec::new(),
                    error: Some(e.to_string()),
                };
                SearchOutcome::Failed {
                    sequence,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Drop the current results and ignore any query still in flight.
    pub fn clear(&self) {
        let sequence = self.coordinator.supersede(SEARCH_OPERATION);
        *self.session.lock().unwrap() = SearchSession {
            sequence,
            ..Default::default()
        };
    }
}
