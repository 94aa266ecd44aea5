//! Research insights board.
//!
//! Three independent endpoints feed the insights page: the landscape
//! summary, topic clusters and recommended papers. A refresh fans out all
//! three requests at once and joins on them; each slice is written as soon
//! as its own request settles, so one failing endpoint never holds back the
//! other two. The board is `ready` once every slice of the current refresh
//! has settled.

use crate::coordinator::RequestCoordinator;
use crate::error::RequestError;
use crate::transport::ApiRequest;
use crate::types::{PaperSummary, ResearchInsights, TopicCluster};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const INSIGHTS_OPERATION: &str = "insights";
pub const CLUSTERS_OPERATION: &str = "topics.clusters";
pub const RECOMMENDED_OPERATION: &str = "research.recommended";

pub const INSIGHTS_PATH: &str = "/api/research/insights";
pub const CLUSTERS_PATH: &str = "/api/topics/clusters";
pub const RECOMMENDED_PATH: &str = "/api/research/recommended";

/// One independently refreshed piece of a view model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Slice<T> {
    pub data: T,
    /// Message of the last failed fetch; `data` is empty in that case.
    pub error: Option<String>,
    /// Whether the latest fetch has completed (successfully or not).
    pub settled: bool,
}

impl<T: Default> Slice<T> {
    pub(crate) fn begin(&mut self) {
        self.settled = false;
    }

    /// Apply a fetch result. Superseded results leave the slice untouched.
    pub(crate) fn apply(&mut self, outcome: Result<T, RequestError>, what: &str) {
        match outcome {
            Ok(data) => {
                self.data = data;
                self.error = None;
                self.settled = true;
            }
            Err(e) if e.is_superseded() => {}
            Err(e) => {
                warn!(slice = what, error = %e, "Fetch failed; showing empty slice");
                self.data = T::default();
                self.error = Some(e.to_string());
                self.settled = true;
            }
        }
    }
}

/// Read-only view model for the insights page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsightsSnapshot {
    pub insights: Slice<ResearchInsights>,
    pub clusters: Slice<Vec<TopicCluster>>,
    pub recommended: Slice<Vec<PaperSummary>>,
    /// All three slices of the current refresh have settled.
    pub ready: bool,
}

#[derive(Debug, Default)]
struct BoardState {
    snapshot: InsightsSnapshot,
    round: u64,
}

/// Fetches and holds the three insights slices.
#[derive(Clone)]
pub struct InsightsBoard {
    coordinator: Arc<RequestCoordinator>,
    state: Arc<Mutex<BoardState>>,
}

impl InsightsBoard {
    pub fn new(coordinator: Arc<RequestCoordinator>) -> Self {
        Self {
            coordinator,
            state: Arc::new(Mutex::new(BoardState::default())),
        }
    }

    pub fn snapshot(&self) -> InsightsSnapshot {
        self.state.lock().unwrap().snapshot.clone()
    }

    /// Fetch all three slices concurrently.
    pub async fn refresh(&self) -> InsightsSnapshot {
        let round = {
            let mut state = self.state.lock().unwrap();
            state.round += 1;
            state.snapshot.ready = false;
            state.snapshot.insights.begin();
            state.snapshot.clusters.begin();
            state.snapshot.recommended.begin();
            state.round
        };
        debug!(round, "Refreshing insights board");

        futures::join!(
            self.fetch(INSIGHTS_OPERATION, INSIGHTS_PATH, |s| &mut s.insights),
            self.fetch(CLUSTERS_OPERATION, CLUSTERS_PATH, |s| &mut s.clusters),
            self.fetch(RECOMMENDED_OPERATION, RECOMMENDED_PATH, |s| &mut s.recommended),
        );

        let mut state = self.state.lock().unwrap();
        if state.round == round {
            let s = &state.snapshot;
            let ready = s.insights.settled && s.clusters.settled && s.recommended.settled;
            state.snapshot.ready = ready;
        }
        state.snapshot.clone()
    }

    async fn fetch<T, F>(&self, operation: &str, path: &str, slice: F)
    where
        T: DeserializeOwned + Default,
        F: FnOnce(&mut InsightsSnapshot) -> &mut Slice<T>,
    {
        let issued = self
            .coordinator
            .issue::<T>(operation, ApiRequest::get(path))
            .await;
        let mut state = self.state.lock().unwrap();
        slice(&mut state.snapshot).apply(issued.outcome, operation);
    }
}
