//! Author and paper listings.

use crate::coordinator::RequestCoordinator;
use crate::insights::Slice;
use crate::transport::ApiRequest;
use crate::types::{AuthorSummary, PaperSummary};
use std::sync::{Arc, Mutex};

pub const AUTHORS_OPERATION: &str = "authors";
pub const PAPERS_OPERATION: &str = "papers";

pub const AUTHORS_PATH: &str = "/api/authors";
pub const PAPERS_PATH: &str = "/api/papers";

/// Holds the author and paper lists, each refreshed on its own.
#[derive(Clone)]
pub struct Catalog {
    coordinator: Arc<RequestCoordinator>,
    authors: Arc<Mutex<Slice<Vec<AuthorSummary>>>>,
    papers: Arc<Mutex<Slice<Vec<PaperSummary>>>>,
}

impl Catalog {
    pub fn new(coordinator: Arc<RequestCoordinator>) -> Self {
        Self {
            coordinator,
            authors: Arc::default(),
            papers: Arc::default(),
        }
    }

    pub fn authors(&self) -> Slice<Vec<AuthorSummary>> {
        self.authors.lock().unwrap().clone()
    }

    pub fn papers(&self) -> Slice<Vec<PaperSummary>> {
        self.papers.lock().unwrap().clone()
    }

    /// Fetch `GET /api/authors`; a failure leaves an empty list with the error.
    pub async fn refresh_authors(&self) -> Slice<Vec<AuthorSummary>> {
        self.authors.lock().unwrap().begin();
        let issued = self
            .coordinator
            .issue::<Vec<AuthorSummary>>(AUTHORS_OPERATION, ApiRequest::get(AUTHORS_PATH))
            .await;
        let mut authors = self.authors.lock().unwrap();
        authors.apply(issued.outcome, AUTHORS_OPERATION);
        authors.clone()
    }

    /// Fetch `GET /api/papers`; a failure leaves an empty list with the error.
    pub async fn refresh_papers(&self) -> Slice<Vec<PaperSummary>> {
        self.papers.lock().unwrap().begin();
        let issued = self
            .coordinator
            .issue::<Vec<PaperSummary>>(PAPERS_OPERATION, ApiRequest::get(PAPERS_PATH))
            .await;
        let mut papers = self.papers.lock().unwrap();
        papers.apply(issued.outcome, PAPERS_OPERATION);
        papers.clone()
    }
}
