//! Request coordinator.
//!
//! Every network call in the crate goes through [`RequestCoordinator::issue`].
//! Each call gets a sequence number scoped to its logical operation id, and
//! only the response to the highest sequence number ever issued for that
//! operation is allowed through. Older responses are marked superseded and
//! their payload is dropped undecoded, so out-of-order arrivals can never
//! overwrite newer state.
//!
//! When the transport can abort in-flight calls, issuing a newer request
//! cancels the older one instead of waiting for it to come back.

use crate::error::RequestError;
use crate::transport::{ApiRequest, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lifecycle of a single issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Resolved,
    Superseded,
    Failed,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Resolved => write!(f, "resolved"),
            RequestStatus::Superseded => write!(f, "superseded"),
            RequestStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Identity and final status of an issued request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHandle {
    pub operation: String,
    pub sequence: u64,
    pub status: RequestStatus,
}

/// What [`RequestCoordinator::issue`] hands back once a request settles.
///
/// `outcome` is `Ok` exactly when `handle.status` is `Resolved`.
#[derive(Debug)]
pub struct Issued<T> {
    pub handle: RequestHandle,
    pub outcome: Result<T, RequestError>,
}

impl<T> Issued<T> {
    pub fn into_result(self) -> Result<T, RequestError> {
        self.outcome
    }

    pub fn is_resolved(&self) -> bool {
        self.handle.status == RequestStatus::Resolved
    }

    pub fn is_superseded(&self) -> bool {
        self.handle.status == RequestStatus::Superseded
    }
}

#[derive(Debug, Default)]
struct OperationState {
    /// Highest sequence number issued so far (0 = never issued).
    latest: u64,
    in_flight: usize,
    last_settled: Option<(u64, RequestStatus)>,
    /// Abort token of the most recent request, when the transport supports abort.
    abort: Option<CancellationToken>,
}

/// Issues requests and enforces the latest-request-wins rule per operation.
pub struct RequestCoordinator {
    transport: Arc<dyn Transport>,
    operations: Mutex<HashMap<String, OperationState>>,
}

impl RequestCoordinator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            operations: Mutex::new(HashMap::new()),
        }
    }

    /// Issue `request` under `operation` and wait for it to settle.
    ///
    /// The payload is decoded into `T` only if this request is still the
    /// latest for its operation when the response arrives.
    pub async fn issue<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: ApiRequest,
    ) -> Issued<T> {
        let (sequence, abort) = self.begin(operation);
        debug!(operation, sequence, request = %request, "Issuing request");

        let raw = match abort {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    reply = self.transport.send(request) => Some(reply),
                }
            }
            None => Some(self.transport.send(request).await),
        };

        self.settle(operation, sequence, raw)
    }

    /// Supersede whatever is in flight for `operation` without issuing anything.
    ///
    /// Returns the sequence number that was reserved, so later responses to
    /// older requests are dropped.
    pub fn supersede(&self, operation: &str) -> u64 {
        let mut operations = self.operations.lock().unwrap();
        let state = operations.entry(operation.to_string()).or_default();
        state.latest += 1;
        if let Some(token) = state.abort.take() {
            token.cancel();
        }
        debug!(operation, sequence = state.latest, "Superseded in-flight requests");
        state.latest
    }

    /// Highest sequence number issued for `operation` (0 if none).
    pub fn latest_sequence(&self, operation: &str) -> u64 {
        self.operations
            .lock()
            .unwrap()
            .get(operation)
            .map(|s| s.latest)
            .unwrap_or(0)
    }

    /// Number of requests for `operation` that have not settled yet.
    pub fn in_flight(&self, operation: &str) -> usize {
        self.operations
            .lock()
            .unwrap()
            .get(operation)
            .map(|s| s.in_flight)
            .unwrap_or(0)
    }

    /// Handle of the most recently settled request for `operation`.
    pub fn last_settled(&self, operation: &str) -> Option<RequestHandle> {
        let operations = self.operations.lock().unwrap();
        let (sequence, status) = operations.get(operation)?.last_settled?;
        Some(RequestHandle {
            operation: operation.to_string(),
            sequence,
            status,
        })
    }

    fn begin(&self, operation: &str) -> (u64, Option<CancellationToken>) {
        let abortable = self.transport.supports_abort();
        let mut operations = self.operations.lock().unwrap();
        let state = operations.entry(operation.to_string()).or_default();

        state.latest += 1;
        state.in_flight += 1;

        let token = if abortable {
            if let Some(previous) = state.abort.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            state.abort = Some(token.clone());
            Some(token)
        } else {
            None
        };

        (state.latest, token)
    }

    fn settle<T: DeserializeOwned>(
        &self,
        operation: &str,
        sequence: u64,
        raw: Option<Result<Value, RequestError>>,
    ) -> Issued<T> {
        let mut operations = self.operations.lock().unwrap();
        let state = operations.entry(operation.to_string()).or_default();
        state.in_flight = state.in_flight.saturating_sub(1);

        let is_latest = state.latest == sequence;
        if is_latest {
            state.abort = None;
        }

        let (status, outcome) = match raw {
            None => (
                RequestStatus::Superseded,
                Err(RequestError::Aborted {
                    operation: operation.to_string(),
                    sequence,
                }),
            ),
            // Stale requests never surface anything, failures included.
            Some(_) if !is_latest => (
                RequestStatus::Superseded,
                Err(RequestError::Superseded {
                    operation: operation.to_string(),
                    sequence,
                }),
            ),
            Some(Ok(value)) => match serde_json::from_value::<T>(value) {
                Ok(payload) => (RequestStatus::Resolved, Ok(payload)),
                Err(e) => (
                    RequestStatus::Failed,
                    Err(RequestError::Decode {
                        message: e.to_string(),
                    }),
                ),
            },
            Some(Err(e)) => (RequestStatus::Failed, Err(e)),
        };

        match &outcome {
            Ok(_) => debug!(operation, sequence, "Request resolved"),
            Err(e) if e.is_superseded() => {
                debug!(operation, sequence, latest = state.latest, "Dropping superseded response")
            }
            Err(e) => warn!(operation, sequence, error = %e, "Request failed"),
        }

        if status != RequestStatus::Superseded {
            state.last_settled = Some((sequence, status));
        }

        Issued {
            handle: RequestHandle {
                operation: operation.to_string(),
                sequence,
                status,
            },
            outcome,
        }
    }
}
