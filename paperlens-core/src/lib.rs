//! # Paperlens Core
//!
//! Client data orchestration for the Paperlens research analytics dashboard.
//! Fetches data from the analytics API through a single request coordinator
//! that drops stale responses, reshapes sparse trend records into a dense
//! chart matrix, and runs the profile save/analyze workflow as an explicit
//! state machine.

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod insights;
pub mod profile;
pub mod search;
pub mod transport;
pub mod trends;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{ClientConfig, ColorAssignment, load_config};
pub use coordinator::{Issued, RequestCoordinator, RequestHandle, RequestStatus};
pub use dashboard::{Dashboard, DashboardSnapshot};
pub use error::{ConfigError, PaperlensError, RequestError, Result, WorkflowError};
pub use profile::{ProfileAnalysisState, ProfileOrchestrator, WorkflowOutcome};
pub use search::{SearchExecutor, SearchOutcome, SearchSession};
pub use transport::{ApiRequest, HttpTransport, MockTransport, Transport};
pub use trends::{PivotMatrix, TopicSeries, TrendPivot, pivot, pivot_with};
pub use types::{AnalysisPayload, PaperSummary, ProfileField, ProfileForm, TrendRecord};
