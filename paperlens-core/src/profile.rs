//! Profile save / analyze workflow.
//!
//! The researcher profile view edits three form fields and offers two
//! actions: "save" persists the fields, "analyze" persists them and then
//! asks the backend for an AI analysis. Both run through an explicit state
//! machine:
//!
//! ```text
//! Idle|Failed|Succeeded --save()-->    Saving --ok--> Idle
//!                                             --err-> Failed(SaveFailed)
//! Idle|Failed|Succeeded --analyze()--> Saving --ok--> Analyzing --ok--> Succeeded
//!                                             --err-> Failed(SaveFailed)
//!                                                              --err--> Failed(AnalyzeFailed)
//! Succeeded --edit()--> Idle
//! ```
//!
//! While `Saving` or `Analyzing`, new `save`/`analyze`/`load` calls are
//! rejected synchronously: there is never more than one workflow in flight.
//! The last successful analysis is kept apart from the workflow state so it
//! stays readable while a new workflow runs or after one fails.

use crate::coordinator::RequestCoordinator;
use crate::error::{RequestError, WorkflowError};
use crate::transport::ApiRequest;
use crate::types::{AnalysisPayload, Profile, ProfileField, ProfileForm};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub const PROFILE_PATH: &str = "/api/profile";
pub const ANALYZE_PATH: &str = "/api/profile/analyze";

pub const LOAD_OPERATION: &str = "profile.load";
pub const SAVE_OPERATION: &str = "profile.save";
pub const ANALYZE_OPERATION: &str = "profile.analyze";

/// Workflow state of the profile view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileAnalysisState {
    #[default]
    Idle,
    Saving,
    Analyzing,
    Succeeded,
    Failed,
}

impl ProfileAnalysisState {
    /// Whether a workflow is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Saving | Self::Analyzing)
    }
}

impl std::fmt::Display for ProfileAnalysisState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Saving => write!(f, "saving"),
            Self::Analyzing => write!(f, "analyzing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// How a `save` or `analyze` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    /// Another workflow was in flight; nothing was sent.
    Rejected,
    /// The view was reset while the workflow ran; its result was discarded.
    Discarded,
    Saved,
    Analyzed(AnalysisPayload),
    Failed(WorkflowError),
}

/// How a `load` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded,
    /// A workflow was in flight; nothing was sent.
    Rejected,
    /// The form changed while loading; the response was not applied.
    Discarded,
    Failed(RequestError),
}

/// Read-only view model for the profile page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileSnapshot {
    pub state: ProfileAnalysisState,
    pub error: Option<String>,
    pub form: ProfileForm,
    pub analysis: Option<AnalysisPayload>,
    /// The analysis was produced for fields that have since been edited.
    pub analysis_stale: bool,
    pub load_error: Option<String>,
}

#[derive(Debug, Default)]
struct ProfileInner {
    state: ProfileAnalysisState,
    error: Option<WorkflowError>,
    form: ProfileForm,
    analysis: Option<AnalysisPayload>,
    analysis_stale: bool,
    load_error: Option<String>,
    /// Bumped by every edit, workflow start and reset.
    revision: u64,
    /// Bumped by `reset`; in-flight workflows from an older epoch are ignored.
    epoch: u64,
}

/// Drives the profile workflow. Cloning shares the same state.
#[derive(Clone)]
pub struct ProfileOrchestrator {
    coordinator: Arc<RequestCoordinator>,
    inner: Arc<Mutex<ProfileInner>>,
}

impl ProfileOrchestrator {
    pub fn new(coordinator: Arc<RequestCoordinator>) -> Self {
        Self {
            coordinator,
            inner: Arc::new(Mutex::new(ProfileInner::default())),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn state(&self) -> ProfileAnalysisState {
        self.inner.lock().unwrap().state
    }

    pub fn error(&self) -> Option<WorkflowError> {
        self.inner.lock().unwrap().error.clone()
    }

    pub fn form(&self) -> ProfileForm {
        self.inner.lock().unwrap().form.clone()
    }

    /// Last successful analysis, even if a later workflow failed.
    pub fn last_analysis(&self) -> Option<AnalysisPayload> {
        self.inner.lock().unwrap().analysis.clone()
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        let inner = self.inner.lock().unwrap();
        ProfileSnapshot {
            state: inner.state,
            error: inner.error.as_ref().map(|e| e.to_string()),
            form: inner.form.clone(),
            analysis: inner.analysis.clone(),
            analysis_stale: inner.analysis_stale,
            load_error: inner.load_error.clone(),
        }
    }

    // -- form edits ---------------------------------------------------------

    /// Change one form field.
    pub fn edit(&self, field: ProfileField, value: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.form.set(field, value);
        Self::after_edit(&mut inner);
    }

    /// Replace all form fields.
    pub fn set_form(&self, form: ProfileForm) {
        let mut inner = self.inner.lock().unwrap();
        inner.form = form;
        Self::after_edit(&mut inner);
    }

    fn after_edit(inner: &mut ProfileInner) {
        inner.revision += 1;
        if inner.state == ProfileAnalysisState::Succeeded {
            debug!("Profile edited after analysis; returning to idle");
            inner.state = ProfileAnalysisState::Idle;
            inner.analysis_stale = true;
        }
    }

    /// Return to `Idle` as when the view is unmounted.
    ///
    /// Any workflow still in flight is abandoned and its result discarded.
    pub fn reset(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = ProfileAnalysisState::Idle;
            inner.error = None;
            inner.load_error = None;
            inner.revision += 1;
            inner.epoch += 1;
        }
        for operation in [LOAD_OPERATION, SAVE_OPERATION, ANALYZE_OPERATION] {
            if self.coordinator.in_flight(operation) > 0 {
                self.coordinator.supersede(operation);
            }
        }
    }

    // -- network operations -------------------------------------------------

    /// Fetch the stored profile and fill the form and last analysis.
    pub async fn load(&self) -> LoadOutcome {
        let revision = {
            let inner = self.inner.lock().unwrap();
            if inner.state.is_busy() {
                debug!(state = %inner.state, "Rejecting profile load while a workflow runs");
                return LoadOutcome::Rejected;
            }
            inner.revision
        };

        let issued = self
            .coordinator
            .issue::<Profile>(LOAD_OPERATION, ApiRequest::get(PROFILE_PATH))
            .await;

        let mut inner = self.inner.lock().unwrap();
        if inner.revision != revision {
            return LoadOutcome::Discarded;
        }
        match issued.outcome {
            Ok(profile) => {
                inner.form = profile.form();
                if let Some(analysis) = profile.analysis() {
                    inner.analysis = Some(analysis);
                    inner.analysis_stale = false;
                }
                inner.load_error = None;
                LoadOutcome::Loaded
            }
            Err(e) if e.is_superseded() => LoadOutcome::Discarded,
            Err(e) => {
                warn!(error = %e, "Failed to load profile");
                inner.load_error = Some(e.to_string());
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Persist the current form fields.
    pub async fn save(&self) -> WorkflowOutcome {
        let Some((form, epoch, _)) = self.begin("save") else {
            return WorkflowOutcome::Rejected;
        };

        match self.persist(&form).await {
            Ok(()) => self.finish(epoch, |inner| {
                inner.state = ProfileAnalysisState::Idle;
                info!("Profile saved");
                WorkflowOutcome::Saved
            }),
            Err(e) => self.fail(epoch, WorkflowError::SaveFailed(e)),
        }
    }

    /// Persist the current form fields, then request an analysis.
    ///
    /// The analysis request is only sent if the save succeeded.
    pub async fn analyze(&self) -> WorkflowOutcome {
        let Some((form, epoch, revision)) = self.begin("analyze") else {
            return WorkflowOutcome::Rejected;
        };

        if let Err(e) = self.persist(&form).await {
            return self.fail(epoch, WorkflowError::SaveFailed(e));
        }

        {
            let mut inner = self.inner.lock().unwrap();
            if inner.epoch != epoch {
                return WorkflowOutcome::Discarded;
            }
            inner.state = ProfileAnalysisState::Analyzing;
            info!("Profile saved; requesting analysis");
        }

        let issued = self
            .coordinator
            .issue::<AnalysisPayload>(ANALYZE_OPERATION, ApiRequest::post_empty(ANALYZE_PATH))
            .await;

        match issued.outcome {
            Ok(payload) => self.finish(epoch, |inner| {
                inner.analysis = Some(payload.clone());
                if inner.revision == revision {
                    inner.state = ProfileAnalysisState::Succeeded;
                    inner.analysis_stale = false;
                } else {
                    // The form was edited after it was saved; the result
                    // describes the saved fields, not the current ones.
                    debug!("Profile edited during analysis; returning to idle");
                    inner.state = ProfileAnalysisState::Idle;
                    inner.analysis_stale = true;
                }
                info!(
                    conferences = payload.suggested_conferences.len(),
                    papers = payload.suggested_papers.len(),
                    "Profile analysis succeeded"
                );
                WorkflowOutcome::Analyzed(payload)
            }),
            Err(e) => self.fail(epoch, WorkflowError::AnalyzeFailed(e)),
        }
    }

    /// Enter `Saving` unless a workflow is already running.
    ///
    /// Returns the form to persist, the current epoch and the form revision.
    fn begin(&self, action: &str) -> Option<(ProfileForm, u64, u64)> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.is_busy() {
            debug!(action, state = %inner.state, "Rejecting profile workflow while another runs");
            return None;
        }
        inner.state = ProfileAnalysisState::Saving;
        inner.error = None;
        inner.revision += 1;
        Some((inner.form.clone(), inner.epoch, inner.revision))
    }

    async fn persist(&self, form: &ProfileForm) -> Result<(), RequestError> {
        self.coordinator
            .issue::<serde_json::Value>(SAVE_OPERATION, ApiRequest::post(PROFILE_PATH, form))
            .await
            .into_result()
            .map(|_| ())
    }

    fn finish(
        &self,
        epoch: u64,
        apply: impl FnOnce(&mut ProfileInner) -> WorkflowOutcome,
    ) -> WorkflowOutcome {
        let mut inner = self.inner.lock().unwrap();
        if inner.epoch != epoch {
            return WorkflowOutcome::Discarded;
        }
        let outcome = apply(&mut inner);
        inner.revision += 1;
        outcome
    }

    fn fail(&self, epoch: u64, error: WorkflowError) -> WorkflowOutcome {
        self.finish(epoch, |inner| {
            if error.cause().is_superseded() {
                // Someone else owns the operation now; release the workflow.
                inner.state = ProfileAnalysisState::Idle;
                return WorkflowOutcome::Discarded;
            }
            warn!(error = %error, "Profile workflow failed");
            inner.state = ProfileAnalysisState::Failed;
            inner.error = Some(error.clone());
            WorkflowOutcome::Failed(error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn orchestrator(mock: &Arc<MockTransport>) -> ProfileOrchestrator {
        ProfileOrchestrator::new(Arc::new(RequestCoordinator::new(mock.clone())))
    }

    fn analysis_body() -> serde_json::Value {
        json!({
            "trajectory": "Moving toward clinical deployment.",
            "suggested_conferences": ["NeurIPS", "ML4H"],
            "suggested_papers": [{"title": "Paper A", "venue": "ArXiv", "year": 2024}]
        })
    }

    #[tokio::test]
    async fn test_save_success_returns_to_idle() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(PROFILE_PATH, json!({"id": 1}));
        let profile = orchestrator(&mock);
        profile.edit(ProfileField::Name, "Dr. Jane Doe");

        assert_eq!(profile.save().await, WorkflowOutcome::Saved);
        assert_eq!(profile.state(), ProfileAnalysisState::Idle);

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].body,
            Some(json!({"name": "Dr. Jane Doe", "title": "", "proposal": ""}))
        );
    }

    #[tokio::test]
    async fn test_save_failure_keeps_fields() {
        let mock = Arc::new(MockTransport::new());
        mock.push_status(PROFILE_PATH, 500);
        let profile = orchestrator(&mock);
        profile.edit(ProfileField::Title, "Efficient Transformers");

        let outcome = profile.save().await;
        assert!(matches!(
            outcome,
            WorkflowOutcome::Failed(WorkflowError::SaveFailed(RequestError::Http { status: 500, .. }))
        ));
        assert_eq!(profile.state(), ProfileAnalysisState::Failed);
        assert_eq!(profile.form().title, "Efficient Transformers");
    }

    #[tokio::test]
    async fn test_analyze_happy_path() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(PROFILE_PATH, json!({"id": 1}));
        mock.push_json(ANALYZE_PATH, analysis_body());
        let profile = orchestrator(&mock);

        let outcome = profile.analyze().await;
        let WorkflowOutcome::Analyzed(payload) = outcome else {
            panic!("Expected Analyzed, got {:?}", outcome);
        };
        assert_eq!(payload.suggested_conferences, vec!["NeurIPS", "ML4H"]);
        assert_eq!(profile.state(), ProfileAnalysisState::Succeeded);
        assert_eq!(profile.last_analysis(), Some(payload));

        let paths: Vec<String> = mock.calls().into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec![PROFILE_PATH, ANALYZE_PATH]);
    }

    #[tokio::test]
    async fn test_analyze_save_failure_skips_analysis_call() {
        let mock = Arc::new(MockTransport::new());
        mock.push_status(PROFILE_PATH, 500);
        mock.push_json(ANALYZE_PATH, analysis_body());
        let profile = orchestrator(&mock);

        let outcome = profile.analyze().await;
        assert!(matches!(
            outcome,
            WorkflowOutcome::Failed(WorkflowError::SaveFailed(_))
        ));
        assert_eq!(mock.call_count(ANALYZE_PATH), 0);
        assert_eq!(profile.state(), ProfileAnalysisState::Failed);
    }

    #[tokio::test]
    async fn test_analyze_failure_keeps_previous_analysis() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(PROFILE_PATH, json!({}));
        mock.push_json(ANALYZE_PATH, analysis_body());
        mock.push_json(PROFILE_PATH, json!({}));
        mock.push_status(ANALYZE_PATH, 502);
        let profile = orchestrator(&mock);

        profile.analyze().await;
        let first = profile.last_analysis();
        assert!(first.is_some());

        let outcome = profile.analyze().await;
        assert!(matches!(
            outcome,
            WorkflowOutcome::Failed(WorkflowError::AnalyzeFailed(_))
        ));
        assert_eq!(profile.state(), ProfileAnalysisState::Failed);
        assert_eq!(profile.last_analysis(), first);
        // Both saves went through; nothing is rolled back.
        assert_eq!(mock.call_count(PROFILE_PATH), 2);
    }

    #[tokio::test]
    async fn test_analyze_while_analyzing_is_rejected() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(PROFILE_PATH, json!({}));
        let gate = mock.push_gated(ANALYZE_PATH, Ok(analysis_body()));
        let profile = orchestrator(&mock);

        let (first, (second, state_during, calls_during)) = tokio::join!(profile.analyze(), async {
            // Let the first workflow reach the analysis request.
            while profile.state() != ProfileAnalysisState::Analyzing {
                tokio::task::yield_now().await;
            }
            let calls_before = mock.total_calls();
            let second = profile.analyze().await;
            let state = profile.state();
            let calls_after = mock.total_calls();
            gate.release();
            (second, state, calls_after - calls_before)
        });

        assert_eq!(second, WorkflowOutcome::Rejected);
        assert_eq!(state_during, ProfileAnalysisState::Analyzing);
        assert_eq!(calls_during, 0);
        assert!(matches!(first, WorkflowOutcome::Analyzed(_)));
    }

    #[tokio::test]
    async fn test_edit_after_success_returns_to_idle() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(PROFILE_PATH, json!({}));
        mock.push_json(ANALYZE_PATH, analysis_body());
        let profile = orchestrator(&mock);
        profile.analyze().await;

        profile.edit(ProfileField::Proposal, "A new direction");
        let snapshot = profile.snapshot();
        assert_eq!(snapshot.state, ProfileAnalysisState::Idle);
        assert!(snapshot.analysis_stale);
        assert!(snapshot.analysis.is_some());
    }

    #[tokio::test]
    async fn test_edit_during_analysis_marks_result_stale() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(PROFILE_PATH, json!({}));
        let gate = mock.push_gated(ANALYZE_PATH, Ok(analysis_body()));
        let profile = orchestrator(&mock);
        profile.edit(ProfileField::Proposal, "old");

        let (outcome, ()) = tokio::join!(profile.analyze(), async {
            while profile.state() != ProfileAnalysisState::Analyzing {
                tokio::task::yield_now().await;
            }
            profile.edit(ProfileField::Proposal, "new");
            gate.release();
        });

        assert!(matches!(outcome, WorkflowOutcome::Analyzed(_)));
        assert_eq!(
            mock.calls()[0].body.as_ref().unwrap()["proposal"],
            json!("old")
        );
        let snapshot = profile.snapshot();
        assert_eq!(snapshot.form.proposal, "new");
        assert_eq!(snapshot.state, ProfileAnalysisState::Idle);
        assert!(snapshot.analysis_stale);
        assert!(snapshot.analysis.is_some());
    }

    #[tokio::test]
    async fn test_analysis_without_edits_is_fresh() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(PROFILE_PATH, json!({}));
        mock.push_json(ANALYZE_PATH, analysis_body());
        let profile = orchestrator(&mock);
        profile.edit(ProfileField::Name, "Ada");

        profile.analyze().await;
        let snapshot = profile.snapshot();
        assert_eq!(snapshot.state, ProfileAnalysisState::Succeeded);
        assert!(!snapshot.analysis_stale);
    }

    #[tokio::test]
    async fn test_load_fills_form_and_analysis() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            PROFILE_PATH,
            json!({
                "id": 1,
                "name": "Jane",
                "title": null,
                "proposal": "RAG for clinics",
                "trajectory": "Promising.",
                "suggested_conferences": "[\"AAAI\"]",
                "suggested_papers": null
            }),
        );
        let profile = orchestrator(&mock);

        assert_eq!(profile.load().await, LoadOutcome::Loaded);
        let snapshot = profile.snapshot();
        assert_eq!(snapshot.form.name, "Jane");
        assert_eq!(snapshot.form.title, "");
        assert_eq!(
            snapshot.analysis.unwrap().suggested_conferences,
            vec!["AAAI"]
        );
    }

    #[tokio::test]
    async fn test_load_failure_is_not_a_workflow_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.push_status(PROFILE_PATH, 404);
        let profile = orchestrator(&mock);

        assert!(matches!(profile.load().await, LoadOutcome::Failed(_)));
        assert_eq!(profile.state(), ProfileAnalysisState::Idle);
        assert!(profile.snapshot().load_error.is_some());
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_workflow() {
        let mock = Arc::new(MockTransport::new());
        let gate = mock.push_gated(PROFILE_PATH, Ok(json!({})));
        let profile = orchestrator(&mock);

        let (outcome, ()) = tokio::join!(profile.save(), async {
            profile.reset();
            gate.release();
        });

        assert_eq!(outcome, WorkflowOutcome::Discarded);
        assert_eq!(profile.state(), ProfileAnalysisState::Idle);
        assert!(profile.error().is_none());
    }

    #[test]
    fn test_state_display_and_busy() {
        assert_eq!(ProfileAnalysisState::Analyzing.to_string(), "analyzing");
        assert!(ProfileAnalysisState::Saving.is_busy());
        assert!(!ProfileAnalysisState::Failed.is_busy());
    }
}
