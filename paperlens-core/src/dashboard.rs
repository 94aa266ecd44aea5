//! Dashboard context.
//!
//! [`Dashboard`] is the explicit context object handed to the presentation
//! layer: it builds one transport and one request coordinator and wires every
//! component to them. Components own their state; the dashboard only routes
//! events and collects read-only snapshots.

use crate::catalog::Catalog;
use crate::config::ClientConfig;
use crate::coordinator::RequestCoordinator;
use crate::error::{ConfigError, Result};
use crate::insights::{InsightsBoard, InsightsSnapshot};
use crate::profile::{ProfileOrchestrator, ProfileSnapshot};
use crate::search::{SearchExecutor, SearchSession};
use crate::transport::{HttpTransport, Transport};
use crate::trends::{Palette, TrendSnapshot, TrendView};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Every read-only view model at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub trends: TrendSnapshot,
    pub profile: ProfileSnapshot,
    pub search: SearchSession,
    pub insights: InsightsSnapshot,
}

/// Owns the coordinator and all data components of the dashboard.
pub struct Dashboard {
    coordinator: Arc<RequestCoordinator>,
    pub trends: TrendView,
    pub profile: ProfileOrchestrator,
    pub search: SearchExecutor,
    pub insights: InsightsBoard,
    pub catalog: Catalog,
}

impl Dashboard {
    /// Build a dashboard talking to the configured backend over HTTP.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(ConfigError::Invalid {
                message: problems.join("; "),
            }
            .into());
        }
        let transport = HttpTransport::new(&config.api)?;
        info!(base_url = %transport.base_url(), "Dashboard connected");
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a dashboard on top of an arbitrary transport.
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let coordinator = Arc::new(RequestCoordinator::new(transport));
        Self {
            trends: TrendView::new(coordinator.clone(), Palette::from_config(&config.trends)),
            profile: ProfileOrchestrator::new(coordinator.clone()),
            search: SearchExecutor::new(coordinator.clone(), config.search.limit),
            insights: InsightsBoard::new(coordinator.clone()),
            catalog: Catalog::new(coordinator.clone()),
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<RequestCoordinator> {
        &self.coordinator
    }

    /// Page-load fetches: trends and the insights board, concurrently.
    pub async fn mount(&self) -> DashboardSnapshot {
        futures::join!(self.trends.refresh(), self.insights.refresh());
        self.snapshot()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            trends: self.trends.snapshot(),
            profile: self.profile.snapshot(),
            search: self.search.session(),
            insights: self.insights.snapshot(),
        }
    }
}
