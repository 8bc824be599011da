// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;

use marquee_config::AppConfig;
use marquee_domain::SearchCriteria;

pub mod acquisition;
pub mod control;
pub mod debounce;
pub mod error;
pub mod matching;
pub mod notifications;
pub mod progress;
pub mod release_sorting;
pub mod search_workflow;
pub mod services;
pub mod snapshot;
pub mod status;

pub use acquisition::{AcquisitionControl, AutoSearchTarget};
pub use control::{ControlEvent, ControlMachine, ControlState, SearchMode};
pub use debounce::Debouncer;
pub use error::{ServiceError, ServiceResult};
pub use notifications::{InMemoryNotifier, Notification, NotificationLevel, Notifier, TracingNotifier};
pub use progress::{aggregate_progress, format_bytes, format_eta, format_speed, DownloadProgress, ProgressLabel};
pub use release_sorting::{sort_releases, SortColumn, SortDirection, SortState};
pub use search_workflow::{SearchContext, SearchError, SearchSession};
pub use services::{AutoSearchService, ReadModel, ReleaseSearchService};
pub use snapshot::LibrarySnapshot;
pub use status::{resolve_status, MediaStatus, StatusInputs};

use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self { config, notifier }
    }

    pub fn on_start(&self) {
        info!(
            target: "application",
            backend = %self.config.backend.base_url,
            "application state initialized"
        );
    }

    /// Acquisition control for one library item, using the configured dismiss delay.
    pub fn acquisition_control(&self) -> AcquisitionControl {
        AcquisitionControl::new(self.notifier.clone(), &self.config.acquisition)
    }

    pub fn search_session(&self, context: SearchContext, criteria: SearchCriteria) -> SearchSession {
        SearchSession::new(context, criteria, self.config.acquisition.default_search_limit)
    }
}
