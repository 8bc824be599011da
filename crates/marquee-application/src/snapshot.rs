// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use marquee_domain::{AvailabilityInfo, Download, MediaReference, Request, UserId};
use tracing::debug;

use crate::error::ServiceResult;
use crate::progress::{aggregate_progress, summarize, DownloadProgress};
use crate::services::ReadModel;
use crate::status::{resolve_status, MediaStatus, StatusInputs};

/// One read of the shared request/download read model.
///
/// Status and progress are derived from the snapshot on demand; a newer
/// snapshot replaces this one wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySnapshot {
    pub requests: Vec<Request>,
    pub downloads: Vec<Download>,
    pub taken_at: DateTime<Utc>,
}

impl LibrarySnapshot {
    pub fn new(requests: Vec<Request>, downloads: Vec<Download>) -> Self {
        Self {
            requests,
            downloads,
            taken_at: Utc::now(),
        }
    }

    pub async fn fetch<R>(read_model: &R) -> ServiceResult<Self>
    where
        R: ReadModel + ?Sized,
    {
        let (requests, downloads) =
            tokio::try_join!(read_model.list_requests(), read_model.list_downloads())?;
        debug!(
            target: "status",
            requests = requests.len(),
            downloads = downloads.len(),
            "read model snapshot taken"
        );
        Ok(Self::new(requests, downloads))
    }

    pub fn resolve(
        &self,
        reference: MediaReference,
        availability: Option<&AvailabilityInfo>,
        current_user_id: Option<UserId>,
    ) -> MediaStatus {
        let mut inputs =
            StatusInputs::new(reference, &self.requests, &self.downloads).with_user(current_user_id);
        inputs.availability = availability;
        resolve_status(&inputs)
    }

    /// Aggregated progress for the library item behind `status`, if it has one.
    pub fn progress_for(&self, reference: MediaReference, status: &MediaStatus) -> DownloadProgress {
        match status.media_id {
            Some(media_id) => aggregate_progress(&self.downloads, media_id, reference.media_type),
            None => summarize(&[]),
        }
    }
}
