// SPDX-License-Identifier: GPL-3.0-or-later

//! Reduces requests, downloads and an availability hint into one status vector.
//!
//! Resolution is recomputed from scratch for every snapshot; nothing here
//! caches between calls.

use marquee_domain::{
    AvailabilityInfo, Download, MediaId, MediaReference, Request, RequestStatus, UserId,
};
use serde::Serialize;
use tracing::trace;

use crate::matching::{match_downloads, match_requests, DownloadMatchKeys};

/// Single status over every request matching an item.
///
/// `Available` requires unanimity so one imported season never reads as a
/// fully available series. After that, `Pending` outranks `Approved`.
pub fn aggregate_status(requests: &[&Request]) -> Option<RequestStatus> {
    let first = requests.first()?;

    if requests
        .iter()
        .all(|request| request.status == RequestStatus::Available)
    {
        return Some(RequestStatus::Available);
    }
    if requests
        .iter()
        .any(|request| request.status == RequestStatus::Pending)
    {
        return Some(RequestStatus::Pending);
    }
    if requests
        .iter()
        .any(|request| request.status == RequestStatus::Approved)
    {
        return Some(RequestStatus::Approved);
    }

    Some(first.status)
}

/// Everything the resolver looks at for one item.
#[derive(Debug, Clone, Copy)]
pub struct StatusInputs<'a> {
    pub reference: MediaReference,
    pub requests: &'a [Request],
    pub downloads: &'a [Download],
    pub availability: Option<&'a AvailabilityInfo>,
    /// View-level override: the caller already knows the item is in the library.
    pub in_library: bool,
    /// View-level override: the caller just submitted a request.
    pub requested: bool,
    pub current_user_id: Option<UserId>,
}

impl<'a> StatusInputs<'a> {
    pub fn new(reference: MediaReference, requests: &'a [Request], downloads: &'a [Download]) -> Self {
        Self {
            reference,
            requests,
            downloads,
            availability: None,
            in_library: false,
            requested: false,
            current_user_id: None,
        }
    }

    pub fn with_availability(mut self, availability: &'a AvailabilityInfo) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn with_user(mut self, user_id: Option<UserId>) -> Self {
        self.current_user_id = user_id;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatus {
    pub in_library: bool,
    pub has_existing_request: bool,
    pub is_own_request: bool,
    pub is_approved: bool,
    pub is_available: bool,
    pub can_request: bool,
    pub has_active_download: bool,
    pub request_status: Option<RequestStatus>,
    pub current_request: Option<Request>,
    /// Internal library id used to correlate downloads, when one is known.
    pub media_id: Option<MediaId>,
}

pub fn resolve_status(inputs: &StatusInputs<'_>) -> MediaStatus {
    let reference = inputs.reference;
    let availability = inputs.availability.cloned().unwrap_or_default();

    let matched = match_requests(inputs.requests, reference.tmdb_id, reference.media_type);

    let current_request = matched.first().copied().or_else(|| {
        availability
            .existing_request_id
            .and_then(|id| inputs.requests.iter().find(|request| request.id == id))
    });

    let request_status = aggregate_status(&matched).or(availability.existing_request_status);

    let resolved_into_library = request_status == Some(RequestStatus::Available)
        && if matched.is_empty() {
            current_request.is_some_and(|request| request.media_id.is_some())
        } else {
            matched.iter().all(|request| request.media_id.is_some())
        };
    let in_library =
        inputs.in_library || availability.in_library.unwrap_or(false) || resolved_into_library;

    let has_existing_request =
        inputs.requested || !matched.is_empty() || availability.existing_request_id.is_some();

    let is_own_request = inputs.requested
        || !matched.is_empty()
        || matches!(
            (availability.existing_request_user_id, inputs.current_user_id),
            (Some(owner), Some(current)) if owner == current
        );

    let can_request = !inputs.requested
        && matched.is_empty()
        && current_request.is_none()
        && !has_existing_request
        && availability.can_request.unwrap_or(!in_library);

    let media_id = availability
        .media_id
        .or_else(|| matched.iter().find_map(|request| request.media_id))
        .or_else(|| current_request.and_then(|request| request.media_id));

    let keys = DownloadMatchKeys {
        tmdb_id: reference.tmdb_id,
        media_type: reference.media_type,
        request_ids: matched.iter().map(|request| request.id).collect(),
        availability_request_id: availability.existing_request_id,
        media_id,
    };
    let has_active_download = !match_downloads(inputs.downloads, &keys).is_empty();

    trace!(
        target: "status",
        tmdb_id = %reference.tmdb_id,
        media_type = %reference.media_type,
        matched = matched.len(),
        ?request_status,
        has_active_download,
        "resolved media status"
    );

    MediaStatus {
        in_library,
        has_existing_request,
        is_own_request,
        is_approved: request_status == Some(RequestStatus::Approved),
        is_available: request_status == Some(RequestStatus::Available),
        can_request,
        has_active_download,
        request_status,
        current_request: current_request.cloned(),
        media_id,
    }
}
