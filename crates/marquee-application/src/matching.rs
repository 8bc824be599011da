// SPDX-License-Identifier: GPL-3.0-or-later

//! Correlates requests and downloads with a catalog item.
//!
//! Both matchers are pure set-membership tests over a snapshot. Empty inputs
//! yield empty results.

use marquee_domain::{Download, MediaId, MediaType, Request, RequestId, TmdbId};

/// Every request for `tmdb_id` whose shape belongs to `media_type`.
///
/// Movies match `movie` requests only; series match both `series` and
/// per-season requests.
pub fn match_requests(requests: &[Request], tmdb_id: TmdbId, media_type: MediaType) -> Vec<&Request> {
    requests
        .iter()
        .filter(|request| request.tmdb_id == tmdb_id && request.media_type.belongs_to(media_type))
        .collect()
}

/// Keys a download may be correlated by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadMatchKeys {
    pub tmdb_id: TmdbId,
    pub media_type: MediaType,
    pub request_ids: Vec<RequestId>,
    pub availability_request_id: Option<RequestId>,
    pub media_id: Option<MediaId>,
}

impl DownloadMatchKeys {
    fn matches(&self, download: &Download) -> bool {
        if download.tmdb_id == Some(self.tmdb_id) {
            return true;
        }

        if let Some(request_id) = download.request_id {
            if self.request_ids.contains(&request_id)
                || self.availability_request_id == Some(request_id)
            {
                return true;
            }
        }

        match (self.media_id, download.media_id_for(self.media_type)) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// Every download related to the item by catalog id, request id, or internal media id.
pub fn match_downloads<'a>(downloads: &'a [Download], keys: &DownloadMatchKeys) -> Vec<&'a Download> {
    downloads
        .iter()
        .filter(|download| keys.matches(download))
        .collect()
}
