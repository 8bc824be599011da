// SPDX-License-Identifier: GPL-3.0-or-later

//! Seams to the external data/RPC layer.
//!
//! Nothing here knows about transport; `marquee-infrastructure` provides the
//! HTTP implementations and tests provide in-memory fakes.

use async_trait::async_trait;
use marquee_domain::{
    Download, EpisodeId, MediaId, Release, ReleaseProtocol, Request, SearchCriteria, SlotId,
};
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub releases: Vec<Release>,
    /// Per-indexer failures; results from the other indexers are still valid.
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub indexers_searched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrabMediaType {
    Movie,
    Season,
    Episode,
}

/// Protocol-correct grab request for one release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrabRequest {
    pub guid: String,
    pub title: String,
    pub indexer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexer_id: Option<i64>,
    pub protocol: ReleaseProtocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub size: u64,
    pub media_type: GrabMediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<MediaId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<MediaId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<EpisodeId>,
    pub is_season_pack: bool,
    pub is_complete_series: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_slot_id: Option<SlotId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrabResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of a single-item automatic search (movie or episode).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSearchResult {
    pub found: bool,
    pub downloaded: bool,
    #[serde(default)]
    pub upgraded: Option<bool>,
    #[serde(default)]
    pub release: Option<Release>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of a batch automatic search (season or series).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSearchResult {
    pub found: u32,
    pub downloaded: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub total_searched: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSearchResult {
    pub found: bool,
    pub downloaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonTarget {
    pub series_id: MediaId,
    pub season_number: u32,
}

#[async_trait]
pub trait ReleaseSearchService: Send + Sync {
    async fn search_movie_releases(&self, criteria: &SearchCriteria)
        -> ServiceResult<SearchResponse>;

    async fn search_series_releases(
        &self,
        criteria: &SearchCriteria,
    ) -> ServiceResult<SearchResponse>;

    async fn grab_release(&self, request: &GrabRequest) -> ServiceResult<GrabResponse>;
}

#[async_trait]
pub trait AutoSearchService: Send + Sync {
    async fn auto_search_movie(&self, movie_id: MediaId) -> ServiceResult<AutoSearchResult>;

    async fn auto_search_episode(&self, episode_id: EpisodeId)
        -> ServiceResult<AutoSearchResult>;

    async fn auto_search_season(&self, target: SeasonTarget) -> ServiceResult<BatchSearchResult>;

    async fn auto_search_series(&self, series_id: MediaId) -> ServiceResult<BatchSearchResult>;

    async fn auto_search_movie_slot(
        &self,
        movie_id: MediaId,
        slot_id: SlotId,
    ) -> ServiceResult<SlotSearchResult>;

    async fn auto_search_episode_slot(
        &self,
        episode_id: EpisodeId,
        slot_id: SlotId,
    ) -> ServiceResult<SlotSearchResult>;
}

/// Externally refreshed read model of requests and in-flight downloads.
#[async_trait]
pub trait ReadModel: Send + Sync {
    async fn list_requests(&self) -> ServiceResult<Vec<Request>>;

    async fn list_downloads(&self) -> ServiceResult<Vec<Download>>;
}
