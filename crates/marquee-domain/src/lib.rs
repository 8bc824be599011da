// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects & IDs
// ============================================================================

/// External metadata-provider identifier shared by requests, downloads and releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TmdbId(pub i64);

impl std::fmt::Display for TmdbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal library id of a movie or series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub i64);

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(pub i64);

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multi-version slot a release can fill or upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub i64);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Series => write!(f, "series"),
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "movie" => Ok(Self::Movie),
            "series" | "tv" => Ok(Self::Series),
            other => Err(format!("unknown media type: {other}")),
        }
    }
}

/// Shape of a user request. Series requests may be split per season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMediaType {
    Movie,
    Series,
    Season,
}

impl RequestMediaType {
    /// Whether a request of this shape belongs to a catalog item of `media_type`.
    pub fn belongs_to(self, media_type: MediaType) -> bool {
        match media_type {
            MediaType::Movie => self == Self::Movie,
            MediaType::Series => matches!(self, Self::Series | Self::Season),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Available,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Available => write!(f, "available"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Downloading,
    Paused,
    Queued,
}

/// Transport a release is fetched over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseProtocol {
    Torrent,
    Usenet,
    #[serde(untagged)]
    Other(String),
}

impl ReleaseProtocol {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Torrent => "torrent",
            Self::Usenet => "usenet",
            Self::Other(value) => value.as_str(),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Catalog key supplied by the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaReference {
    pub tmdb_id: TmdbId,
    pub media_type: MediaType,
}

impl MediaReference {
    pub fn movie(tmdb_id: i64) -> Self {
        Self {
            tmdb_id: TmdbId(tmdb_id),
            media_type: MediaType::Movie,
        }
    }

    pub fn series(tmdb_id: i64) -> Self {
        Self {
            tmdb_id: TmdbId(tmdb_id),
            media_type: MediaType::Series,
        }
    }
}

/// A user request as reported by the request-tracking backend.
///
/// `media_id` is only populated once the request reached `available`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: RequestId,
    pub tmdb_id: TmdbId,
    pub media_type: RequestMediaType,
    pub status: RequestStatus,
    #[serde(default)]
    pub media_id: Option<MediaId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Download {
    #[serde(default)]
    pub request_id: Option<RequestId>,
    #[serde(default)]
    pub tmdb_id: Option<TmdbId>,
    #[serde(default)]
    pub movie_id: Option<MediaId>,
    #[serde(default)]
    pub series_id: Option<MediaId>,
    pub status: DownloadStatus,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub downloaded_size: Option<u64>,
    /// Bytes per second.
    #[serde(default)]
    pub download_speed: Option<u64>,
}

impl Download {
    /// Internal id of the library item this download targets for `media_type`.
    pub fn media_id_for(&self, media_type: MediaType) -> Option<MediaId> {
        match media_type {
            MediaType::Movie => self.movie_id,
            MediaType::Series => self.series_id,
        }
    }
}

/// Caller-supplied summary of library/request state. Reconciled against live
/// requests, never trusted over them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityInfo {
    #[serde(default)]
    pub in_library: Option<bool>,
    #[serde(default)]
    pub can_request: Option<bool>,
    #[serde(default)]
    pub existing_request_id: Option<RequestId>,
    #[serde(default)]
    pub existing_request_status: Option<RequestStatus>,
    #[serde(default)]
    pub existing_request_user_id: Option<UserId>,
    #[serde(default)]
    pub media_id: Option<MediaId>,
}

/// One indexer result inside a search session. `guid` is unique per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub guid: String,
    pub title: String,
    pub indexer: String,
    #[serde(default)]
    pub indexer_id: Option<i64>,
    pub protocol: ReleaseProtocol,
    #[serde(default)]
    pub download_url: Option<String>,
    pub size: u64,
    #[serde(default)]
    pub seeders: Option<u32>,
    #[serde(default)]
    pub leechers: Option<u32>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub target_slot_id: Option<SlotId>,
    #[serde(default)]
    pub target_slot_number: Option<u32>,
    #[serde(default)]
    pub target_slot_name: Option<String>,
    #[serde(default)]
    pub is_slot_upgrade: Option<bool>,
    #[serde(default)]
    pub is_slot_new_fill: Option<bool>,
}

impl Release {
    /// Publish date as a UTC timestamp; accepts RFC 3339 and RFC 2822.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.publish_date.as_deref()?.trim();

        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }

        DateTime::parse_from_rfc2822(raw)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }
}

/// Inputs of a catalog-wide release search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<TmdbId>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tvdb_id: Option<i64>,
    /// Library series the season/episode filters apply to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<MediaId>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    #[serde(default)]
    pub quality_profile_id: Option<i64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

impl Validate for SearchCriteria {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errs = Vec::new();

        let has_query = self
            .query
            .as_deref()
            .is_some_and(|query| !query.trim().is_empty());
        let has_catalog_id =
            self.tmdb_id.is_some() || self.tvdb_id.is_some() || self.imdb_id.is_some();
        if !has_query && !has_catalog_id {
            errs.push(ValidationError {
                field: "query",
                message: "search requires a query or a catalog id".into(),
            });
        }

        if self.limit == Some(0) {
            errs.push(ValidationError {
                field: "limit",
                message: "limit must be positive".into(),
            });
        }

        let has_series = self.series_id.is_some() || has_catalog_id;
        if self.season.is_some() && !has_series {
            errs.push(ValidationError {
                field: "season",
                message: "season requires a series".into(),
            });
        }

        if self.episode.is_some() && self.season.is_none() {
            errs.push(ValidationError {
                field: "episode",
                message: "episode requires a season".into(),
            });
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(errs)
        }
    }
}
