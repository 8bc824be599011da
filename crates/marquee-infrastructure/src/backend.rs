// SPDX-License-Identifier: GPL-3.0-or-later
use async_trait::async_trait;
use marquee_application::services::{
    AutoSearchResult, AutoSearchService, BatchSearchResult, GrabRequest, GrabResponse, ReadModel,
    ReleaseSearchService, SearchResponse, SeasonTarget, SlotSearchResult,
};
use marquee_application::{ServiceError, ServiceResult};
use marquee_config::BackendConfig;
use marquee_domain::{Download, EpisodeId, MediaId, Request, SearchCriteria, SlotId};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http_client;

/// JSON/HTTP adapter for the search, auto-search and read-model backend.
pub struct HttpBackendClient {
    client: Client,
    base_url: String,
}

impl HttpBackendClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> ServiceResult<Self> {
        Ok(Self::new(http_client(config)?, config.base_url.clone()))
    }

    fn endpoint(&self, path: &str) -> ServiceResult<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| ServiceError::Request(format!("invalid base url: {err}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let url = self.endpoint(path)?;
        self.send(self.client.get(url), path).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> ServiceResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        self.send(self.client.post(url).json(body), path).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let url = self.endpoint(path)?;
        self.send(self.client.post(url), path).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> ServiceResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Request(e.to_string()))?;

        if !status.is_success() {
            warn!(target: "backend", %path, status = status.as_u16(), "backend call rejected");
            return Err(map_status(status, body));
        }

        debug!(target: "backend", %path, bytes = body.len(), "backend call succeeded");
        serde_json::from_str(&body).map_err(|e| ServiceError::Deserialization(e.to_string()))
    }
}

fn map_status(status: StatusCode, body: String) -> ServiceError {
    let message = error_message(&body).unwrap_or(body);
    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        StatusCode::CONFLICT => ServiceError::Conflict(message),
        _ => ServiceError::HttpStatus {
            status: status.as_u16(),
            body: message,
        },
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Pulls `message`/`error` out of a JSON error body, if there is one.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|error| error.message)
}

/// List endpoints answer either with a bare array or a `{ "results": [...] }` page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Page { results: items } => items,
        }
    }
}

#[async_trait]
impl ReleaseSearchService for HttpBackendClient {
    async fn search_movie_releases(&self, criteria: &SearchCriteria) -> ServiceResult<SearchResponse> {
        self.post_json("/api/v1/search/movie", criteria).await
    }

    async fn search_series_releases(&self, criteria: &SearchCriteria) -> ServiceResult<SearchResponse> {
        self.post_json("/api/v1/search/series", criteria).await
    }

    async fn grab_release(&self, request: &GrabRequest) -> ServiceResult<GrabResponse> {
        self.post_json("/api/v1/search/grab", request).await
    }
}

#[async_trait]
impl AutoSearchService for HttpBackendClient {
    async fn auto_search_movie(&self, movie_id: MediaId) -> ServiceResult<AutoSearchResult> {
        self.post_empty(&format!("/api/v1/autosearch/movie/{movie_id}"))
            .await
    }

    async fn auto_search_episode(&self, episode_id: EpisodeId) -> ServiceResult<AutoSearchResult> {
        self.post_empty(&format!("/api/v1/autosearch/episode/{episode_id}"))
            .await
    }

    async fn auto_search_season(&self, target: SeasonTarget) -> ServiceResult<BatchSearchResult> {
        self.post_json("/api/v1/autosearch/season", &target).await
    }

    async fn auto_search_series(&self, series_id: MediaId) -> ServiceResult<BatchSearchResult> {
        self.post_empty(&format!("/api/v1/autosearch/series/{series_id}"))
            .await
    }

    async fn auto_search_movie_slot(
        &self,
        movie_id: MediaId,
        slot_id: SlotId,
    ) -> ServiceResult<SlotSearchResult> {
        self.post_empty(&format!("/api/v1/autosearch/movie/{movie_id}/slot/{slot_id}"))
            .await
    }

    async fn auto_search_episode_slot(
        &self,
        episode_id: EpisodeId,
        slot_id: SlotId,
    ) -> ServiceResult<SlotSearchResult> {
        self.post_empty(&format!(
            "/api/v1/autosearch/episode/{episode_id}/slot/{slot_id}"
        ))
        .await
    }
}

#[async_trait]
impl ReadModel for HttpBackendClient {
    async fn list_requests(&self) -> ServiceResult<Vec<Request>> {
        let listing: Listing<Request> = self.get_json("/api/v1/requests").await?;
        Ok(listing.into_vec())
    }

    async fn list_downloads(&self) -> ServiceResult<Vec<Download>> {
        let listing: Listing<Download> = self.get_json("/api/v1/queue").await?;
        Ok(listing.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_application::services::GrabMediaType;
    use marquee_domain::{DownloadStatus, ReleaseProtocol, RequestStatus, TmdbId};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpBackendClient {
        let config = BackendConfig {
            base_url: format!("{}/", server.uri()),
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        HttpBackendClient::from_config(&config).expect("client should build")
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            query: Some("The Matrix".to_string()),
            tmdb_id: Some(TmdbId(603)),
            imdb_id: None,
            tvdb_id: None,
            series_id: None,
            season: None,
            episode: None,
            quality_profile_id: None,
            limit: Some(100),
        }
    }

    #[tokio::test]
    async fn search_movie_posts_criteria_with_api_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/search/movie"))
            .and(header("X-Api-Key", "secret"))
            .and(body_partial_json(serde_json::json!({ "tmdbId": 603, "limit": 100 })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "releases": [
                        {
                            "guid": "abc",
                            "title": "The.Matrix.1999.1080p.BluRay",
                            "indexer": "Nyaa",
                            "protocol": "torrent",
                            "size": 8000000000,
                            "quality": "Bluray-1080p",
                            "score": 120
                        }
                    ],
                    "errors": ["Indexer B timed out"],
                    "total": 1,
                    "indexersSearched": 2
                }"#,
            ))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .search_movie_releases(&criteria())
            .await
            .expect("search should parse");

        assert_eq!(response.releases.len(), 1);
        assert_eq!(response.releases[0].protocol, ReleaseProtocol::Torrent);
        assert_eq!(response.releases[0].score, Some(120));
        assert_eq!(response.errors, vec!["Indexer B timed out".to_string()]);
        assert_eq!(response.indexers_searched, 2);
    }

    #[tokio::test]
    async fn grab_conflict_maps_to_conflict_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/search/grab"))
            .respond_with(
                ResponseTemplate::new(409).set_body_string(r#"{"message":"Release already in queue"}"#),
            )
            .mount(&server)
            .await;

        let request = GrabRequest {
            guid: "abc".into(),
            title: "The.Matrix.1999.1080p.BluRay".into(),
            indexer: "Nyaa".into(),
            indexer_id: None,
            protocol: ReleaseProtocol::Torrent,
            download_url: None,
            size: 1,
            media_type: GrabMediaType::Movie,
            media_id: Some(MediaId(40)),
            series_id: None,
            season_number: None,
            episode_number: None,
            episode_id: None,
            is_season_pack: false,
            is_complete_series: false,
            target_slot_id: None,
        };

        let err = client_for(&server).grab_release(&request).await.unwrap_err();
        assert_eq!(err, ServiceError::Conflict("Release already in queue".into()));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn auto_search_paths_carry_ids() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/autosearch/movie/40"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"found": true, "downloaded": true, "clientName": "SABnzbd"}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/autosearch/episode/9/slot/2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"found": false, "downloaded": false}"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/autosearch/season"))
            .and(body_partial_json(serde_json::json!({ "seriesId": 5, "seasonNumber": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"found": 8, "downloaded": 6, "failed": 2, "totalSearched": 10}"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let movie = client.auto_search_movie(MediaId(40)).await.unwrap();
        assert!(movie.downloaded);
        assert_eq!(movie.client_name.as_deref(), Some("SABnzbd"));

        let slot = client
            .auto_search_episode_slot(EpisodeId(9), SlotId(2))
            .await
            .unwrap();
        assert!(!slot.found);

        let season = client
            .auto_search_season(SeasonTarget {
                series_id: MediaId(5),
                season_number: 2,
            })
            .await
            .unwrap();
        assert_eq!(season.downloaded, 6);
        assert_eq!(season.failed, 2);
    }

    #[tokio::test]
    async fn read_model_accepts_bare_and_paged_listings() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/requests"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"results": [{"id": 1, "tmdbId": 603, "mediaType": "movie", "status": "pending"}]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/queue"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"requestId": 1, "status": "downloading", "size": 100, "downloadedSize": 40}]"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let requests = client.list_requests().await.unwrap();
        assert_eq!(requests[0].status, RequestStatus::Pending);

        let downloads = client.list_downloads().await.unwrap();
        assert_eq!(downloads[0].status, DownloadStatus::Downloading);
        assert_eq!(downloads[0].downloaded_size, Some(40));
    }

    #[tokio::test]
    async fn missing_item_and_server_errors_keep_their_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/autosearch/series/3"))
            .respond_with(ResponseTemplate::new(404).set_body_string("series not found"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/queue"))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"boom"}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/requests"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(
            client.auto_search_series(MediaId(3)).await.unwrap_err(),
            ServiceError::NotFound("series not found".into())
        );
        assert_eq!(
            client.list_downloads().await.unwrap_err(),
            ServiceError::HttpStatus {
                status: 500,
                body: "boom".into()
            }
        );
        assert!(matches!(
            client.list_requests().await.unwrap_err(),
            ServiceError::Deserialization(_)
        ));
    }
}
