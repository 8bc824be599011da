// SPDX-License-Identifier: GPL-3.0-or-later

//! Manual release search: criteria, the explicit search gate, sorting,
//! selection and grab-request construction for one dialog session.

use marquee_domain::{EpisodeId, MediaId, Release, SearchCriteria, SlotId, Validate};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{is_conflict_message, ServiceError};
use crate::notifications::{Notification, Notifier};
use crate::release_sorting::{sort_releases, SortColumn, SortState};
use crate::services::{GrabMediaType, GrabRequest, ReleaseSearchService, SearchResponse};

/// What the hosting dialog is searching for. Decides both the search
/// operation and the media type of a grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchContext {
    Movie {
        movie_id: MediaId,
    },
    Series {
        series_id: MediaId,
        season: Option<u32>,
        episode: Option<u32>,
        episode_id: Option<EpisodeId>,
    },
}

impl SearchContext {
    pub fn is_movie(&self) -> bool {
        matches!(self, Self::Movie { .. })
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search criteria: {0}")]
    InvalidCriteria(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Builds the grab request for `release`. Media type comes from the context,
/// never from the release.
pub fn build_grab_request(
    release: &Release,
    context: &SearchContext,
    target_slot_id: Option<SlotId>,
) -> GrabRequest {
    let mut request = GrabRequest {
        guid: release.guid.clone(),
        title: release.title.clone(),
        indexer: release.indexer.clone(),
        indexer_id: release.indexer_id,
        protocol: release.protocol.clone(),
        download_url: release.download_url.clone(),
        size: release.size,
        media_type: GrabMediaType::Movie,
        media_id: None,
        series_id: None,
        season_number: None,
        episode_number: None,
        episode_id: None,
        is_season_pack: false,
        is_complete_series: false,
        target_slot_id: target_slot_id.or(release.target_slot_id),
    };

    match *context {
        SearchContext::Movie { movie_id } => {
            request.media_id = Some(movie_id);
        }
        SearchContext::Series {
            series_id,
            season,
            episode,
            episode_id,
        } => {
            request.media_id = Some(series_id);
            request.series_id = Some(series_id);
            request.season_number = season;
            match (season, episode) {
                (_, Some(episode)) => {
                    request.media_type = GrabMediaType::Episode;
                    request.episode_number = Some(episode);
                    request.episode_id = episode_id;
                }
                (Some(_), None) => {
                    request.media_type = GrabMediaType::Season;
                    request.is_season_pack = true;
                }
                (None, None) => {
                    request.media_type = GrabMediaType::Season;
                    request.is_complete_series = true;
                }
            }
        }
    }

    request
}

/// Binary grab result with a message fit for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabOutcome {
    pub success: bool,
    pub message: String,
}

/// Sends one release to the download client. Never fails past this call:
/// every failure becomes a notification and an unsuccessful outcome.
///
/// A duplicate-in-queue rejection counts as success with a warning.
pub async fn grab_release<S>(
    service: &S,
    notifier: &dyn Notifier,
    release: &Release,
    context: &SearchContext,
    target_slot_id: Option<SlotId>,
) -> GrabOutcome
where
    S: ReleaseSearchService + ?Sized,
{
    let request = build_grab_request(release, context, target_slot_id);
    info!(target: "search", guid = %request.guid, media_type = ?request.media_type, "grabbing release");

    let failure = match service.grab_release(&request).await {
        Ok(response) if response.success => {
            let message = format!("Grabbed {}", release.title);
            notifier.notify(Notification::success("Release Grabbed", message.clone()));
            return GrabOutcome {
                success: true,
                message,
            };
        }
        Ok(response) => response
            .error
            .unwrap_or_else(|| "Grab was rejected".to_string()),
        Err(err) if err.is_conflict() => return already_queued(notifier, release),
        Err(err) => err.to_string(),
    };

    if is_conflict_message(&failure) {
        return already_queued(notifier, release);
    }

    warn!(target: "search", guid = %request.guid, error = %failure, "grab failed");
    notifier.notify(Notification::error("Grab Failed", failure.clone()));
    GrabOutcome {
        success: false,
        message: failure,
    }
}

fn already_queued(notifier: &dyn Notifier, release: &Release) -> GrabOutcome {
    let message = format!("{} is already downloading", release.title);
    notifier.notify(Notification::warning("Already Queued", message.clone()));
    GrabOutcome {
        success: true,
        message,
    }
}

/// Results of one executed search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub releases: Vec<Release>,
    pub errors: Vec<String>,
    pub total: usize,
    pub indexers_searched: usize,
}

impl SearchOutcome {
    fn from_response(response: SearchResponse) -> Self {
        Self {
            releases: response.releases,
            errors: response.errors,
            total: response.total,
            indexers_searched: response.indexers_searched,
        }
    }

    /// Number of indexers that failed while the others still returned results.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// State of one search dialog.
///
/// Changing criteria never searches by itself; a search runs only after
/// [`SearchSession::enable`], and the gate closes again whenever the dialog
/// opens or closes.
#[derive(Debug, Clone)]
pub struct SearchSession {
    context: SearchContext,
    criteria: SearchCriteria,
    default_limit: usize,
    dialog_open: bool,
    enabled: bool,
    searching: bool,
    outcome: Option<SearchOutcome>,
    sort: SortState,
    selected: Option<String>,
}

impl SearchSession {
    pub fn new(context: SearchContext, criteria: SearchCriteria, default_limit: usize) -> Self {
        Self {
            context,
            criteria,
            default_limit,
            dialog_open: false,
            enabled: false,
            searching: false,
            outcome: None,
            sort: SortState::default(),
            selected: None,
        }
    }

    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    /// Feeds the dialog's current open flag. A change from the previous value
    /// resets the session before anything else reads it.
    pub fn sync_dialog(&mut self, open: bool) {
        if open == self.dialog_open {
            return;
        }
        debug!(target: "search", open, "dialog visibility changed, resetting session");
        self.dialog_open = open;
        self.enabled = false;
        self.searching = false;
        self.outcome = None;
        self.selected = None;
        self.sort = SortState::default();
    }

    pub fn is_dialog_open(&self) -> bool {
        self.dialog_open
    }

    pub fn set_criteria(&mut self, criteria: SearchCriteria) {
        self.criteria = criteria;
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// Criteria as sent: series, season and episode filled from the context, limit defaulted.
    pub fn effective_criteria(&self) -> SearchCriteria {
        let mut criteria = self.criteria.clone();
        if let SearchContext::Series {
            series_id,
            season,
            episode,
            ..
        } = self.context
        {
            criteria.series_id = criteria.series_id.or(Some(series_id));
            criteria.season = criteria.season.or(season);
            criteria.episode = criteria.episode.or(episode);
        }
        criteria.limit = criteria.limit.or(Some(self.default_limit));
        criteria
    }

    /// Runs the search if the gate is open. Returns `Ok(None)` when it is not.
    pub async fn run<S>(
        &mut self,
        service: &S,
        notifier: &dyn Notifier,
    ) -> Result<Option<&SearchOutcome>, SearchError>
    where
        S: ReleaseSearchService + ?Sized,
    {
        if !self.enabled {
            debug!(target: "search", "search not enabled, skipping");
            return Ok(None);
        }

        let criteria = self.effective_criteria();
        criteria.validate().map_err(|errs| {
            SearchError::InvalidCriteria(
                errs.iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        self.searching = true;
        let response = if self.context.is_movie() {
            service.search_movie_releases(&criteria).await
        } else {
            service.search_series_releases(&criteria).await
        };
        self.searching = false;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(target: "search", error = %err, "release search failed");
                notifier.notify(Notification::error("Search Failed", err.to_string()));
                return Err(err.into());
            }
        };

        let mut outcome = SearchOutcome::from_response(response);
        info!(
            target: "search",
            releases = outcome.releases.len(),
            indexers = outcome.indexers_searched,
            errors = outcome.error_count(),
            "release search finished"
        );

        if outcome.releases.is_empty() {
            notifier.notify(Notification::warning(
                "Not Found",
                "No releases matched the search",
            ));
        }

        if outcome.error_count() > 0 {
            notifier.notify(Notification::warning(
                "Some Indexers Failed",
                format!(
                    "{} of {} indexers returned errors",
                    outcome.error_count(),
                    outcome.indexers_searched.max(outcome.error_count())
                ),
            ));
        }

        sort_releases(&mut outcome.releases, self.sort);
        if let Some(guid) = self.selected.as_deref() {
            if !outcome.releases.iter().any(|release| release.guid == guid) {
                self.selected = None;
            }
        }
        self.outcome = Some(outcome);

        Ok(self.outcome.as_ref())
    }

    pub fn outcome(&self) -> Option<&SearchOutcome> {
        self.outcome.as_ref()
    }

    /// Current results in display order.
    pub fn releases(&self) -> &[Release] {
        self.outcome
            .as_ref()
            .map(|outcome| outcome.releases.as_slice())
            .unwrap_or(&[])
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    /// Column header click.
    pub fn sort_by(&mut self, column: SortColumn) {
        self.sort = self.sort.toggle(column);
        if let Some(outcome) = self.outcome.as_mut() {
            sort_releases(&mut outcome.releases, self.sort);
        }
    }

    /// Selects a release by guid; returns false if it is not in the results.
    pub fn select(&mut self, guid: &str) -> bool {
        let exists = self.releases().iter().any(|release| release.guid == guid);
        self.selected = exists.then(|| guid.to_string());
        exists
    }

    pub fn selected_release(&self) -> Option<&Release> {
        let guid = self.selected.as_deref()?;
        self.releases().iter().find(|release| release.guid == guid)
    }

    /// Grabs the selected release. `None` when nothing is selected.
    pub async fn grab_selected<S>(
        &self,
        service: &S,
        notifier: &dyn Notifier,
        target_slot_id: Option<SlotId>,
    ) -> Option<GrabOutcome>
    where
        S: ReleaseSearchService + ?Sized,
    {
        let release = self.selected_release()?;
        Some(grab_release(service, notifier, release, &self.context, target_slot_id).await)
    }
}
