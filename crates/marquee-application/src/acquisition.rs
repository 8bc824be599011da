// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use marquee_config::AcquisitionConfig;
use marquee_domain::{EpisodeId, MediaId, SlotId};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::control::{
    AutoSearchOutcome, AutoSearchVerdict, ControlEffect, ControlEvent, ControlMachine,
    ControlState, Transition,
};
use crate::error::ServiceResult;
use crate::notifications::{Notification, Notifier};
use crate::progress::DownloadProgress;
use crate::services::{AutoSearchService, SeasonTarget};
use crate::status::MediaStatus;

/// Media shape an automatic search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSearchTarget {
    Movie(MediaId),
    Episode(EpisodeId),
    Season(SeasonTarget),
    Series(MediaId),
    MovieSlot { movie_id: MediaId, slot_id: SlotId },
    EpisodeSlot { episode_id: EpisodeId, slot_id: SlotId },
}

impl AutoSearchTarget {
    async fn run<S>(self, service: &S) -> ServiceResult<AutoSearchOutcome>
    where
        S: AutoSearchService + ?Sized,
    {
        match self {
            Self::Movie(movie_id) => service
                .auto_search_movie(movie_id)
                .await
                .map(AutoSearchOutcome::Single),
            Self::Episode(episode_id) => service
                .auto_search_episode(episode_id)
                .await
                .map(AutoSearchOutcome::Single),
            Self::Season(target) => service
                .auto_search_season(target)
                .await
                .map(AutoSearchOutcome::Batch),
            Self::Series(series_id) => service
                .auto_search_series(series_id)
                .await
                .map(AutoSearchOutcome::Batch),
            Self::MovieSlot { movie_id, slot_id } => service
                .auto_search_movie_slot(movie_id, slot_id)
                .await
                .map(AutoSearchOutcome::Slot),
            Self::EpisodeSlot {
                episode_id,
                slot_id,
            } => service
                .auto_search_episode_slot(episode_id, slot_id)
                .await
                .map(AutoSearchOutcome::Slot),
        }
    }
}

struct Inner {
    machine: ControlMachine,
    download_active: bool,
    dismiss_timer: Option<JoinHandle<()>>,
}

type Shared = Arc<Mutex<Inner>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Inner> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives one rendered control: applies events to the [`ControlMachine`],
/// runs auto-searches and owns the completion timer.
///
/// Timers are spawned on the ambient tokio runtime and aborted on drop.
pub struct AcquisitionControl {
    shared: Shared,
    notifier: Arc<dyn Notifier>,
    dismiss_delay: Duration,
}

impl AcquisitionControl {
    pub fn new(notifier: Arc<dyn Notifier>, config: &AcquisitionConfig) -> Self {
        Self::with_dismiss_delay(notifier, config.completion_dismiss_delay())
    }

    pub fn with_dismiss_delay(notifier: Arc<dyn Notifier>, dismiss_delay: Duration) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Inner {
                machine: ControlMachine::new(),
                download_active: false,
                dismiss_timer: None,
            })),
            notifier,
            dismiss_delay,
        }
    }

    /// Stored machine state.
    pub fn state(&self) -> ControlState {
        lock(&self.shared).machine.state().clone()
    }

    /// State to render; `progress` whenever a download is live.
    pub fn effective_state(&self) -> ControlState {
        let inner = lock(&self.shared);
        inner.machine.effective_state(inner.download_active)
    }

    /// Returns true when the search dialog should open.
    pub fn request_manual_search(&self) -> bool {
        let transition = self.dispatch(ControlEvent::ManualSearchRequested);
        transition.effect == Some(ControlEffect::OpenSearchDialog)
    }

    pub fn dialog_closed(&self, grabbed: bool) -> ControlState {
        let download_active = lock(&self.shared).download_active;
        self.dispatch(ControlEvent::DialogClosed {
            grabbed,
            download_active,
        })
        .state
    }

    pub fn grab_succeeded(&self) -> ControlState {
        self.dispatch(ControlEvent::GrabSucceeded).state
    }

    pub fn dismiss(&self) -> ControlState {
        self.dispatch(ControlEvent::Dismissed).state
    }

    /// Feeds a fresh resolver snapshot.
    pub fn observe_status(&self, status: &MediaStatus) -> ControlState {
        self.observe_activity(status.has_active_download)
    }

    /// Feeds a fresh progress aggregate.
    pub fn observe_progress(&self, progress: &DownloadProgress) -> ControlState {
        self.observe_activity(progress.is_active())
    }

    pub fn observe_activity(&self, active: bool) -> ControlState {
        lock(&self.shared).download_active = active;
        self.dispatch(ControlEvent::DownloadActivity { active }).state
    }

    /// Runs an automatic search if the control is idle and returns the resulting state.
    ///
    /// Every path leaves `searching(auto)`, including the future being dropped.
    pub async fn auto_search<S>(&self, service: &S, target: AutoSearchTarget) -> ControlState
    where
        S: AutoSearchService + ?Sized,
    {
        let transition = self.dispatch(ControlEvent::AutoSearchRequested);
        if transition.effect != Some(ControlEffect::RunAutoSearch) {
            debug!(target: "control", state = ?transition.state, "auto-search ignored");
            return transition.state;
        }

        info!(target: "control", search_target = ?target, "automatic search started");
        let guard = AbandonGuard {
            shared: self.shared.clone(),
            armed: true,
        };
        let result = target.run(service).await;
        guard.disarm();

        let event = match result {
            Ok(outcome) => {
                self.notify_outcome(&outcome);
                ControlEvent::AutoSearchFinished(outcome)
            }
            Err(err) if err.is_conflict() => {
                info!(target: "control", error = %err, "item already queued");
                self.notifier.notify(Notification::warning(
                    "Already Downloading",
                    "This item is already in the download queue",
                ));
                ControlEvent::AutoSearchFailed { conflict: true }
            }
            Err(err) => {
                warn!(target: "control", error = %err, "automatic search failed");
                self.notifier
                    .notify(Notification::error("Search Failed", err.to_string()));
                ControlEvent::AutoSearchFailed { conflict: false }
            }
        };

        self.dispatch(event).state
    }

    fn notify_outcome(&self, outcome: &AutoSearchOutcome) {
        let notification = match (outcome.verdict(), outcome) {
            (AutoSearchVerdict::Downloading, AutoSearchOutcome::Single(result)) => {
                let title = if result.upgraded == Some(true) {
                    "Upgrade Started"
                } else {
                    "Download Started"
                };
                let release = result
                    .release
                    .as_ref()
                    .map(|release| release.title.as_str())
                    .unwrap_or("Release");
                let message = match result.client_name.as_deref() {
                    Some(client) => format!("{release} sent to {client}"),
                    None => format!("{release} sent to download client"),
                };
                Notification::success(title, message)
            }
            (AutoSearchVerdict::Downloading, AutoSearchOutcome::Batch(result)) => {
                let mut message = format!("Started {} of {} downloads", result.downloaded, result.found);
                if result.failed > 0 {
                    message.push_str(&format!(", {} failed", result.failed));
                }
                Notification::success("Downloads Started", message)
            }
            (AutoSearchVerdict::Downloading, AutoSearchOutcome::Slot(_)) => {
                Notification::success("Download Started", "Release sent to download client")
            }
            (AutoSearchVerdict::NotFound, _) => {
                Notification::warning("Not Found", "No matching releases found")
            }
            (AutoSearchVerdict::Nothing, AutoSearchOutcome::Single(result)) => Notification::info(
                "Nothing Grabbed",
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Releases were found but none were grabbed".to_string()),
            ),
            (AutoSearchVerdict::Nothing, _) => Notification::info(
                "Nothing Grabbed",
                "Releases were found but none were grabbed",
            ),
        };
        self.notifier.notify(notification);
    }

    fn dispatch(&self, event: ControlEvent) -> Transition {
        let mut inner = lock(&self.shared);
        let transition = inner.machine.apply(event);

        match transition.effect {
            Some(ControlEffect::ScheduleDismiss { generation }) => {
                if let Some(previous) = inner.dismiss_timer.take() {
                    previous.abort();
                }
                inner.dismiss_timer = Some(spawn_dismiss(
                    self.shared.clone(),
                    generation,
                    self.dismiss_delay,
                ));
            }
            Some(ControlEffect::CancelDismiss) => {
                if let Some(timer) = inner.dismiss_timer.take() {
                    timer.abort();
                }
            }
            Some(ControlEffect::OpenSearchDialog) | Some(ControlEffect::RunAutoSearch) | None => {}
        }

        transition
    }
}

impl Drop for AcquisitionControl {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.shared).dismiss_timer.take() {
            timer.abort();
        }
    }
}

fn spawn_dismiss(shared: Shared, generation: u64, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut inner = lock(&shared);
        inner.machine.apply(ControlEvent::DismissElapsed { generation });
        if inner.machine.dismiss_generation() == generation {
            inner.dismiss_timer = None;
        }
    })
}

/// Leaves `searching(auto)` if the auto-search future is dropped mid-flight.
struct AbandonGuard {
    shared: Shared,
    armed: bool,
}

impl AbandonGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if self.armed {
            lock(&self.shared)
                .machine
                .apply(ControlEvent::AutoSearchAbandoned);
        }
    }
}
