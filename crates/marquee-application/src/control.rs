// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-item acquisition control state machine.
//!
//! The machine is a pure reducer: events go in, the new state and at most one
//! side effect come out. Timers and service calls are executed by
//! [`crate::acquisition::AcquisitionControl`].
//!
//! ```text
//! default ──manual──▶ searching(manual) ──grab──▶ progress ──finish──▶ completed ──2.5s/dismiss──▶ default
//!    │                      └──close──▶ default         ▲
//!    └──auto──▶ searching(auto) ──downloaded/conflict───┘
//!                     ├──not found──▶ error("Not Found") ──dismiss──▶ default
//!                     └──failure────▶ error("Failed")
//! ```

use serde::Serialize;
use tracing::debug;

use crate::services::{AutoSearchResult, BatchSearchResult, SlotSearchResult};

pub const NOT_FOUND: &str = "Not Found";
pub const FAILED: &str = "Failed";

/// Empty queue observations tolerated in `progress` before any download shows up.
/// Past this the grab is treated as finished so the control never stays loading.
pub const UNSEEN_DOWNLOAD_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Manual,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum ControlState {
    Default,
    Searching(SearchMode),
    Progress,
    Completed,
    Error(String),
}

impl ControlState {
    pub fn is_searching(&self) -> bool {
        matches!(self, Self::Searching(_))
    }
}

/// Completion of an automatic search, in the shape the service returned.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoSearchOutcome {
    Single(AutoSearchResult),
    Batch(BatchSearchResult),
    Slot(SlotSearchResult),
}

/// How a finished automatic search moves the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSearchVerdict {
    Downloading,
    NotFound,
    Nothing,
}

impl AutoSearchOutcome {
    pub fn verdict(&self) -> AutoSearchVerdict {
        let (found, downloaded) = match self {
            Self::Single(result) => (result.found, result.downloaded),
            Self::Slot(result) => (result.found, result.downloaded),
            Self::Batch(result) => (result.found > 0, result.downloaded > 0),
        };

        if downloaded {
            AutoSearchVerdict::Downloading
        } else if !found {
            AutoSearchVerdict::NotFound
        } else {
            AutoSearchVerdict::Nothing
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    ManualSearchRequested,
    /// The search dialog closed. `grabbed` is true when a grab succeeded in it.
    DialogClosed {
        grabbed: bool,
        download_active: bool,
    },
    GrabSucceeded,
    AutoSearchRequested,
    AutoSearchFinished(AutoSearchOutcome),
    /// Auto-search raised; `conflict` marks a duplicate-in-queue rejection.
    AutoSearchFailed {
        conflict: bool,
    },
    /// The auto-search future was dropped before it resolved.
    AutoSearchAbandoned,
    /// Fresh download-activity observation for this item.
    DownloadActivity {
        active: bool,
    },
    /// The completion timer for `generation` elapsed.
    DismissElapsed {
        generation: u64,
    },
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEffect {
    OpenSearchDialog,
    RunAutoSearch,
    ScheduleDismiss { generation: u64 },
    CancelDismiss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ControlState,
    pub effect: Option<ControlEffect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMachine {
    state: ControlState,
    /// Bumped whenever a pending completion timer must be ignored.
    dismiss_generation: u64,
    /// Whether a download was observed since entering `progress`.
    download_seen: bool,
    /// Consecutive empty observations in `progress` while no download was seen.
    unseen_observations: u32,
}

impl Default for ControlMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlMachine {
    pub fn new() -> Self {
        Self {
            state: ControlState::Default,
            dismiss_generation: 0,
            download_seen: false,
            unseen_observations: 0,
        }
    }

    /// Stored state, before live downloads are taken into account.
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// State to display: a live download always reads as `progress`.
    pub fn effective_state(&self, download_active: bool) -> ControlState {
        effective_state(&self.state, download_active)
    }

    pub fn dismiss_generation(&self) -> u64 {
        self.dismiss_generation
    }

    pub fn apply(&mut self, event: ControlEvent) -> Transition {
        let effect = self.reduce(event);
        Transition {
            state: self.state.clone(),
            effect,
        }
    }

    fn reduce(&mut self, event: ControlEvent) -> Option<ControlEffect> {
        match event {
            ControlEvent::ManualSearchRequested => match self.state {
                ControlState::Default | ControlState::Error(_) | ControlState::Completed => {
                    let cancel = self.state == ControlState::Completed;
                    self.enter(ControlState::Searching(SearchMode::Manual));
                    if cancel {
                        self.dismiss_generation += 1;
                    }
                    Some(ControlEffect::OpenSearchDialog)
                }
                _ => None,
            },
            ControlEvent::DialogClosed {
                grabbed,
                download_active,
            } => {
                if grabbed || download_active {
                    self.enter_progress(download_active);
                } else if self.state == ControlState::Searching(SearchMode::Manual) {
                    self.enter(ControlState::Default);
                }
                None
            }
            ControlEvent::GrabSucceeded => {
                self.cancel_pending_dismiss();
                self.enter_progress(false);
                None
            }
            ControlEvent::AutoSearchRequested => {
                if self.state == ControlState::Default {
                    self.enter(ControlState::Searching(SearchMode::Auto));
                    Some(ControlEffect::RunAutoSearch)
                } else {
                    None
                }
            }
            // Completions apply to whatever is stored now: the last one to resolve wins.
            ControlEvent::AutoSearchFinished(outcome) => {
                match outcome.verdict() {
                    AutoSearchVerdict::Downloading => self.enter_progress(false),
                    AutoSearchVerdict::NotFound => {
                        self.enter(ControlState::Error(NOT_FOUND.to_string()))
                    }
                    AutoSearchVerdict::Nothing => self.enter(ControlState::Default),
                }
                None
            }
            ControlEvent::AutoSearchFailed { conflict } => {
                if conflict {
                    self.enter_progress(false);
                } else {
                    self.enter(ControlState::Error(FAILED.to_string()));
                }
                None
            }
            ControlEvent::AutoSearchAbandoned => {
                if self.state == ControlState::Searching(SearchMode::Auto) {
                    self.enter(ControlState::Default);
                }
                None
            }
            ControlEvent::DownloadActivity { active } => self.observe_activity(active),
            ControlEvent::DismissElapsed { generation } => {
                if generation == self.dismiss_generation && self.state == ControlState::Completed {
                    self.enter(ControlState::Default);
                }
                None
            }
            ControlEvent::Dismissed => match self.state {
                ControlState::Completed => {
                    self.dismiss_generation += 1;
                    self.enter(ControlState::Default);
                    Some(ControlEffect::CancelDismiss)
                }
                ControlState::Error(_) => {
                    self.enter(ControlState::Default);
                    None
                }
                _ => None,
            },
        }
    }

    fn observe_activity(&mut self, active: bool) -> Option<ControlEffect> {
        if active {
            if self.state == ControlState::Completed {
                self.dismiss_generation += 1;
            }
            self.enter_progress(true);
            return None;
        }

        if self.state != ControlState::Progress {
            return None;
        }

        if !self.download_seen {
            self.unseen_observations += 1;
            if self.unseen_observations < UNSEEN_DOWNLOAD_LIMIT {
                return None;
            }
            debug!(
                target: "control",
                observations = self.unseen_observations,
                "no download appeared for grab, completing"
            );
        }

        self.enter(ControlState::Completed);
        self.dismiss_generation += 1;
        Some(ControlEffect::ScheduleDismiss {
            generation: self.dismiss_generation,
        })
    }

    fn cancel_pending_dismiss(&mut self) {
        if self.state == ControlState::Completed {
            self.dismiss_generation += 1;
        }
    }

    fn enter_progress(&mut self, download_seen: bool) {
        if self.state != ControlState::Progress {
            self.download_seen = false;
            self.unseen_observations = 0;
        }
        self.download_seen |= download_seen;
        self.enter(ControlState::Progress);
    }

    fn enter(&mut self, next: ControlState) {
        if self.state != next {
            debug!(target: "control", from = ?self.state, to = ?next, "control transition");
        }
        self.state = next;
    }
}

/// A live download overrides every stored state.
pub fn effective_state(stored: &ControlState, download_active: bool) -> ControlState {
    if download_active {
        ControlState::Progress
    } else {
        stored.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(found: bool, downloaded: bool) -> AutoSearchOutcome {
        AutoSearchOutcome::Single(AutoSearchResult {
            found,
            downloaded,
            ..Default::default()
        })
    }

    fn batch(found: u32, downloaded: u32) -> AutoSearchOutcome {
        AutoSearchOutcome::Batch(BatchSearchResult {
            found,
            downloaded,
            failed: 0,
            total_searched: found,
        })
    }

    fn completed_machine() -> ControlMachine {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::DownloadActivity { active: true });
        machine.apply(ControlEvent::DownloadActivity { active: false });
        assert_eq!(machine.state(), &ControlState::Completed);
        machine
    }

    #[test]
    fn manual_search_opens_dialog_from_idle_states() {
        let mut machine = ControlMachine::new();
        let transition = machine.apply(ControlEvent::ManualSearchRequested);
        assert_eq!(transition.state, ControlState::Searching(SearchMode::Manual));
        assert_eq!(transition.effect, Some(ControlEffect::OpenSearchDialog));

        let mut errored = ControlMachine::new();
        errored.apply(ControlEvent::AutoSearchRequested);
        errored.apply(ControlEvent::AutoSearchFailed { conflict: false });
        let transition = errored.apply(ControlEvent::ManualSearchRequested);
        assert_eq!(transition.state, ControlState::Searching(SearchMode::Manual));
    }

    #[test]
    fn manual_search_is_ignored_while_in_progress() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::GrabSucceeded);
        let transition = machine.apply(ControlEvent::ManualSearchRequested);
        assert_eq!(transition.state, ControlState::Progress);
        assert_eq!(transition.effect, None);
    }

    #[test]
    fn closing_dialog_without_grab_reverts() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::ManualSearchRequested);
        machine.apply(ControlEvent::DialogClosed {
            grabbed: false,
            download_active: false,
        });
        assert_eq!(machine.state(), &ControlState::Default);
    }

    #[test]
    fn closing_dialog_after_grab_keeps_progress() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::ManualSearchRequested);
        machine.apply(ControlEvent::GrabSucceeded);
        machine.apply(ControlEvent::DialogClosed {
            grabbed: true,
            download_active: false,
        });
        assert_eq!(machine.state(), &ControlState::Progress);
    }

    #[test]
    fn auto_search_verdicts() {
        for (outcome, expected) in [
            (single(true, true), ControlState::Progress),
            (single(false, false), ControlState::Error(NOT_FOUND.into())),
            (single(true, false), ControlState::Default),
            (batch(3, 1), ControlState::Progress),
            (batch(0, 0), ControlState::Error(NOT_FOUND.into())),
            (batch(2, 0), ControlState::Default),
            (
                AutoSearchOutcome::Slot(SlotSearchResult {
                    found: true,
                    downloaded: true,
                }),
                ControlState::Progress,
            ),
        ] {
            let mut machine = ControlMachine::new();
            let transition = machine.apply(ControlEvent::AutoSearchRequested);
            assert_eq!(transition.effect, Some(ControlEffect::RunAutoSearch));
            let transition = machine.apply(ControlEvent::AutoSearchFinished(outcome));
            assert_eq!(transition.state, expected);
        }
    }

    #[test]
    fn auto_search_only_starts_from_default() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::ManualSearchRequested);
        let transition = machine.apply(ControlEvent::AutoSearchRequested);
        assert_eq!(transition.effect, None);
        assert_eq!(transition.state, ControlState::Searching(SearchMode::Manual));
    }

    #[test]
    fn conflict_is_progress_and_other_failures_error() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::AutoSearchRequested);
        machine.apply(ControlEvent::AutoSearchFailed { conflict: true });
        assert_eq!(machine.state(), &ControlState::Progress);

        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::AutoSearchRequested);
        machine.apply(ControlEvent::AutoSearchFailed { conflict: false });
        assert_eq!(machine.state(), &ControlState::Error(FAILED.into()));

        machine.apply(ControlEvent::Dismissed);
        assert_eq!(machine.state(), &ControlState::Default);
    }

    #[test]
    fn live_download_overrides_stored_state() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::ManualSearchRequested);
        assert_eq!(machine.effective_state(true), ControlState::Progress);
        assert_eq!(
            machine.effective_state(false),
            ControlState::Searching(SearchMode::Manual)
        );
    }

    #[test]
    fn cold_start_with_active_download_enters_progress() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::DownloadActivity { active: true });
        assert_eq!(machine.state(), &ControlState::Progress);
    }

    #[test]
    fn finished_download_completes_and_schedules_dismiss() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::GrabSucceeded);

        // Nothing observed yet: the queue has not caught up with the grab.
        let transition = machine.apply(ControlEvent::DownloadActivity { active: false });
        assert_eq!(transition.state, ControlState::Progress);

        machine.apply(ControlEvent::DownloadActivity { active: true });
        let transition = machine.apply(ControlEvent::DownloadActivity { active: false });
        assert_eq!(transition.state, ControlState::Completed);
        assert_eq!(
            transition.effect,
            Some(ControlEffect::ScheduleDismiss {
                generation: machine.dismiss_generation()
            })
        );
    }

    #[test]
    fn grab_that_never_reaches_the_queue_still_completes() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::AutoSearchRequested);
        machine.apply(ControlEvent::AutoSearchFinished(single(true, true)));

        for _ in 1..UNSEEN_DOWNLOAD_LIMIT {
            let transition = machine.apply(ControlEvent::DownloadActivity { active: false });
            assert_eq!(transition.state, ControlState::Progress);
            assert_eq!(transition.effect, None);
        }

        let transition = machine.apply(ControlEvent::DownloadActivity { active: false });
        assert_eq!(transition.state, ControlState::Completed);
        assert_eq!(
            transition.effect,
            Some(ControlEffect::ScheduleDismiss {
                generation: machine.dismiss_generation()
            })
        );
    }

    #[test]
    fn unseen_count_restarts_with_each_progress_phase() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::GrabSucceeded);
        for _ in 1..UNSEEN_DOWNLOAD_LIMIT {
            machine.apply(ControlEvent::DownloadActivity { active: false });
        }

        machine.apply(ControlEvent::DownloadActivity { active: true });
        machine.apply(ControlEvent::DownloadActivity { active: false });
        assert_eq!(machine.state(), &ControlState::Completed);

        machine.apply(ControlEvent::GrabSucceeded);
        let transition = machine.apply(ControlEvent::DownloadActivity { active: false });
        assert_eq!(transition.state, ControlState::Progress);
    }

    #[test]
    fn completion_timer_reverts_to_default() {
        let mut machine = completed_machine();
        let generation = machine.dismiss_generation();
        machine.apply(ControlEvent::DismissElapsed { generation });
        assert_eq!(machine.state(), &ControlState::Default);
    }

    #[test]
    fn early_dismiss_invalidates_pending_timer() {
        let mut machine = completed_machine();
        let generation = machine.dismiss_generation();

        let transition = machine.apply(ControlEvent::Dismissed);
        assert_eq!(transition.state, ControlState::Default);
        assert_eq!(transition.effect, Some(ControlEffect::CancelDismiss));

        machine.apply(ControlEvent::ManualSearchRequested);
        machine.apply(ControlEvent::DismissElapsed { generation });
        assert_eq!(machine.state(), &ControlState::Searching(SearchMode::Manual));
    }

    #[test]
    fn stale_timer_does_not_dismiss_new_completion() {
        let mut machine = completed_machine();
        let stale = machine.dismiss_generation();

        machine.apply(ControlEvent::DownloadActivity { active: true });
        machine.apply(ControlEvent::DownloadActivity { active: false });
        assert_eq!(machine.state(), &ControlState::Completed);

        machine.apply(ControlEvent::DismissElapsed { generation: stale });
        assert_eq!(machine.state(), &ControlState::Completed);
    }

    #[test]
    fn abandoned_auto_search_returns_to_default() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::AutoSearchRequested);
        machine.apply(ControlEvent::AutoSearchAbandoned);
        assert_eq!(machine.state(), &ControlState::Default);

        machine.apply(ControlEvent::GrabSucceeded);
        machine.apply(ControlEvent::AutoSearchAbandoned);
        assert_eq!(machine.state(), &ControlState::Progress);
    }

    #[test]
    fn late_completion_overwrites_earlier_state() {
        let mut machine = ControlMachine::new();
        machine.apply(ControlEvent::AutoSearchRequested);
        machine.apply(ControlEvent::AutoSearchFinished(single(true, true)));
        machine.apply(ControlEvent::AutoSearchFinished(single(false, false)));
        assert_eq!(machine.state(), &ControlState::Error(NOT_FOUND.into()));
    }
}
