// SPDX-License-Identifier: GPL-3.0-or-later

//! Combines the concurrent downloads of one library item into a single figure.

use marquee_domain::{Download, DownloadStatus, MediaId, MediaType};
use serde::Serialize;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "eta", rename_all = "lowercase")]
pub enum ProgressLabel {
    Importing,
    Paused,
    Downloading(String),
    Queued,
}

impl std::fmt::Display for ProgressLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Importing => write!(f, "Importing"),
            Self::Paused => write!(f, "Paused"),
            Self::Downloading(eta) => write!(f, "{eta}"),
            Self::Queued => write!(f, "Queued"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    /// Number of downloads that contributed.
    pub downloads: usize,
    pub total_size: u64,
    pub total_downloaded: u64,
    /// Bytes per second across every download.
    pub total_speed: u64,
    /// Size-weighted percentage in `0.0..=100.0` (can exceed 100 if the backend over-reports).
    pub progress: f64,
    pub eta_seconds: u64,
    pub label: ProgressLabel,
}

impl DownloadProgress {
    fn idle() -> Self {
        Self {
            downloads: 0,
            total_size: 0,
            total_downloaded: 0,
            total_speed: 0,
            progress: 0.0,
            eta_seconds: 0,
            label: ProgressLabel::Queued,
        }
    }

    /// Whether any download for the item is still in the queue.
    pub fn is_active(&self) -> bool {
        self.downloads > 0
    }
}

/// Aggregates every download targeting `media_id`, weighting by size rather than count.
pub fn aggregate_progress(
    downloads: &[Download],
    media_id: MediaId,
    media_type: MediaType,
) -> DownloadProgress {
    let matching: Vec<&Download> = downloads
        .iter()
        .filter(|download| download.media_id_for(media_type) == Some(media_id))
        .collect();
    trace!(target: "progress", %media_id, %media_type, downloads = matching.len(), "aggregating downloads");

    summarize(&matching)
}

/// Same reduction over an already-correlated set of downloads.
pub fn summarize(downloads: &[&Download]) -> DownloadProgress {
    if downloads.is_empty() {
        return DownloadProgress::idle();
    }

    let total_size: u64 = downloads.iter().map(|d| d.size.unwrap_or(0)).sum();
    let total_downloaded: u64 = downloads
        .iter()
        .map(|d| d.downloaded_size.unwrap_or(0))
        .sum();
    let total_speed: u64 = downloads.iter().map(|d| d.download_speed.unwrap_or(0)).sum();

    let progress = if total_size > 0 {
        total_downloaded as f64 / total_size as f64 * 100.0
    } else {
        0.0
    };

    let eta_seconds = if total_speed > 0 {
        total_size.saturating_sub(total_downloaded).div_ceil(total_speed)
    } else {
        0
    };

    let label = if progress >= 100.0 {
        ProgressLabel::Importing
    } else if downloads
        .iter()
        .all(|d| d.status == DownloadStatus::Paused)
    {
        ProgressLabel::Paused
    } else if downloads
        .iter()
        .any(|d| d.status == DownloadStatus::Downloading)
    {
        ProgressLabel::Downloading(format_eta(eta_seconds))
    } else {
        ProgressLabel::Queued
    };

    DownloadProgress {
        downloads: downloads.len(),
        total_size,
        total_downloaded,
        total_speed,
        progress,
        eta_seconds,
        label,
    }
}

/// `"1h 5m"`, `"3m 10s"`, `"45s"`. Unknown ETA reads as `"Downloading"`.
pub fn format_eta(seconds: u64) -> String {
    if seconds == 0 {
        return "Downloading".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Binary units, one decimal place.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}
