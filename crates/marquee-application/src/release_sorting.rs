// SPDX-License-Identifier: GPL-3.0-or-later
use std::cmp::Ordering;

use lazy_static::lazy_static;
use marquee_domain::Release;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    Score,
    Title,
    Quality,
    Slot,
    Indexer,
    Size,
    Age,
    Peers,
}

impl SortColumn {
    /// Direction a column starts in when it is first selected.
    pub fn default_direction(self) -> SortDirection {
        match self {
            Self::Title | Self::Indexer => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// The single active sort of a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: SortColumn::Score,
            direction: SortDirection::Desc,
        }
    }
}

impl SortState {
    /// Header click: same column flips, a new column starts at its default direction.
    pub fn toggle(self, column: SortColumn) -> Self {
        if self.column == column {
            Self {
                column,
                direction: self.direction.flipped(),
            }
        } else {
            Self {
                column,
                direction: column.default_direction(),
            }
        }
    }
}

/// Ordinal of a resolution label: 2160p=4, 1080p=3, 720p=2, 480p=1, SD=0, else -1.
pub fn quality_rank(label: Option<&str>) -> i32 {
    lazy_static! {
        static ref RESOLUTION_REGEX: Regex =
            Regex::new(r"(?i)\b(?P<res>2160|1080|720|480)p\b").expect("valid resolution regex");
        static ref SD_REGEX: Regex = Regex::new(r"(?i)\bsd\b").expect("valid sd regex");
    }

    let Some(label) = label else {
        return -1;
    };

    if let Some(res) = RESOLUTION_REGEX
        .captures(label)
        .and_then(|captures| captures.name("res"))
    {
        return match res.as_str() {
            "2160" => 4,
            "1080" => 3,
            "720" => 2,
            _ => 1,
        };
    }

    if SD_REGEX.is_match(label) {
        0
    } else {
        -1
    }
}

/// Slot number used for ordering; releases without a slot sort last ascending.
fn slot_rank(release: &Release) -> u32 {
    release.target_slot_number.unwrap_or(99)
}

fn age_rank(release: &Release) -> i64 {
    release
        .published_at()
        .map(|published| published.timestamp_millis())
        .unwrap_or(0)
}

/// Ascending comparison of two releases on `column`.
pub fn compare(column: SortColumn, a: &Release, b: &Release) -> Ordering {
    match column {
        SortColumn::Score => a.score.unwrap_or(0).cmp(&b.score.unwrap_or(0)),
        SortColumn::Title => a.title.cmp(&b.title),
        SortColumn::Quality => {
            quality_rank(a.quality.as_deref()).cmp(&quality_rank(b.quality.as_deref()))
        }
        SortColumn::Slot => slot_rank(a).cmp(&slot_rank(b)),
        SortColumn::Indexer => a.indexer.cmp(&b.indexer),
        SortColumn::Size => a.size.cmp(&b.size),
        SortColumn::Age => age_rank(a).cmp(&age_rank(b)),
        SortColumn::Peers => a.seeders.unwrap_or(0).cmp(&b.seeders.unwrap_or(0)),
    }
}

/// Total order used for display: the column first, then `guid` to break ties.
fn display_order(column: SortColumn, a: &Release, b: &Release) -> Ordering {
    compare(column, a, b).then_with(|| a.guid.cmp(&b.guid))
}

/// Sorts into a position that depends only on the set of releases, so sorting
/// again is a no-op. Descending is the exact reverse of ascending, ties included.
pub fn sort_releases(releases: &mut [Release], state: SortState) {
    match state.direction {
        SortDirection::Asc => releases.sort_by(|a, b| display_order(state.column, a, b)),
        SortDirection::Desc => releases.sort_by(|a, b| display_order(state.column, b, a)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_domain::ReleaseProtocol;

    fn release(guid: &str) -> Release {
        Release {
            guid: guid.to_string(),
            title: guid.to_string(),
            indexer: "indexer".to_string(),
            indexer_id: None,
            protocol: ReleaseProtocol::Torrent,
            download_url: None,
            size: 0,
            seeders: None,
            leechers: None,
            quality: None,
            score: None,
            publish_date: None,
            target_slot_id: None,
            target_slot_number: None,
            target_slot_name: None,
            is_slot_upgrade: None,
            is_slot_new_fill: None,
        }
    }

    fn with_quality(guid: &str, quality: Option<&str>) -> Release {
        Release {
            quality: quality.map(str::to_string),
            ..release(guid)
        }
    }

    fn guids(releases: &[Release]) -> Vec<&str> {
        releases.iter().map(|r| r.guid.as_str()).collect()
    }

    #[test]
    fn quality_ranks_follow_resolution_table() {
        assert_eq!(quality_rank(Some("2160p")), 4);
        assert_eq!(quality_rank(Some("Bluray-1080p")), 3);
        assert_eq!(quality_rank(Some("720p")), 2);
        assert_eq!(quality_rank(Some("480p")), 1);
        assert_eq!(quality_rank(Some("SD")), 0);
        assert_eq!(quality_rank(Some("CAM")), -1);
        assert_eq!(quality_rank(None), -1);
    }

    #[test]
    fn quality_sort_orders_by_ordinal() {
        let mut releases = vec![
            with_quality("a", Some("720p")),
            with_quality("b", Some("SD")),
            with_quality("c", Some("2160p")),
            with_quality("d", None),
        ];

        sort_releases(
            &mut releases,
            SortState {
                column: SortColumn::Quality,
                direction: SortDirection::Asc,
            },
        );
        assert_eq!(guids(&releases), vec!["d", "b", "a", "c"]);

        let ascending = releases.clone();
        sort_releases(
            &mut releases,
            SortState {
                column: SortColumn::Quality,
                direction: SortDirection::Desc,
            },
        );
        let mut reversed = ascending;
        reversed.reverse();
        assert_eq!(releases, reversed);
    }

    #[test]
    fn descending_is_exact_reverse_even_with_ties() {
        let mut releases: Vec<Release> = ["a", "b", "c", "d"]
            .iter()
            .zip([5, 1, 5, 1])
            .map(|(guid, score)| Release {
                score: Some(score),
                ..release(guid)
            })
            .collect();

        let asc = SortState {
            column: SortColumn::Score,
            direction: SortDirection::Asc,
        };
        sort_releases(&mut releases, asc);
        assert_eq!(guids(&releases), vec!["b", "d", "a", "c"]);

        let once = releases.clone();
        sort_releases(&mut releases, asc);
        assert_eq!(releases, once);

        sort_releases(&mut releases, asc.toggle(SortColumn::Score));
        assert_eq!(guids(&releases), vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn descending_sort_is_idempotent_with_ties() {
        let desc = SortState::default();
        let mut releases: Vec<Release> = ["a", "b", "c", "d"]
            .iter()
            .zip([5, 1, 5, 1])
            .map(|(guid, score)| Release {
                score: Some(score),
                ..release(guid)
            })
            .collect();

        sort_releases(&mut releases, desc);
        let once = releases.clone();
        sort_releases(&mut releases, desc);
        assert_eq!(releases, once);
        assert_eq!(guids(&releases), vec!["c", "a", "d", "b"]);

        let mut shuffled = vec![once[2].clone(), once[0].clone(), once[3].clone(), once[1].clone()];
        sort_releases(&mut shuffled, desc);
        assert_eq!(shuffled, once);
    }

    #[test]
    fn missing_slot_sorts_last_ascending() {
        let mut releases = vec![
            release("none"),
            Release {
                target_slot_number: Some(2),
                ..release("two")
            },
            Release {
                target_slot_number: Some(1),
                ..release("one")
            },
        ];
        sort_releases(
            &mut releases,
            SortState {
                column: SortColumn::Slot,
                direction: SortDirection::Asc,
            },
        );
        assert_eq!(guids(&releases), vec!["one", "two", "none"]);
    }

    #[test]
    fn age_treats_missing_dates_as_epoch() {
        let mut releases = vec![
            Release {
                publish_date: Some("2026-01-02T00:00:00Z".into()),
                ..release("new")
            },
            release("undated"),
            Release {
                publish_date: Some("2025-06-01T00:00:00Z".into()),
                ..release("old")
            },
        ];
        sort_releases(
            &mut releases,
            SortState {
                column: SortColumn::Age,
                direction: SortDirection::Asc,
            },
        );
        assert_eq!(guids(&releases), vec!["undated", "old", "new"]);
    }

    #[test]
    fn peers_and_size_are_numeric() {
        let mut releases = vec![
            Release {
                seeders: Some(3),
                size: 10,
                ..release("a")
            },
            Release {
                seeders: None,
                size: 30,
                ..release("b")
            },
            Release {
                seeders: Some(40),
                size: 20,
                ..release("c")
            },
        ];
        sort_releases(&mut releases, SortState::default().toggle(SortColumn::Peers));
        assert_eq!(guids(&releases), vec!["c", "a", "b"]);

        sort_releases(&mut releases, SortState::default().toggle(SortColumn::Size));
        assert_eq!(guids(&releases), vec!["b", "c", "a"]);
    }

    #[test]
    fn toggle_flips_active_column_and_defaults_new_ones() {
        let state = SortState::default();
        assert_eq!(state.toggle(SortColumn::Score).direction, SortDirection::Asc);
        assert_eq!(state.toggle(SortColumn::Title).direction, SortDirection::Asc);
        assert_eq!(state.toggle(SortColumn::Indexer).direction, SortDirection::Asc);
        assert_eq!(state.toggle(SortColumn::Size).direction, SortDirection::Desc);

        let title = state.toggle(SortColumn::Title);
        assert_eq!(title.toggle(SortColumn::Title).direction, SortDirection::Desc);
    }
}
