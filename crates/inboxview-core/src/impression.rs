//! Per-row visibility accounting within one session

use crate::error::TrackingError;
use crate::types::Snapshot;
use chrono::{DateTime, TimeDelta, Utc};
use inboxview_telemetry::ImpressionRecord;
use std::collections::{BTreeMap, BTreeSet};

/// Accumulated visibility of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Impression {
    pub display_count: u32,
    pub duration: TimeDelta,
}

impl Impression {
    fn merge(existing: Option<Impression>, duration: TimeDelta) -> Self {
        match existing {
            Some(prev) => Self {
                display_count: prev.display_count + 1,
                duration: prev.duration + duration,
            },
            None => Self {
                display_count: 1,
                duration,
            },
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.num_milliseconds() as f64 / 1000.0
    }
}

/// Tracks when each visible row appeared and how long rows have been shown.
///
/// Rows are keyed by index. A row index only means the same item for as
/// long as the snapshot underneath is unchanged; see [`remap_rows`].
///
/// [`remap_rows`]: ImpressionTracker::remap_rows
#[derive(Debug, Clone)]
pub struct ImpressionTracker {
    min_duration: TimeDelta,
    last_visible_rows: BTreeSet<usize>,
    start_times: BTreeMap<usize, DateTime<Utc>>,
    impressions: BTreeMap<usize, Impression>,
}

impl ImpressionTracker {
    pub fn new(min_duration: TimeDelta) -> Self {
        Self {
            min_duration,
            last_visible_rows: BTreeSet::new(),
            start_times: BTreeMap::new(),
            impressions: BTreeMap::new(),
        }
    }

    pub fn visible_rows(&self) -> &BTreeSet<usize> {
        &self.last_visible_rows
    }

    pub fn impression(&self, row: usize) -> Option<Impression> {
        self.impressions.get(&row).copied()
    }

    pub fn impressions(&self) -> &BTreeMap<usize, Impression> {
        &self.impressions
    }

    pub fn is_open(&self, row: usize) -> bool {
        self.start_times.contains_key(&row)
    }

    /// Start intervals for rows that appeared and close intervals for rows
    /// that disappeared. Rows present in both sets are left running.
    pub fn update_visible_rows(&mut self, visible: &BTreeSet<usize>, now: DateTime<Utc>) {
        if *visible == self.last_visible_rows {
            return;
        }

        let disappeared: Vec<usize> = self
            .last_visible_rows
            .difference(visible)
            .copied()
            .collect();
        let appeared: Vec<usize> = visible
            .difference(&self.last_visible_rows)
            .copied()
            .collect();

        for row in disappeared {
            if let Err(err) = self.end_impression(row, now) {
                tracing::error!(%err, "impression bookkeeping");
            }
        }
        for row in appeared {
            if let Err(err) = self.start_impression(row, now) {
                tracing::error!(%err, "impression bookkeeping");
            }
        }

        self.last_visible_rows = visible.clone();
        tracing::debug!(
            open = self.start_times.len(),
            counted = self.impressions.len(),
            "visible rows updated"
        );
    }

    /// Close every open interval and convert accumulated impressions into
    /// records keyed by the items of `snapshot`. Rows past the end of the
    /// snapshot are dropped.
    pub fn end_session(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<ImpressionRecord> {
        let open: Vec<usize> = self.start_times.keys().copied().collect();
        for row in open {
            if let Err(err) = self.end_impression(row, now) {
                tracing::error!(%err, "impression bookkeeping");
            }
        }
        self.last_visible_rows.clear();

        let mut records = Vec::with_capacity(self.impressions.len());
        for (&row, impression) in &self.impressions {
            match snapshot.get(row) {
                Some(item) => records.push(ImpressionRecord {
                    message_id: item.id.clone(),
                    silent_inbox: item.silent_inbox,
                    display_count: impression.display_count,
                    display_duration: impression.duration_secs(),
                }),
                None => {
                    let err = TrackingError::RowOutOfBounds {
                        row,
                        len: snapshot.len(),
                    };
                    tracing::error!(%err, "dropping impression");
                }
            }
        }
        records
    }

    /// Re-key every row after the snapshot underneath changed. `mapping`
    /// returns the new row for an old row, or `None` when the item is gone.
    /// Open intervals of vanished rows are closed first; their accumulated
    /// impressions are then dropped along with the row.
    pub fn remap_rows<F>(&mut self, mapping: F, now: DateTime<Utc>)
    where
        F: Fn(usize) -> Option<usize>,
    {
        let vanished: Vec<usize> = self
            .start_times
            .keys()
            .copied()
            .filter(|&row| mapping(row).is_none())
            .collect();
        for row in vanished {
            if let Err(err) = self.end_impression(row, now) {
                tracing::error!(%err, "impression bookkeeping");
            }
        }

        self.start_times = std::mem::take(&mut self.start_times)
            .into_iter()
            .filter_map(|(row, start)| mapping(row).map(|new_row| (new_row, start)))
            .collect();

        let before = self.impressions.len();
        self.impressions = std::mem::take(&mut self.impressions)
            .into_iter()
            .filter_map(|(row, impression)| mapping(row).map(|new_row| (new_row, impression)))
            .collect();

        self.last_visible_rows = self
            .last_visible_rows
            .iter()
            .filter_map(|&row| mapping(row))
            .collect();

        tracing::debug!(
            dropped = before - self.impressions.len(),
            "impression rows remapped"
        );
    }

    fn start_impression(&mut self, row: usize, now: DateTime<Utc>) -> Result<(), TrackingError> {
        if self.start_times.contains_key(&row) {
            return Err(TrackingError::ImpressionAlreadyStarted { row });
        }
        self.start_times.insert(row, now);
        Ok(())
    }

    fn end_impression(&mut self, row: usize, now: DateTime<Utc>) -> Result<(), TrackingError> {
        let start = self
            .start_times
            .remove(&row)
            .ok_or(TrackingError::ImpressionNotStarted { row })?;

        let duration = now - start;
        if duration < self.min_duration {
            tracing::debug!(row, "duration less than min, not counting impression");
            return Ok(());
        }

        let merged = Impression::merge(self.impressions.get(&row).copied(), duration);
        self.impressions.insert(row, merged);
        Ok(())
    }
}
