//! Analytics record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated visibility of one message over a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpressionRecord {
    pub message_id: String,
    #[serde(default)]
    pub silent_inbox: bool,
    pub display_count: u32,
    /// Total visible time in seconds
    pub display_duration: f64,
}

/// A finished inbox viewing session, ready for the analytics sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSessionRecord {
    pub session_start_time: DateTime<Utc>,
    pub session_end_time: DateTime<Utc>,
    pub start_total_message_count: usize,
    pub start_unread_message_count: usize,
    pub end_total_message_count: usize,
    pub end_unread_message_count: usize,
    #[serde(default)]
    pub impressions: Vec<ImpressionRecord>,
}

impl CompletedSessionRecord {
    /// Wall-clock length of the session in seconds
    pub fn duration_secs(&self) -> f64 {
        (self.session_end_time - self.session_start_time).num_milliseconds() as f64 / 1000.0
    }

    /// Sum of display counts across all impressions
    pub fn total_display_count(&self) -> u32 {
        self.impressions.iter().map(|i| i.display_count).sum()
    }
}
