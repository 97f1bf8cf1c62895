//! Session state machine
//!
//! A session is open while the inbox screen is visible and the app is in
//! the foreground. Screen visibility and app lifecycle arrive independently;
//! the manager reconciles them so at most one session is ever live.

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::error::TrackingError;
use crate::impression::ImpressionTracker;
use crate::types::{InboxCounts, Snapshot};
use chrono::{DateTime, TimeDelta, Utc};
use inboxview_telemetry::{AnalyticsSink, CompletedSessionRecord};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One live viewing session
#[derive(Debug)]
pub struct Session {
    pub start_time: DateTime<Utc>,
    pub start_counts: InboxCounts,
    pub impressions: ImpressionTracker,
}

#[derive(Debug)]
enum State {
    Idle,
    Active(Session),
}

pub struct SessionManager {
    state: State,
    /// Set when a session should open on the next foreground
    resume_on_foreground: bool,
    in_background: bool,
    min_duration: TimeDelta,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn AnalyticsSink>,
}

impl SessionManager {
    pub fn new(config: &TrackerConfig, clock: Arc<dyn Clock>, sink: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            state: State::Idle,
            resume_on_foreground: false,
            in_background: false,
            min_duration: config.min_impression_duration(),
            clock,
            sink,
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            State::Active(session) => Some(session),
            State::Idle => None,
        }
    }

    pub fn resume_pending(&self) -> bool {
        self.resume_on_foreground
    }

    pub fn is_backgrounded(&self) -> bool {
        self.in_background
    }

    /// Screen became visible. While the app is backgrounded the session is
    /// deferred to the next foreground. Returns whether a session started.
    pub fn screen_did_appear(
        &mut self,
        visible_rows: &BTreeSet<usize>,
        counts: InboxCounts,
    ) -> Result<bool, TrackingError> {
        if self.in_background {
            tracing::debug!("screen shown while backgrounded, deferring session");
            self.resume_on_foreground = true;
            return Ok(false);
        }
        self.start_session(visible_rows, counts)?;
        Ok(true)
    }

    /// Idle -> Active. The active session is left untouched if one exists.
    pub fn start_session(
        &mut self,
        visible_rows: &BTreeSet<usize>,
        counts: InboxCounts,
    ) -> Result<(), TrackingError> {
        if self.is_tracking() {
            return Err(TrackingError::SessionAlreadyActive);
        }

        let now = self.clock.now();
        let mut impressions = ImpressionTracker::new(self.min_duration);
        impressions.update_visible_rows(visible_rows, now);

        tracing::info!(
            total = counts.total,
            unread = counts.unread,
            "inbox session start"
        );
        self.state = State::Active(Session {
            start_time: now,
            start_counts: counts,
            impressions,
        });
        Ok(())
    }

    /// Active -> Idle. Finalizes impressions against `snapshot`, submits the
    /// completed record to the sink and returns it.
    pub fn end_session(
        &mut self,
        snapshot: &Snapshot,
        counts: InboxCounts,
    ) -> Result<CompletedSessionRecord, TrackingError> {
        let mut session = match std::mem::replace(&mut self.state, State::Idle) {
            State::Active(session) => session,
            State::Idle => return Err(TrackingError::NoActiveSession),
        };

        let now = self.clock.now();
        let impressions = session.impressions.end_session(snapshot, now);
        let record = CompletedSessionRecord {
            session_start_time: session.start_time,
            session_end_time: now,
            start_total_message_count: session.start_counts.total,
            start_unread_message_count: session.start_counts.unread,
            end_total_message_count: counts.total,
            end_unread_message_count: counts.unread,
            impressions,
        };

        tracing::info!(
            impressions = record.impressions.len(),
            duration_secs = record.duration_secs(),
            "inbox session end"
        );
        self.sink.submit(record.clone());
        Ok(record)
    }

    /// Forward visible rows to the live session. Returns false when idle.
    pub fn update_visible_rows(&mut self, visible_rows: &BTreeSet<usize>) -> bool {
        let now = self.clock.now();
        match &mut self.state {
            State::Active(session) => {
                session.impressions.update_visible_rows(visible_rows, now);
                true
            }
            State::Idle => {
                tracing::debug!("not tracking session, ignoring visible rows");
                false
            }
        }
    }

    /// Re-key impression rows of the live session after a structural change
    pub fn remap_rows<F>(&mut self, mapping: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        let now = self.clock.now();
        if let State::Active(session) = &mut self.state {
            session.impressions.remap_rows(mapping, now);
        }
    }

    /// Screen disappeared. If backgrounding already closed the session,
    /// cancel the pending resume instead of reporting a double end.
    pub fn screen_did_disappear(
        &mut self,
        snapshot: &Snapshot,
        counts: InboxCounts,
    ) -> Result<Option<CompletedSessionRecord>, TrackingError> {
        if !self.is_tracking() && self.resume_on_foreground {
            tracing::debug!("screen hidden while backgrounded, dropping pending resume");
            self.resume_on_foreground = false;
            return Ok(None);
        }
        self.end_session(snapshot, counts).map(Some)
    }

    /// App moved to the background: end the live session, if any, and
    /// remember to start a fresh one on return.
    pub fn app_did_enter_background(
        &mut self,
        snapshot: &Snapshot,
        counts: InboxCounts,
    ) -> Option<CompletedSessionRecord> {
        self.in_background = true;
        if !self.is_tracking() {
            return None;
        }
        let record = self.end_session(snapshot, counts).ok();
        self.resume_on_foreground = true;
        record
    }

    /// App returned to the foreground: start the deferred session, if any.
    /// `current` is only called when a session is about to start and yields
    /// the visible rows and inbox counts at that moment. Returns whether a
    /// session was started.
    pub fn app_will_enter_foreground<F>(&mut self, current: F) -> Result<bool, TrackingError>
    where
        F: FnOnce() -> (BTreeSet<usize>, InboxCounts),
    {
        self.in_background = false;
        if !self.resume_on_foreground {
            return Ok(false);
        }
        self.resume_on_foreground = false;
        let (visible_rows, counts) = current();
        self.start_session(&visible_rows, counts)?;
        Ok(true)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state)
            .field("resume_on_foreground", &self.resume_on_foreground)
            .field("in_background", &self.in_background)
            .field("min_duration", &self.min_duration)
            .finish_non_exhaustive()
    }
}
