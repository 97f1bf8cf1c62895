//! Serial event loop owning a [`FeedTracker`]
//!
//! Every state change happens on the task running [`FeedTracker::run`]:
//! host signals, store change notifications and asset completions are
//! multiplexed here, so the tracker never needs a lock.

use crate::asset::AssetLoaded;
use crate::tracker::FeedTracker;
use tokio::sync::mpsc;

/// Signals from the host app and the rendering layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    ScreenWillAppear,
    ScreenWillDisappear,
    VisibleRowsChanged,
    BeganUpdates,
    EndedUpdates,
    RowRequested(usize),
    AppWillEnterForeground,
    AppDidEnterBackground,
    Shutdown,
}

enum Wake {
    StoreChanged,
    StoreClosed,
    Asset(AssetLoaded),
    Host(Option<HostEvent>),
}

impl FeedTracker {
    /// Drive the tracker until `Shutdown` arrives or the event channel
    /// closes. Returns the tracker for inspection.
    pub async fn run(mut self, mut events: mpsc::Receiver<HostEvent>) -> Self {
        let mut store_open = true;
        loop {
            let wake = tokio::select! {
                changed = self.changes.changed(), if store_open => match changed {
                    Ok(()) => Wake::StoreChanged,
                    Err(_) => Wake::StoreClosed,
                },
                Some(loaded) = self.asset_rx.recv() => Wake::Asset(loaded),
                event = events.recv() => Wake::Host(event),
            };

            match wake {
                Wake::StoreChanged => {
                    self.changes.borrow_and_update();
                    self.on_external_change();
                }
                Wake::StoreClosed => {
                    tracing::warn!("item store closed its change channel");
                    store_open = false;
                }
                Wake::Asset(loaded) => self.apply_asset_loaded(loaded),
                Wake::Host(None) | Wake::Host(Some(HostEvent::Shutdown)) => break,
                Wake::Host(Some(event)) => self.handle(event),
            }
        }
        tracing::info!("feed tracker loop stopped");
        self
    }

    pub fn handle(&mut self, event: HostEvent) {
        match event {
            HostEvent::ScreenWillAppear => self.screen_will_appear(),
            HostEvent::ScreenWillDisappear => self.screen_will_disappear(),
            HostEvent::VisibleRowsChanged => self.visible_rows_changed(),
            HostEvent::BeganUpdates => self.began_updates(),
            HostEvent::EndedUpdates => self.ended_updates(),
            HostEvent::RowRequested(row) => {
                self.row_requested(row);
            }
            HostEvent::AppWillEnterForeground => self.app_will_enter_foreground(),
            HostEvent::AppDidEnterBackground => self.app_did_enter_background(),
            HostEvent::Shutdown => {}
        }
    }
}
