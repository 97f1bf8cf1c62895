//! Feed orchestrator
//!
//! Holds the snapshot the consumer has rendered (`current`) and the next one
//! (`pending`). A change notification diffs the latest store contents against
//! `current` and hands the steps to the consumer; `current` only becomes
//! `pending` when the consumer calls `began_updates`. While a delivered diff
//! is unacknowledged, further changes are coalesced into one reload that runs
//! on `ended_updates`.

use crate::asset::{AssetLoaded, AssetLoader};
use crate::consumer::FeedConsumer;
use crate::store::{ready_sync, ItemStore, StoreError};
use futures::future::BoxFuture;
use inboxview_core::{
    diff_sectioned, Clock, InboxCounts, Item, SessionManager, Snapshot, TrackerConfig,
    TrackingError,
};
use inboxview_telemetry::AnalyticsSink;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdatePhase {
    /// No diff outstanding
    Idle,
    /// Diff handed to the consumer, waiting for `began_updates`
    Delivered,
    /// Consumer is applying the diff, waiting for `ended_updates`
    Applying,
}

pub struct FeedTracker {
    config: TrackerConfig,
    store: Arc<dyn ItemStore>,
    consumer: Arc<dyn FeedConsumer>,
    assets: Option<Arc<dyn AssetLoader>>,
    sessions: SessionManager,
    current: Snapshot,
    pending: Option<Snapshot>,
    phase: UpdatePhase,
    reload_queued: bool,
    loading: HashSet<String>,
    pub(crate) changes: watch::Receiver<u64>,
    asset_tx: mpsc::UnboundedSender<AssetLoaded>,
    pub(crate) asset_rx: mpsc::UnboundedReceiver<AssetLoaded>,
}

impl FeedTracker {
    pub fn new(
        config: TrackerConfig,
        store: Arc<dyn ItemStore>,
        consumer: Arc<dyn FeedConsumer>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let mut changes = store.subscribe();
        changes.borrow_and_update();
        let current = Snapshot::new(store.fetch_current_items());
        let sessions = SessionManager::new(&config, clock, sink);
        let (asset_tx, asset_rx) = mpsc::unbounded_channel();

        tracing::info!(items = current.len(), "feed tracker created");
        Self {
            config,
            store,
            consumer,
            assets: None,
            sessions,
            current,
            pending: None,
            phase: UpdatePhase::Idle,
            reload_queued: false,
            loading: HashSet::new(),
            changes,
            asset_tx,
            asset_rx,
        }
    }

    pub fn with_asset_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.assets = Some(loader);
        self
    }

    pub fn num_items(&self) -> usize {
        self.current.len()
    }

    pub fn unread_count(&self) -> usize {
        self.current.unread_count()
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn has_pending_update(&self) -> bool {
        self.phase != UpdatePhase::Idle
    }

    pub fn is_tracking(&self) -> bool {
        self.sessions.is_tracking()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Item at `row` without side effects
    pub fn item(&self, row: usize) -> Option<&Item> {
        self.current.get(row)
    }

    /// Item at `row`; starts loading its asset if it has none yet
    pub fn row_requested(&mut self, row: usize) -> Option<&Item> {
        let target = self.current.get(row).map(|item| {
            let url = item.image_url.clone().filter(|_| item.needs_asset());
            (item.id.clone(), url)
        });
        match target {
            Some((id, Some(url))) => self.load_asset(row, id, url),
            Some(_) => {}
            None => {
                report(TrackingError::RowOutOfBounds {
                    row,
                    len: self.current.len(),
                });
                return None;
            }
        }
        self.current.get(row)
    }

    pub fn remove_row(&self, row: usize) {
        match self.current.get(row) {
            Some(item) => self.store.remove(&item.id),
            None => report(TrackingError::RowOutOfBounds {
                row,
                len: self.current.len(),
            }),
        }
    }

    pub fn mark_read_row(&self, row: usize) {
        match self.current.get(row) {
            Some(item) => self.store.mark_read(&item.id),
            None => report(TrackingError::RowOutOfBounds {
                row,
                len: self.current.len(),
            }),
        }
    }

    /// Ask the store to sync with its backend, if it can
    pub fn refresh(&self) -> BoxFuture<'static, Result<bool, StoreError>> {
        match self.store.as_sync_capable() {
            Some(store) => store.schedule_sync(),
            None => ready_sync(Err(StoreError::SyncUnsupported)),
        }
    }

    /// Handle a store change notification if one arrived. Returns whether
    /// there was one.
    pub fn poll_external_changes(&mut self) -> bool {
        match self.changes.has_changed() {
            Ok(true) => {
                self.changes.borrow_and_update();
                self.on_external_change();
                true
            }
            Ok(false) => false,
            Err(_) => {
                tracing::warn!("item store closed its change channel");
                false
            }
        }
    }

    pub fn on_external_change(&mut self) {
        if self.phase != UpdatePhase::Idle {
            tracing::debug!("update in flight, queueing reload");
            self.reload_queued = true;
            return;
        }

        let mut latest = Snapshot::new(self.store.fetch_current_items());
        carry_assets(&self.current, &mut latest);
        let steps = diff_sectioned(self.current.items(), latest.items(), self.config.section);

        if steps.is_empty() {
            // Row meanings are unchanged, so content can be refreshed in place
            tracing::debug!("inbox changed without structural diff");
            self.current = latest;
            return;
        }

        tracing::info!(steps = steps.len(), "inbox diff ready");
        self.pending = Some(latest);
        self.phase = UpdatePhase::Delivered;
        self.consumer.on_diff_ready(steps);
    }

    /// The consumer is about to apply the delivered diff. Row indices change
    /// meaning here and only here.
    pub fn began_updates(&mut self) {
        let next = match (self.phase, self.pending.take()) {
            (UpdatePhase::Delivered, Some(next)) => next,
            (_, pending) => {
                self.pending = pending;
                report(TrackingError::NoPendingUpdate);
                return;
            }
        };

        let previous = std::mem::replace(&mut self.current, next);
        if self.sessions.is_tracking() {
            let rows = self.current.row_index();
            self.sessions.remap_rows(|row| {
                previous
                    .get(row)
                    .and_then(|item| rows.get(item.id.as_str()).copied())
            });
        }
        self.phase = UpdatePhase::Applying;
    }

    pub fn ended_updates(&mut self) {
        if self.phase != UpdatePhase::Applying {
            report(TrackingError::UpdateNotStarted);
            return;
        }
        self.phase = UpdatePhase::Idle;

        if self.reload_queued {
            self.reload_queued = false;
            self.on_external_change();
        }
    }

    pub fn screen_will_appear(&mut self) {
        tracing::info!("inbox screen appearing");
        let rows = self.consumer.currently_visible_rows();
        let counts = store_counts(self.store.as_ref());
        if let Err(err) = self.sessions.screen_did_appear(&rows, counts) {
            report(err);
        }
    }

    pub fn screen_will_disappear(&mut self) {
        tracing::info!("inbox screen disappearing");
        let counts = store_counts(self.store.as_ref());
        if let Err(err) = self.sessions.screen_did_disappear(&self.current, counts) {
            report(err);
        }
    }

    pub fn visible_rows_changed(&mut self) {
        if !self.sessions.is_tracking() {
            tracing::debug!("not tracking session");
            return;
        }
        let rows = self.consumer.currently_visible_rows();
        self.sessions.update_visible_rows(&rows);
    }

    pub fn app_will_enter_foreground(&mut self) {
        tracing::info!("app entering foreground");
        let consumer = &self.consumer;
        let store = self.store.as_ref();
        let resumed = self.sessions.app_will_enter_foreground(|| {
            (consumer.currently_visible_rows(), store_counts(store))
        });
        if let Err(err) = resumed {
            report(err);
        }
    }

    pub fn app_did_enter_background(&mut self) {
        tracing::info!("app entered background");
        let counts = store_counts(self.store.as_ref());
        self.sessions.app_did_enter_background(&self.current, counts);
    }

    /// Apply every asset completion that has arrived. Returns how many.
    pub fn drain_asset_results(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(loaded) = self.asset_rx.try_recv() {
            self.apply_asset_loaded(loaded);
            applied += 1;
        }
        applied
    }

    pub fn apply_asset_loaded(&mut self, loaded: AssetLoaded) {
        let AssetLoaded { row, id, result } = loaded;
        self.loading.remove(&id);

        match result {
            Ok(data) => {
                // A delivered but unapplied diff must not lose the payload on swap
                if let Some(pending) = self.pending.as_mut() {
                    if let Some(next_row) = pending.position(&id) {
                        pending.attach_asset(next_row, &id, data.clone());
                    }
                }
                if self.current.attach_asset(row, &id, data) {
                    self.consumer.on_asset_ready(row);
                } else {
                    tracing::debug!(row, id = %id, "row no longer holds item, discarding asset");
                }
            }
            Err(err) => tracing::warn!(row, id = %id, %err, "asset fetch failed"),
        }
    }

    fn load_asset(&mut self, row: usize, id: String, url: String) {
        if !self.config.load_assets || self.loading.contains(&id) {
            return;
        }
        let Some(loader) = self.assets.clone() else {
            return;
        };
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::debug!(row, "no async runtime, skipping asset fetch");
                return;
            }
        };

        self.loading.insert(id.clone());
        let tx = self.asset_tx.clone();
        handle.spawn(async move {
            let result = loader.fetch(&url).await;
            // Receiver gone means the tracker was dropped
            let _ = tx.send(AssetLoaded { row, id, result });
        });
    }
}

impl std::fmt::Debug for FeedTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedTracker")
            .field("items", &self.current.len())
            .field("phase", &self.phase)
            .field("reload_queued", &self.reload_queued)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

fn store_counts(store: &dyn ItemStore) -> InboxCounts {
    InboxCounts {
        total: store.total_count(),
        unread: store.unread_count(),
    }
}

fn report(err: TrackingError) {
    tracing::error!(%err, "inbox tracking protocol violation");
}

/// Keep already loaded payloads for items that survive into `next`
fn carry_assets(current: &Snapshot, next: &mut Snapshot) {
    let rows = current.row_index();
    let loaded: Vec<(usize, String, bytes::Bytes)> = next
        .iter()
        .enumerate()
        .filter_map(|(row, item)| {
            let position = *rows.get(item.id.as_str())?;
            let data = current.get(position)?.image_data.clone()?;
            Some((row, item.id.clone(), data))
        })
        .collect();
    for (row, id, data) in loaded {
        next.attach_asset(row, &id, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_carry_assets_by_id() {
        let mut with_data = Item::new("m2").with_image_url("https://example.com/2.png");
        with_data.image_data = Some(Bytes::from_static(b"img"));
        let current = Snapshot::new(vec![Item::new("m1"), with_data]);

        let mut next = Snapshot::new(vec![
            Item::new("m2").with_image_url("https://example.com/2.png"),
            Item::new("m3"),
        ]);
        carry_assets(&current, &mut next);

        assert_eq!(
            next.get(0).unwrap().image_data,
            Some(Bytes::from_static(b"img"))
        );
        assert!(next.get(1).unwrap().image_data.is_none());
    }
}
