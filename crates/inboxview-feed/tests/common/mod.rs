#![allow(dead_code)]

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use inboxview_core::{Item, ManualClock, SectionedDiffStep, TrackerConfig};
use inboxview_feed::{AssetError, AssetLoader, FeedConsumer, FeedTracker, MemoryStore};
use inboxview_telemetry::MemorySink;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Consumer that records callbacks and reports a settable visible set
#[derive(Default)]
pub struct RecordingConsumer {
    pub diffs: Mutex<Vec<Vec<SectionedDiffStep<Item>>>>,
    pub assets_ready: Mutex<Vec<usize>>,
    pub visible: Mutex<BTreeSet<usize>>,
    pub visible_queries: AtomicUsize,
}

impl RecordingConsumer {
    pub fn set_visible(&self, rows: &[usize]) {
        *self.visible.lock().unwrap() = rows.iter().copied().collect();
    }

    pub fn diff_count(&self) -> usize {
        self.diffs.lock().unwrap().len()
    }

    pub fn last_diff(&self) -> Vec<SectionedDiffStep<Item>> {
        self.diffs.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn queries(&self) -> usize {
        self.visible_queries.load(Ordering::SeqCst)
    }
}

impl FeedConsumer for RecordingConsumer {
    fn on_diff_ready(&self, steps: Vec<SectionedDiffStep<Item>>) {
        self.diffs.lock().unwrap().push(steps);
    }

    fn on_asset_ready(&self, row: usize) {
        self.assets_ready.lock().unwrap().push(row);
    }

    fn currently_visible_rows(&self) -> BTreeSet<usize> {
        self.visible_queries.fetch_add(1, Ordering::SeqCst);
        self.visible.lock().unwrap().clone()
    }
}

/// Loader that answers every url with its own bytes
#[derive(Default)]
pub struct EchoLoader {
    pub requests: Mutex<Vec<String>>,
}

impl AssetLoader for EchoLoader {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Bytes, AssetError>> {
        self.requests.lock().unwrap().push(url.to_string());
        let body = Bytes::from(url.to_string());
        async move { Ok(body) }.boxed()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub consumer: Arc<RecordingConsumer>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<MemorySink>,
    pub tracker: FeedTracker,
}

pub fn items(ids: &[&str]) -> Vec<Item> {
    ids.iter().map(|id| Item::new(*id)).collect()
}

pub fn harness(initial: Vec<Item>) -> Harness {
    let store = Arc::new(MemoryStore::new(initial));
    let consumer = Arc::new(RecordingConsumer::default());
    let clock = Arc::new(ManualClock::default());
    let sink = Arc::new(MemorySink::new());
    let tracker = FeedTracker::new(
        TrackerConfig::default(),
        store.clone(),
        consumer.clone(),
        clock.clone(),
        sink.clone(),
    );
    Harness {
        store,
        consumer,
        clock,
        sink,
        tracker,
    }
}

pub fn ids(tracker: &FeedTracker) -> Vec<String> {
    tracker.current().iter().map(|item| item.id.clone()).collect()
}
