mod common;

use common::items;
use inboxview_core::{Item, ManualClock, SectionedDiffStep, TrackerConfig};
use inboxview_feed::{FeedConsumer, FeedTracker, HostEvent, MemoryStore};
use inboxview_telemetry::MemorySink;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Acknowledges every diff by queueing begin/end events back to the loop
struct AckingConsumer {
    events: mpsc::Sender<HostEvent>,
    delivered: mpsc::UnboundedSender<usize>,
}

impl FeedConsumer for AckingConsumer {
    fn on_diff_ready(&self, steps: Vec<SectionedDiffStep<Item>>) {
        let _ = self.events.try_send(HostEvent::BeganUpdates);
        let _ = self.events.try_send(HostEvent::EndedUpdates);
        let _ = self.delivered.send(steps.len());
    }

    fn on_asset_ready(&self, _row: usize) {}

    fn currently_visible_rows(&self) -> BTreeSet<usize> {
        [0].into_iter().collect()
    }
}

#[tokio::test]
async fn test_loop_applies_store_changes_and_lifecycle() {
    let store = Arc::new(MemoryStore::new(items(&["m1", "m2"])));
    let sink = Arc::new(MemorySink::new());
    let clock = Arc::new(ManualClock::default());
    let (events_tx, events_rx) = mpsc::channel(16);
    let (delivered_tx, mut delivered_rx) = mpsc::unbounded_channel();

    let consumer = Arc::new(AckingConsumer {
        events: events_tx.clone(),
        delivered: delivered_tx,
    });
    let tracker = FeedTracker::new(
        TrackerConfig::default(),
        store.clone(),
        consumer,
        clock.clone(),
        sink.clone(),
    );
    let running = tokio::spawn(tracker.run(events_rx));

    events_tx.send(HostEvent::ScreenWillAppear).await.unwrap();
    store.set_items(items(&["m0", "m1", "m2"]));

    let steps = tokio::time::timeout(Duration::from_secs(5), delivered_rx.recv())
        .await
        .expect("diff delivered")
        .unwrap();
    assert_eq!(steps, 1);

    clock.advance_secs(2.0);
    events_tx.send(HostEvent::AppDidEnterBackground).await.unwrap();
    events_tx.send(HostEvent::Shutdown).await.unwrap();

    let tracker = running.await.unwrap();
    let ids: Vec<&str> = tracker.current().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["m0", "m1", "m2"]);
    assert!(!tracker.is_tracking());
    assert!(tracker.sessions().resume_pending());

    let records = sink.records();
    assert_eq!(records.len(), 1);
    // Row 0 (m1) moved to row 1 when m0 was inserted above it
    assert_eq!(records[0].impressions.len(), 1);
    assert_eq!(records[0].impressions[0].message_id, "m1");
}

#[tokio::test]
async fn test_loop_stops_when_events_close() {
    let store = Arc::new(MemoryStore::new(items(&["m1"])));
    let (ack_tx, _ack_rx) = mpsc::channel(4);
    let (delivered_tx, _delivered_rx) = mpsc::unbounded_channel();
    let consumer = Arc::new(AckingConsumer {
        events: ack_tx,
        delivered: delivered_tx,
    });
    let tracker = FeedTracker::new(
        TrackerConfig::default(),
        store,
        consumer,
        Arc::new(ManualClock::default()),
        Arc::new(MemorySink::new()),
    );

    let (events_tx, events_rx) = mpsc::channel(4);
    let running = tokio::spawn(tracker.run(events_rx));
    events_tx.send(HostEvent::ScreenWillAppear).await.unwrap();
    drop(events_tx);

    let tracker = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("loop stopped")
        .unwrap();
    assert!(tracker.is_tracking());
    assert_eq!(tracker.num_items(), 1);
}
