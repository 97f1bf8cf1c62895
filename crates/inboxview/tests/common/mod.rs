#![allow(dead_code)]

use inboxview_core::{Item, SectionedDiffStep};
use inboxview_feed::FeedConsumer;
use std::collections::BTreeSet;
use std::sync::Mutex;

pub fn sample_items(ids: &[&str]) -> Vec<Item> {
    ids.iter().map(|id| Item::new(*id)).collect()
}

/// Consumer reporting a fixed-by-test visible set
#[derive(Default)]
pub struct StaticView {
    pub visible: Mutex<BTreeSet<usize>>,
    pub diffs: Mutex<usize>,
}

impl StaticView {
    pub fn show(&self, rows: &[usize]) {
        *self.visible.lock().unwrap() = rows.iter().copied().collect();
    }
}

impl FeedConsumer for StaticView {
    fn on_diff_ready(&self, _steps: Vec<SectionedDiffStep<Item>>) {
        *self.diffs.lock().unwrap() += 1;
    }

    fn on_asset_ready(&self, _row: usize) {}

    fn currently_visible_rows(&self) -> BTreeSet<usize> {
        self.visible.lock().unwrap().clone()
    }
}
