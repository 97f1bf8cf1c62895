use inboxview_core::{Item, SectionedDiffStep};
use std::collections::BTreeSet;

/// The rendering layer, as seen by the tracker.
///
/// Callbacks run on the tracker's owner context. Implementations must not
/// apply a diff inline: they schedule their update and later report
/// `began_updates` / `ended_updates` back to the tracker (directly or via
/// [`HostEvent`](crate::HostEvent)).
pub trait FeedConsumer: Send + Sync {
    fn on_diff_ready(&self, steps: Vec<SectionedDiffStep<Item>>);

    fn on_asset_ready(&self, row: usize);

    fn currently_visible_rows(&self) -> BTreeSet<usize>;
}
