//! Feed orchestration: snapshot buffering, diff delivery, asset loading and
//! lifecycle routing for the inbox view

mod asset;
mod consumer;
mod driver;
mod store;
mod tracker;

pub use asset::{AssetError, AssetLoaded, AssetLoader, HttpAssetLoader};
pub use consumer::FeedConsumer;
pub use driver::HostEvent;
pub use store::{ItemStore, MemoryStore, StoreError, SyncCapableStore};
pub use tracker::FeedTracker;
