//! Core inbox tracking: snapshot diffing, impression accounting and the
//! session state machine

mod clock;
mod config;
pub mod diff;
mod error;
mod impression;
mod session;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use diff::{apply_diff, diff, diff_sectioned, DiffStep, Keyed, SectionedDiffStep};
pub use error::TrackingError;
pub use impression::{Impression, ImpressionTracker};
pub use session::{Session, SessionManager};
pub use types::{InboxCounts, Item, Snapshot};
