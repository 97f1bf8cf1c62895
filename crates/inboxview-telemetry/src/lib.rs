//! Analytics records and sinks for inbox session tracking

mod io;
mod paths;
mod sink;
mod types;

pub use io::{append_jsonl, read_jsonl};
pub use paths::Paths;
pub use sink::{AnalyticsSink, JsonlSink, MemorySink};
pub use types::{CompletedSessionRecord, ImpressionRecord};
