use anyhow::Context;
use chrono::{DateTime, Utc};
use inboxview_core::{Item, ManualClock, SectionedDiffStep, TrackerConfig};
use inboxview_feed::{FeedConsumer, FeedTracker, ItemStore, MemoryStore};
use inboxview_telemetry::{AnalyticsSink, CompletedSessionRecord, JsonlSink, MemorySink, Paths};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ScriptEvent {
    Items { items: Vec<Item> },
    ScreenAppear,
    ScreenDisappear,
    Visible { rows: Vec<usize> },
    Background,
    Foreground,
    Read { id: String },
    Remove { id: String },
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptLine {
    at: DateTime<Utc>,
    #[serde(flatten)]
    event: ScriptEvent,
}

/// Rendering layer stand-in: remembers diffs and reports scripted rows
#[derive(Default)]
struct ReplayView {
    visible: Mutex<BTreeSet<usize>>,
    diffs: Mutex<Vec<Vec<SectionedDiffStep<Item>>>>,
}

impl ReplayView {
    fn take_diffs(&self) -> Vec<Vec<SectionedDiffStep<Item>>> {
        self.diffs
            .lock()
            .map(|mut diffs| std::mem::take(&mut *diffs))
            .unwrap_or_default()
    }
}

impl FeedConsumer for ReplayView {
    fn on_diff_ready(&self, steps: Vec<SectionedDiffStep<Item>>) {
        if let Ok(mut diffs) = self.diffs.lock() {
            diffs.push(steps);
        }
    }

    fn on_asset_ready(&self, _row: usize) {}

    fn currently_visible_rows(&self) -> BTreeSet<usize> {
        self.visible
            .lock()
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }
}

/// Sends records to both the output file and an in-memory list
struct Recorder {
    file: Option<JsonlSink>,
    memory: MemorySink,
}

impl AnalyticsSink for Recorder {
    fn submit(&self, record: CompletedSessionRecord) {
        if let Some(file) = &self.file {
            file.submit(record.clone());
        }
        self.memory.submit(record);
    }
}

#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub events: usize,
    pub diffs: Vec<Vec<SectionedDiffStep<Item>>>,
    pub sessions: Vec<CompletedSessionRecord>,
    pub still_tracking: bool,
}

fn parse_script(script: &str) -> anyhow::Result<Vec<ScriptLine>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(no, line)| {
            serde_json::from_str(line).with_context(|| format!("script line {}", no + 1))
        })
        .collect()
}

/// Drive a tracker through `script`. Diffs are acknowledged as soon as they
/// are delivered.
pub fn replay(
    script: &str,
    config: TrackerConfig,
    output: Option<JsonlSink>,
) -> anyhow::Result<ReplaySummary> {
    let lines = parse_script(script)?;
    let start = lines.first().map(|l| l.at).unwrap_or_else(Utc::now);

    let clock = Arc::new(ManualClock::new(start));
    let store = Arc::new(MemoryStore::default());
    let view = Arc::new(ReplayView::default());
    let recorder = Arc::new(Recorder {
        file: output,
        memory: MemorySink::new(),
    });
    let mut tracker = FeedTracker::new(
        config,
        store.clone(),
        view.clone(),
        clock.clone(),
        recorder.clone(),
    );

    let mut summary = ReplaySummary {
        events: lines.len(),
        ..Default::default()
    };

    for line in lines {
        clock.set(line.at);
        match line.event {
            ScriptEvent::Items { items } => store.set_items(items),
            ScriptEvent::ScreenAppear => tracker.screen_will_appear(),
            ScriptEvent::ScreenDisappear => tracker.screen_will_disappear(),
            ScriptEvent::Visible { rows } => {
                if let Ok(mut visible) = view.visible.lock() {
                    *visible = rows.into_iter().collect();
                }
                tracker.visible_rows_changed();
            }
            ScriptEvent::Background => tracker.app_did_enter_background(),
            ScriptEvent::Foreground => tracker.app_will_enter_foreground(),
            ScriptEvent::Read { id } => store.mark_read(&id),
            ScriptEvent::Remove { id } => store.remove(&id),
        }

        tracker.poll_external_changes();
        while tracker.has_pending_update() {
            tracker.began_updates();
            tracker.ended_updates();
        }
        summary.diffs.extend(view.take_diffs());
    }

    summary.sessions = recorder.memory.records();
    summary.still_tracking = tracker.is_tracking();
    Ok(summary)
}

fn describe(step: &SectionedDiffStep<Item>) -> String {
    match step {
        SectionedDiffStep::Insert { row, value, .. } => format!("+ row {} {}", row, value.id),
        SectionedDiffStep::Delete { row, value, .. } => format!("- row {} {}", row, value.id),
    }
}

/// An explicit config path wins; otherwise `config.json` under the data dir
/// is used when present.
fn resolve_config(explicit: Option<&Path>, paths: Option<&Paths>) -> anyhow::Result<TrackerConfig> {
    if let Some(path) = explicit {
        return TrackerConfig::load(path);
    }
    match paths.map(Paths::config_file) {
        Some(path) if path.exists() => {
            tracing::debug!(path = %path.display(), "using data dir config");
            TrackerConfig::load(&path)
        }
        _ => Ok(TrackerConfig::default()),
    }
}

pub fn run(file: &Path, sessions: Option<&Path>, config: Option<&Path>) -> anyhow::Result<()> {
    let script = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let paths = Paths::new().ok();
    let config = resolve_config(config, paths.as_ref())?;
    let output = match (sessions, &paths) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(paths)) => paths.sessions_file(),
        (None, None) => anyhow::bail!("no data directory; pass --sessions"),
    };

    let summary = replay(&script, config, Some(JsonlSink::new(&output)))?;

    println!("Replayed {} events", summary.events);
    for (i, diff) in summary.diffs.iter().enumerate() {
        println!("Diff {}:", i + 1);
        for step in diff {
            println!("  {}", describe(step));
        }
    }
    for session in &summary.sessions {
        println!(
            "Session {} | {:.1}s | impressions:{}",
            session.session_start_time.format("%Y-%m-%d %H:%M:%S"),
            session.duration_secs(),
            session.impressions.len()
        );
        for impression in &session.impressions {
            println!(
                "  {} x{} {:.1}s",
                impression.message_id, impression.display_count, impression.display_duration
            );
        }
    }
    if summary.still_tracking {
        println!("Session still active at end of script (not recorded)");
    }
    println!("Sessions written to {}", output.display());
    Ok(())
}
