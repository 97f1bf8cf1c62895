use inboxview_core::TrackerConfig;
use inboxview_telemetry::Paths;

fn describe() -> String {
    let defaults = TrackerConfig::default();
    let sessions = Paths::new()
        .map(|paths| paths.sessions_file().display().to_string())
        .unwrap_or_else(|_| "unavailable".to_string());
    format!(
        "inboxview {}\nminimum impression: {:.1}s\nsessions file: {}",
        env!("CARGO_PKG_VERSION"),
        defaults.min_impression_secs,
        sessions
    )
}

pub fn run() -> anyhow::Result<()> {
    println!("{}", describe());
    Ok(())
}
