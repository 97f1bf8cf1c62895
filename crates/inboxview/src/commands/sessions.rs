use inboxview_telemetry::{read_jsonl, CompletedSessionRecord, Paths};
use std::collections::HashMap;
use std::path::Path;

const RECENT_LIMIT: usize = 20;

fn compute_stats(sessions: &[CompletedSessionRecord]) -> String {
    if sessions.is_empty() {
        return "No sessions to analyze.".to_string();
    }
    let total = sessions.len();
    let avg_duration = sessions.iter().map(|s| s.duration_secs()).sum::<f64>() / total as f64;
    let impressions: usize = sessions.iter().map(|s| s.impressions.len()).sum();
    let displays: u32 = sessions.iter().map(|s| s.total_display_count()).sum();
    let read_during: i64 = sessions
        .iter()
        .map(|s| s.start_unread_message_count as i64 - s.end_unread_message_count as i64)
        .sum();

    let mut per_message: HashMap<&str, f64> = HashMap::new();
    for impression in sessions.iter().flat_map(|s| &s.impressions) {
        *per_message.entry(impression.message_id.as_str()).or_insert(0.0) +=
            impression.display_duration;
    }
    let top = per_message
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, secs)| format!("{} ({:.1}s)", id, secs))
        .unwrap_or_else(|| "none".to_string());

    format!(
        "Total sessions: {}\n\
         Avg duration: {:.1}s\n\
         Impressions: {} ({} displays)\n\
         Unread cleared: {}\n\
         Most viewed: {}",
        total, avg_duration, impressions, displays, read_during, top
    )
}

pub fn run(file: Option<&Path>, stats: bool) -> anyhow::Result<()> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => Paths::new()?.sessions_file(),
    };
    let sessions: Vec<CompletedSessionRecord> = read_jsonl(&path)?;

    if sessions.is_empty() {
        println!("No recorded sessions");
        return Ok(());
    }

    if stats {
        println!("{}", compute_stats(&sessions));
        return Ok(());
    }

    let recent: Vec<_> = sessions.iter().rev().take(RECENT_LIMIT).collect();
    println!("Recent Sessions (last {})", recent.len());
    println!("========================");
    for session in recent {
        println!(
            "  {} | {:.1}s | total:{}->{} unread:{}->{} impressions:{}",
            session.session_start_time.format("%Y-%m-%d %H:%M"),
            session.duration_secs(),
            session.start_total_message_count,
            session.end_total_message_count,
            session.start_unread_message_count,
            session.end_unread_message_count,
            session.impressions.len(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use inboxview_telemetry::{append_jsonl, ImpressionRecord};

    fn impression(id: &str, secs: f64) -> ImpressionRecord {
        ImpressionRecord {
            message_id: id.to_string(),
            silent_inbox: false,
            display_count: 1,
            display_duration: secs,
        }
    }

    fn sample_sessions() -> Vec<CompletedSessionRecord> {
        let start = Utc::now() - Duration::hours(1);
        vec![
            CompletedSessionRecord {
                session_start_time: start,
                session_end_time: start + Duration::seconds(10),
                start_total_message_count: 4,
                start_unread_message_count: 3,
                end_total_message_count: 4,
                end_unread_message_count: 1,
                impressions: vec![impression("m1", 4.0), impression("m2", 2.0)],
            },
            CompletedSessionRecord {
                session_start_time: start,
                session_end_time: start + Duration::seconds(20),
                start_total_message_count: 4,
                start_unread_message_count: 1,
                end_total_message_count: 3,
                end_unread_message_count: 1,
                impressions: vec![impression("m2", 5.0)],
            },
        ]
    }

    #[test]
    fn test_compute_stats() {
        let stats = compute_stats(&sample_sessions());
        assert!(stats.contains("Total sessions: 2"));
        assert!(stats.contains("Avg duration: 15.0s"));
        assert!(stats.contains("Impressions: 3 (3 displays)"));
        assert!(stats.contains("Unread cleared: 2"));
        assert!(stats.contains("Most viewed: m2 (7.0s)"));
    }

    #[test]
    fn test_compute_stats_empty() {
        assert_eq!(compute_stats(&[]), "No sessions to analyze.");
    }

    #[test]
    fn test_run_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.jsonl");
        for session in sample_sessions() {
            append_jsonl(&path, &session).unwrap();
        }
        assert!(run(Some(&path), false).is_ok());
        assert!(run(Some(&path), true).is_ok());
        assert!(run(Some(&dir.path().join("missing.jsonl")), false).is_ok());
    }
}
