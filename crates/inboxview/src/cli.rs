use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "inboxview")]
#[command(version)]
#[command(about = "Inbox session and impression tracking")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a JSONL script of inbox and lifecycle events
    Replay {
        /// Path to the event script
        #[arg(short, long)]
        file: PathBuf,

        /// Where to append completed sessions (defaults to the data dir)
        #[arg(short, long)]
        sessions: Option<PathBuf>,

        /// Tracker config JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// View recorded sessions
    Sessions {
        /// Sessions JSONL (defaults to the data dir)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Show statistics summary
        #[arg(long)]
        stats: bool,
    },

    /// Print version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::try_parse_from(["inboxview", "version"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Version));
    }

    #[test]
    fn test_cli_parse_replay() {
        let cli = Cli::try_parse_from([
            "inboxview",
            "replay",
            "--file",
            "script.jsonl",
            "--sessions",
            "out.jsonl",
        ]);
        if let Commands::Replay {
            file,
            sessions,
            config,
        } = cli.unwrap().command
        {
            assert_eq!(file, PathBuf::from("script.jsonl"));
            assert_eq!(sessions, Some(PathBuf::from("out.jsonl")));
            assert!(config.is_none());
        } else {
            panic!("Expected Replay command");
        }
    }

    #[test]
    fn test_cli_replay_requires_file() {
        assert!(Cli::try_parse_from(["inboxview", "replay"]).is_err());
    }

    #[test]
    fn test_cli_parse_sessions_stats() {
        let cli = Cli::try_parse_from(["inboxview", "sessions", "--stats"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sessions {
                stats: true,
                file: None
            }
        ));
    }
}
