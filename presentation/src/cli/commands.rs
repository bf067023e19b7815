//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for huddle
#[derive(Parser, Debug)]
#[command(name = "huddle")]
#[command(author, version, about = "Timed group discussions with peer-ranking surveys")]
#[command(long_about = r#"
Huddle joins a timed group discussion and walks you through the peer survey.

A session moves through four phases:
1. Prep:       read the material before the discussion starts
2. Discussion: talk it through with your group
3. Survey:     rank the three peers who stood out for each question
4. Done:       wait until the group has finished, then see the results

Each survey question has its own countdown. Letting it run out, or
confirming without ranking anyone, costs a flat penalty.

Survey commands:
  1 bob | rank 1 bob   put bob in 1st place
  clear 2              empty the 2nd place
  confirm | ok         lock the current question
  skip                 lock it without rankings (penalty)
  back | go <n>        revisit an earlier question
  show                 redisplay the current question
  leave                leave the session (asks first)

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./huddle.toml       Project-level config
3. ~/.config/huddle/config.toml   Global config
Environment variables prefixed with HUDDLE_ override all files.

Example:
  huddle sess1 alice
  huddle --server https://class.example.com/api --level b2 sess1 alice
"#)]
pub struct Cli {
    /// Session to join (not required with --show-config)
    pub session: Option<String>,

    /// Your student id within the session
    pub student: Option<String>,

    /// Language level used to pick survey questions
    #[arg(short, long, default_value = "b1")]
    pub level: String,

    /// Base URL of the session service
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Directory for the local phase snapshot
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Keep the phase snapshot in memory only
    #[arg(long, conflicts_with = "state_dir")]
    pub ephemeral: bool,

    /// Append session events as JSON lines to this file
    #[arg(long, value_name = "PATH")]
    pub event_log: Option<PathBuf>,

    /// Write diagnostics to a daily rolling file in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress countdowns and progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_session_and_student() {
        let cli = Cli::parse_from(["huddle", "sess1", "alice", "-vv", "--level", "b2"]);
        assert_eq!(cli.session.as_deref(), Some("sess1"));
        assert_eq!(cli.student.as_deref(), Some("alice"));
        assert_eq!(cli.level, "b2");
        assert_eq!(cli.verbose, 2);
        assert!(!cli.ephemeral);
    }

    #[test]
    fn test_ephemeral_conflicts_with_state_dir() {
        let result =
            Cli::try_parse_from(["huddle", "s", "a", "--ephemeral", "--state-dir", "/tmp/x"]);
        assert!(result.is_err());
    }
}
