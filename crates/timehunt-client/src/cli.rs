//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use timehunt_core::{TracingConfig, TracingOutputFormat};

/// timehunt - Find your placeholder events and move them
#[derive(Debug, Parser)]
#[command(name = "timehunt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "TIMEHUNT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Format of diagnostics written to stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact, env = "TIMEHUNT_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Filter directive for diagnostics, e.g. `timehunt_providers=trace`
    ///
    /// Takes precedence over `RUST_LOG` and `--debug`.
    #[arg(long, global = true, env = "TIMEHUNT_LOG")]
    pub log_filter: Option<String>,

    /// Calendar to operate on (defaults to the configured one, then "primary")
    #[arg(long, global = true, env = "GOOGLE_CALENDAR_ID")]
    pub calendar_id: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Logging setup requested by the global flags.
    pub fn tracing_config(&self) -> TracingConfig {
        let config = if self.debug {
            TracingConfig::cli_debug()
        } else {
            TracingConfig::default()
        }
        .with_format(self.log_format.into());

        match self.log_filter {
            Some(ref filter) => config.with_env_filter(filter.clone()),
            None => config,
        }
    }
}

/// `--log-format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => TracingOutputFormat::Compact,
            LogFormat::Pretty => TracingOutputFormat::Pretty,
            LogFormat::Json => TracingOutputFormat::Json,
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List upcoming events whose name matches NAME, grouped by day
    List {
        /// Event name to search for
        name: String,
    },

    /// Replace the events named BEFORE with one event named AFTER over RANGE
    ///
    /// RANGE is `START~END`, each side a date (2024-06-01), a local date-time
    /// (2024-06-01T10:00) or an RFC 3339 timestamp. Nothing changes unless
    /// one of the BEFORE events overlaps RANGE and you confirm.
    Fix {
        /// Time range of the new event
        range: String,
        /// Name of the event to create
        after: String,
        /// Name of the events to remove
        before: String,
    },

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar
    #[cfg(feature = "google")]
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. Alternative to providing client_id
        /// and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
