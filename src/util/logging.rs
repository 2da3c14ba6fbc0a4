//! Structured logging setup for symfony-pipeline
//!
//! Logging goes through the `tracing` ecosystem and is written to stderr, so
//! stage output printed on stdout stays machine-readable.
//!
//! # Features
//!
//! - Console output (default) or JSON lines for CI log collectors
//! - `RUST_LOG` respected when set
//! - Command output from containers under the `symfony_pipeline::exec` target,
//!   visible at debug level
//! - Thread-safe, initialized at most once
//!
//! # Example
//!
//! ```no_run
//! use symfony_pipeline::util::logging;
//!
//! logging::init_from_env();
//!
//! use tracing::{debug, info};
//! info!("Pipeline started");
//! debug!(stage = "lint", "Evaluating container");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Crates whose logs are capped at warn unless `RUST_LOG` says otherwise
const NOISY_TARGETS: [&str; 4] = ["h2", "hyper", "hyper_util", "bollard"];

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Emit JSON lines instead of console text
    pub use_json: bool,

    /// Include the module target (e.g., symfony_pipeline::engine) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    /// INFO level console output with targets
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Resolves the level from command-line flags.
    ///
    /// An explicit `--log-level` wins, then `--verbose` / `--quiet`, then
    /// `PIPELINE_LOG_LEVEL`.
    pub fn from_cli(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = match log_level {
            Some(level_str) => parse_level(level_str),
            None if verbose => Level::DEBUG,
            None if quiet => Level::ERROR,
            None => parse_level(
                &env::var("PIPELINE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            ),
        };

        if json_from_env() {
            Self {
                level,
                ..Self::structured()
            }
        } else {
            Self::with_level(level)
        }
    }

    /// JSON output with source locations, for CI log collectors
    pub fn structured() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }
}

fn json_from_env() -> bool {
    env::var("PIPELINE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false)
}

/// Parses a log level from a string, case-insensitive, defaulting to INFO
///
/// # Example
///
/// ```
/// use symfony_pipeline::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("INFO"), Level::INFO);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn build_filter(level: Level, rust_log_set: bool) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("symfony_pipeline={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    if !rust_log_set {
        for target in NOISY_TARGETS {
            if let Ok(directive) = format!("{}=warn", target).parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Initializes the logging system. Only the first call has an effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level, env::var("RUST_LOG").is_ok());

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}

/// Initializes logging from `PIPELINE_LOG_LEVEL` and `PIPELINE_LOG_JSON`
pub fn init_from_env() {
    init_logging(LoggingConfig::from_cli(None, false, false));
}
