//! Utility modules for symfony-pipeline

pub mod logging;

pub use logging::{init_from_env, init_logging, LoggingConfig};
