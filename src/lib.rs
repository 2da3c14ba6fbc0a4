//! symfony-pipeline - CI/CD pipeline as code for a Symfony application
//!
//! The pipeline builds a PHP environment image, runs the test suite against a
//! MariaDB service, lints the code, and publishes a runnable image. Each stage
//! is a straight-line composition of container steps described with the
//! immutable [`engine::Container`] API and evaluated by an [`engine::Engine`].
//!
//! # Example
//!
//! ```no_run
//! use symfony_pipeline::engine::{Directory, DockerEngine, DockerEngineOptions};
//! use symfony_pipeline::SymfonyApp;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let engine = DockerEngine::connect(DockerEngineOptions::default())?;
//! let app = SymfonyApp::new(Directory::new("."));
//!
//! let report = app.test(&engine).await?;
//! println!("{}", report);
//!
//! let reference = app.publish(&engine).await?;
//! println!("Published {}", reference);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`engine`]: container descriptions and the engines that evaluate them
//! - [`pipeline`]: the Symfony application's stages
//! - [`plan`]: rendering a stage without running it
//! - [`progress`]: evaluation progress events

pub mod cli;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod util;

pub use config::{ConfigError, PipelineConfig};
pub use engine::{Container, DockerEngine, Engine, EngineError, RecordingEngine};
pub use pipeline::{PublishTarget, Stage, SymfonyApp};
pub use plan::Plan;
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_symfony_pipeline() {
        assert_eq!(NAME, "symfony-pipeline");
    }
}
