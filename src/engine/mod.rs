//! Container host abstraction
//!
//! Pipelines describe containers with the fluent [`Container`] API and hand
//! them to an [`Engine`] for evaluation. Two engines ship with the crate:
//!
//! - [`DockerEngine`]: runs every step against a local Docker daemon
//! - [`RecordingEngine`]: records what it was asked to do and replays
//!   scripted results, for tests

mod container;
mod directory;
mod docker;
mod error;
mod recording;
mod reference;

pub use container::{CacheVolume, Container, Operation, Service};
pub use directory::Directory;
pub use docker::{listening_ports, DockerEngine, DockerEngineOptions, RegistryAuth};
pub use error::EngineError;
pub use recording::{RecordedAction, RecordedCall, RecordingEngine, ScriptedResponse};
pub use reference::ImageReference;

use async_trait::async_trait;
use serde::Serialize;

/// Availability of an engine's container host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineHealth {
    pub engine: String,
    pub available: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl EngineHealth {
    pub fn available(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            available: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn unavailable(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            available: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Evaluates container descriptions
#[async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    /// Reports whether the container host can be reached
    async fn check(&self) -> EngineHealth;

    /// Runs every step and returns the standard output of the last exec
    async fn stdout(&self, container: &Container) -> Result<String, EngineError>;

    /// Runs every step, then pushes the resulting image to `address`.
    /// Returns the published reference, pinned to a digest when known.
    async fn publish(&self, container: &Container, address: &str) -> Result<String, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_constructors() {
        let ok = EngineHealth::available("docker", "Docker 27.0 reachable");
        assert!(ok.available);
        assert!(ok.details.is_none());

        let down = EngineHealth::unavailable("docker", "socket missing").with_details("/var/run");
        assert!(!down.available);
        assert_eq!(down.details.as_deref(), Some("/var/run"));
    }

    #[test]
    fn test_health_serialization_skips_empty_details() {
        let ok = EngineHealth::available("docker", "ok");
        let json = serde_json::to_string(&ok).unwrap();
        assert!(!json.contains("details"));
    }
}
