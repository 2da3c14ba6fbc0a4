//! Configuration management for symfony-pipeline
//!
//! Settings are loaded from environment variables with sensible defaults and
//! can be overridden from the command line before validation.
//!
//! # Environment Variables
//!
//! - `PIPELINE_SOURCE`: Application source directory - default: "."
//! - `PIPELINE_PHP_VERSION`: PHP minor version of the base image - default: "8.3"
//! - `PIPELINE_REGISTRY`: Registry (and optional namespace) to publish to - default: "ttl.sh"
//! - `PIPELINE_IMAGE_NAME`: Image name prefix; a random suffix is appended - default: "symfony-sample-app"
//! - `PIPELINE_SERVICE_TIMEOUT`: Seconds a bound service may take to start listening - default: "120"
//! - `PIPELINE_REGISTRY_USERNAME` / `PIPELINE_REGISTRY_PASSWORD`: Registry login, both or neither
//! - `PIPELINE_LOG_LEVEL`: Logging level - default: "info"
//!
//! The Docker connection honors the standard `DOCKER_HOST` variable.
//!
//! # Example
//!
//! ```no_run
//! use symfony_pipeline::PipelineConfig;
//! use std::env;
//!
//! env::set_var("PIPELINE_PHP_VERSION", "8.2");
//!
//! let config = PipelineConfig::default();
//! config.validate().expect("Invalid configuration");
//! assert_eq!(config.php_version, "8.2");
//! ```

use crate::engine::{DockerEngineOptions, ImageReference, RegistryAuth};
use crate::pipeline::PublishTarget;
use regex::Regex;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default values for configuration
const DEFAULT_SOURCE_DIR: &str = ".";
const DEFAULT_PHP_VERSION: &str = "8.3";
const DEFAULT_REGISTRY: &str = "ttl.sh";
const DEFAULT_IMAGE_NAME: &str = "symfony-sample-app";
const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_SERVICE_TIMEOUT_SECS: u64 = 1800;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Main configuration structure for symfony-pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Application source directory
    pub source_dir: PathBuf,

    /// PHP version used for the `php:<version>-cli` base image
    pub php_version: String,

    /// Registry published images are pushed to
    pub registry: String,

    /// Image name prefix for published images
    pub image_name: String,

    /// Maximum wait for a bound service to listen, in seconds
    pub service_timeout_secs: u64,

    pub registry_username: Option<String>,

    pub registry_password: Option<String>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl Default for PipelineConfig {
    /// Loads from `PIPELINE_*` environment variables, falling back to defaults
    fn default() -> Self {
        let source_dir = non_empty_var("PIPELINE_SOURCE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR));

        let php_version = non_empty_var("PIPELINE_PHP_VERSION")
            .unwrap_or_else(|| DEFAULT_PHP_VERSION.to_string());

        let registry =
            non_empty_var("PIPELINE_REGISTRY").unwrap_or_else(|| DEFAULT_REGISTRY.to_string());

        let image_name =
            non_empty_var("PIPELINE_IMAGE_NAME").unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string());

        let service_timeout_secs = non_empty_var("PIPELINE_SERVICE_TIMEOUT")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SERVICE_TIMEOUT_SECS);

        let log_level = non_empty_var("PIPELINE_LOG_LEVEL")
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            source_dir,
            php_version,
            registry,
            image_name,
            service_timeout_secs,
            registry_username: non_empty_var("PIPELINE_REGISTRY_USERNAME"),
            registry_password: non_empty_var("PIPELINE_REGISTRY_PASSWORD"),
            log_level,
        }
    }
}

impl PipelineConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any value is out of range or malformed
    pub fn validate(&self) -> Result<(), ConfigError> {
        let version_pattern = Regex::new(r"^\d+\.\d+$").map_err(|e| ConfigError::ParseError {
            field: "php_version".to_string(),
            error: e.to_string(),
        })?;
        if !version_pattern.is_match(&self.php_version) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid PHP version: {}. Expected <major>.<minor>, e.g. 8.3",
                self.php_version
            )));
        }

        if self.registry.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Registry cannot be empty".to_string(),
            ));
        }

        let name_pattern =
            Regex::new(r"^[a-z0-9]+([._-][a-z0-9]+)*$").map_err(|e| ConfigError::ParseError {
                field: "image_name".to_string(),
                error: e.to_string(),
            })?;
        if !name_pattern.is_match(&self.image_name) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid image name: {}. Use lowercase letters, digits, '.', '_' or '-'",
                self.image_name
            )));
        }

        let address = self.publish_target().address(0);
        if ImageReference::parse(&address).is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid publish address {} from registry '{}' and image name '{}'",
                address, self.registry, self.image_name
            )));
        }

        if self.service_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Service timeout must be at least 1 second".to_string(),
            ));
        }
        if self.service_timeout_secs > MAX_SERVICE_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Service timeout cannot exceed 30 minutes".to_string(),
            ));
        }

        if self.registry_username.is_some() != self.registry_password.is_some() {
            return Err(ConfigError::ValidationFailed(
                "PIPELINE_REGISTRY_USERNAME and PIPELINE_REGISTRY_PASSWORD must be set together"
                    .to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn publish_target(&self) -> PublishTarget {
        PublishTarget {
            registry: self.registry.clone(),
            image_name: self.image_name.clone(),
        }
    }

    pub fn registry_auth(&self) -> Option<RegistryAuth> {
        match (&self.registry_username, &self.registry_password) {
            (Some(username), Some(password)) => Some(RegistryAuth {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    pub fn engine_options(&self) -> DockerEngineOptions {
        DockerEngineOptions {
            service_timeout: Duration::from_secs(self.service_timeout_secs),
            registry_auth: self.registry_auth(),
        }
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Configuration:")?;
        writeln!(f, "  Source: {}", self.source_dir.display())?;
        writeln!(f, "  PHP Version: {}", self.php_version)?;
        writeln!(f, "  Registry: {}", self.registry)?;
        writeln!(f, "  Image Name: {}", self.image_name)?;
        writeln!(f, "  Service Timeout: {}s", self.service_timeout_secs)?;
        writeln!(
            f,
            "  Registry Login: {}",
            self.registry_username.as_deref().unwrap_or("(anonymous)")
        )?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn valid_config() -> PipelineConfig {
        PipelineConfig {
            source_dir: PathBuf::from("."),
            php_version: "8.3".to_string(),
            registry: "ttl.sh".to_string(),
            image_name: "symfony-sample-app".to_string(),
            service_timeout_secs: 120,
            registry_username: None,
            registry_password: None,
            log_level: "info".to_string(),
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::unset("PIPELINE_SOURCE"),
            EnvGuard::unset("PIPELINE_PHP_VERSION"),
            EnvGuard::unset("PIPELINE_REGISTRY"),
            EnvGuard::unset("PIPELINE_IMAGE_NAME"),
            EnvGuard::unset("PIPELINE_SERVICE_TIMEOUT"),
            EnvGuard::unset("PIPELINE_REGISTRY_USERNAME"),
            EnvGuard::unset("PIPELINE_REGISTRY_PASSWORD"),
            EnvGuard::unset("PIPELINE_LOG_LEVEL"),
        ];

        let config = PipelineConfig::default();

        assert_eq!(config.source_dir, PathBuf::from(DEFAULT_SOURCE_DIR));
        assert_eq!(config.php_version, DEFAULT_PHP_VERSION);
        assert_eq!(config.registry, DEFAULT_REGISTRY);
        assert_eq!(config.image_name, DEFAULT_IMAGE_NAME);
        assert_eq!(config.service_timeout_secs, DEFAULT_SERVICE_TIMEOUT_SECS);
        assert!(config.registry_auth().is_none());
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("PIPELINE_SOURCE", "/work/app"),
            EnvGuard::set("PIPELINE_PHP_VERSION", "8.2"),
            EnvGuard::set("PIPELINE_REGISTRY", "registry.example.com/team"),
            EnvGuard::set("PIPELINE_IMAGE_NAME", "shop"),
            EnvGuard::set("PIPELINE_SERVICE_TIMEOUT", "300"),
            EnvGuard::set("PIPELINE_REGISTRY_USERNAME", "ci"),
            EnvGuard::set("PIPELINE_REGISTRY_PASSWORD", "secret"),
            EnvGuard::set("PIPELINE_LOG_LEVEL", "DEBUG"),
        ];

        let config = PipelineConfig::default();

        assert_eq!(config.source_dir, PathBuf::from("/work/app"));
        assert_eq!(config.php_version, "8.2");
        assert_eq!(config.registry, "registry.example.com/team");
        assert_eq!(config.image_name, "shop");
        assert_eq!(config.service_timeout_secs, 300);
        assert_eq!(config.log_level, "debug");

        let auth = config.registry_auth().unwrap();
        assert_eq!(auth.username, "ci");
        assert_eq!(auth.password, "secret");
    }

    #[test]
    #[serial]
    fn test_unparseable_timeout_falls_back() {
        let _guard = EnvGuard::set("PIPELINE_SERVICE_TIMEOUT", "soon");
        let config = PipelineConfig::default();
        assert_eq!(config.service_timeout_secs, DEFAULT_SERVICE_TIMEOUT_SECS);
    }

    #[test]
    fn test_validation_invalid_php_version() {
        for version in ["8", "8.3.1", "latest", ""] {
            let config = PipelineConfig {
                php_version: version.to_string(),
                ..valid_config()
            };
            assert!(config.validate().is_err(), "{} should be rejected", version);
        }
    }

    #[test]
    fn test_validation_invalid_image_name() {
        let config = PipelineConfig {
            image_name: "Symfony App".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_publish_address() {
        let mut config = valid_config();
        config.registry = "ttl.sh/Team".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(msg)) if msg.contains("ttl.sh/Team/symfony-sample-app-0")
        ));

        config.registry = "Registry.Example.com:5000/team/".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.publish_target().address(7),
            "Registry.Example.com:5000/team/symfony-sample-app-7"
        );
    }

    #[test]
    fn test_validation_timeout_bounds() {
        let zero = PipelineConfig {
            service_timeout_secs: 0,
            ..valid_config()
        };
        assert!(zero.validate().is_err());

        let huge = PipelineConfig {
            service_timeout_secs: 3600,
            ..valid_config()
        };
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_validation_partial_credentials() {
        let config = PipelineConfig {
            registry_username: Some("ci".to_string()),
            ..valid_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must be set together"));
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let config = PipelineConfig {
            log_level: "loud".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_options() {
        let config = PipelineConfig {
            service_timeout_secs: 45,
            ..valid_config()
        };
        let options = config.engine_options();
        assert_eq!(options.service_timeout, Duration::from_secs(45));
        assert!(options.registry_auth.is_none());
    }

    #[test]
    fn test_config_display() {
        let display = format!("{}", valid_config());
        assert!(display.contains("Pipeline Configuration:"));
        assert!(display.contains("PHP Version: 8.3"));
        assert!(display.contains("(anonymous)"));
    }
}
