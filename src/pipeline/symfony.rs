//! Build, test, lint and publish stages for the Symfony application

use super::database::{mariadb_service, DATABASE_ALIAS};
use crate::config::PipelineConfig;
use crate::engine::{CacheVolume, Container, Directory, Engine, ImageReference};
use anyhow::{Context, Result};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use tracing::info;

pub const DEFAULT_PHP_VERSION: &str = "8.3";
pub const APP_DIR: &str = "/app";
/// Pipeline definition directory, never shipped inside the image
pub const PIPELINE_DIR: &str = ".dagger";
pub const SYMFONY_ENTRYPOINT: [&str; 4] = [
    "/root/.symfony5/bin/symfony",
    "server:start",
    "--port=8000",
    "--listen-ip=0.0.0.0",
];
/// Shared by every PHP version the environment is built for
pub const COMPOSER_CACHE_KEY: &str = "composer-php83";
const PUBLISH_SUFFIX_MAX: u32 = 100_000;

/// Registry and image name prefix published images go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub registry: String,
    pub image_name: String,
}

impl Default for PublishTarget {
    fn default() -> Self {
        Self {
            registry: "ttl.sh".to_string(),
            image_name: "symfony-sample-app".to_string(),
        }
    }
}

impl PublishTarget {
    pub fn address(&self, suffix: u32) -> String {
        format!(
            "{}/{}-{}",
            self.registry.trim_end_matches('/'),
            self.image_name,
            suffix
        )
    }

    /// Address with a random suffix in `0..=100000`
    pub fn random_address(&self) -> String {
        let suffix = rand::thread_rng().gen_range(0..=PUBLISH_SUFFIX_MAX);
        self.address(suffix)
    }
}

/// Pipeline stages, in the order `publish` depends on them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Env,
    Test,
    Lint,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Env => "env",
            Stage::Test => "test",
            Stage::Lint => "lint",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// The Symfony application and its pipeline
#[derive(Debug, Clone)]
pub struct SymfonyApp {
    source: Directory,
    version: String,
    target: PublishTarget,
}

impl SymfonyApp {
    pub fn new(source: Directory) -> Self {
        Self {
            source,
            version: DEFAULT_PHP_VERSION.to_string(),
            target: PublishTarget::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(Directory::new(&config.source_dir))
            .with_version(config.php_version.clone())
            .with_publish_target(config.publish_target())
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_publish_target(mut self, target: PublishTarget) -> Self {
        self.target = target;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn publish_target(&self) -> &PublishTarget {
        &self.target
    }

    /// PHP environment with system packages, Composer, the application
    /// source and its dependencies, and the Symfony CLI
    pub fn env(&self) -> Container {
        Container::new()
            .from(format!("php:{}-cli", self.version))
            .with_mounted_cache("/root/.composer", CacheVolume::new(COMPOSER_CACHE_KEY))
            .with_mounted_cache("/var/cache/apt", CacheVolume::new("apt"))
            .with_exec(["apt-get", "update"])
            .with_exec(["apt-get", "install", "--yes", "git-core", "zip", "curl"])
            .with_exec(["docker-php-ext-install", "pdo_mysql"])
            .with_exec([
                "sh",
                "-c",
                "curl -sS https://getcomposer.org/installer | php -- --install-dir=/usr/local/bin --filename=composer",
            ])
            .with_directory(APP_DIR, self.source.without_directory(PIPELINE_DIR))
            .with_workdir(APP_DIR)
            .with_exec(["composer", "install"])
            .with_exec([
                "sh",
                "-c",
                "curl -sS https://get.symfony.com/cli/installer | bash",
            ])
    }

    /// Environment bound to MariaDB, with schema, fixtures, unit tests and
    /// static analysis
    pub fn test_container(&self) -> Container {
        self.env()
            .with_service_binding(DATABASE_ALIAS, mariadb_service())
            .with_env_variable("APP_ENV", "test")
            .with_exec(["./bin/console", "doctrine:schema:drop", "--force"])
            .with_exec(["./bin/console", "doctrine:schema:create"])
            .with_exec(["./bin/console", "-n", "doctrine:fixtures:load"])
            .with_exec(["./bin/phpunit"])
            .with_exec(["composer", "require", "--dev", "phpstan/phpstan"])
            .with_exec(["./vendor/bin/phpstan", "-v", "--memory-limit=2G"])
    }

    pub fn lint_container(&self) -> Container {
        self.env()
            .with_exec(["composer", "require", "--dev", "friendsofphp/php-cs-fixer"])
            .with_exec(["./vendor/bin/php-cs-fixer", "check", "src"])
    }

    pub fn publish_container(&self) -> Container {
        self.env().with_entrypoint(SYMFONY_ENTRYPOINT)
    }

    pub fn container(&self, stage: Stage) -> Container {
        match stage {
            Stage::Env => self.env(),
            Stage::Test => self.test_container(),
            Stage::Lint => self.lint_container(),
            Stage::Publish => self.publish_container(),
        }
    }

    /// Output of the last step of the environment build
    pub async fn build_env(&self, engine: &dyn Engine) -> Result<String> {
        info!(version = %self.version, "Building PHP environment");
        engine
            .stdout(&self.env())
            .await
            .context("Environment build failed")
    }

    /// Unit test and static analysis output
    pub async fn test(&self, engine: &dyn Engine) -> Result<String> {
        info!("Running tests and static analysis");
        engine
            .stdout(&self.test_container())
            .await
            .context("Test stage failed")
    }

    pub async fn lint(&self, engine: &dyn Engine) -> Result<String> {
        info!("Running linter");
        engine
            .stdout(&self.lint_container())
            .await
            .context("Lint stage failed")
    }

    /// Lints, tests, then publishes to a random address under the publish
    /// target. Returns the published reference.
    pub async fn publish(&self, engine: &dyn Engine) -> Result<String> {
        let address = self.target.random_address();
        self.publish_to(engine, &address).await
    }

    pub async fn publish_to(&self, engine: &dyn Engine, address: &str) -> Result<String> {
        ImageReference::parse(address)
            .with_context(|| format!("Failed to publish {}", address))?;

        self.lint(engine).await?;
        self.test(engine).await?;

        info!(address, "Publishing image");
        engine
            .publish(&self.publish_container(), address)
            .await
            .with_context(|| format!("Failed to publish {}", address))
    }
}
