//! Pipeline definition for the Symfony application
//!
//! Four stages, each a straight-line composition of container steps:
//!
//! - `env`: PHP runtime, system packages, Composer, source and dependencies
//! - `test`: schema and fixtures against a MariaDB service, PHPUnit, PHPStan
//! - `lint`: PHP-CS-Fixer
//! - `publish`: lint, test, then push the environment with a server entrypoint

pub mod database;
mod symfony;

pub use symfony::{
    PublishTarget, Stage, SymfonyApp, APP_DIR, COMPOSER_CACHE_KEY, DEFAULT_PHP_VERSION,
    PIPELINE_DIR, SYMFONY_ENTRYPOINT,
};
