//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 on success, 1 on failure.
//! Errors are printed to stderr with their full context chain.

use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, error, info};

use super::commands::{CliArgs, HealthArgs, PlanArgs, PublishArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::PipelineConfig;
use crate::engine::{DockerEngine, Engine, EngineError, EngineHealth};
use crate::pipeline::{Stage, SymfonyApp};
use crate::plan::Plan;
use crate::progress::{LoggingHandler, NoOpHandler, ProgressHandler};
use std::sync::Arc;

/// Command-line overrides applied on top of the environment configuration
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub php_version: Option<String>,
    pub registry: Option<String>,
    pub image_name: Option<String>,
    /// Drop per-step progress logging
    pub quiet: bool,
}

impl Overrides {
    /// Global flags shared by every subcommand
    pub fn from_args(args: &CliArgs) -> Self {
        Self {
            source: args.source.clone(),
            php_version: args.php_version.clone(),
            quiet: args.quiet,
            ..Default::default()
        }
    }

    pub fn with_publish_args(mut self, args: &PublishArgs) -> Self {
        self.registry = args.registry.clone().or(self.registry);
        self.image_name = args.image_name.clone().or(self.image_name);
        self
    }
}

/// Loads the environment configuration, applies overrides, and validates
pub fn load_config(overrides: &Overrides) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();

    if let Some(ref source) = overrides.source {
        config.source_dir = source.clone();
    }
    if let Some(ref version) = overrides.php_version {
        config.php_version = version.clone();
    }
    if let Some(ref registry) = overrides.registry {
        config.registry = registry.clone();
    }
    if let Some(ref image_name) = overrides.image_name {
        config.image_name = image_name.clone();
    }

    config.validate().context("Invalid configuration")?;
    debug!("{}", config);
    Ok(config)
}

/// Exit code of the container command behind a stage failure, if any
fn failed_exit_code(err: &anyhow::Error) -> Option<i64> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<EngineError>())
        .and_then(EngineError::exit_code)
}

fn report_error(err: &anyhow::Error) -> i32 {
    match failed_exit_code(err) {
        Some(exit_code) => error!(exit_code, "{:#}", err),
        None => error!("{:#}", err),
    }
    eprintln!("Error: {:#}", err);
    1
}

fn progress_handler(quiet: bool) -> Arc<dyn ProgressHandler> {
    if quiet {
        Arc::new(NoOpHandler)
    } else {
        Arc::new(LoggingHandler)
    }
}

fn connect(config: &PipelineConfig, quiet: bool) -> Result<DockerEngine> {
    let engine =
        DockerEngine::connect(config.engine_options()).context("Failed to connect to Docker")?;
    Ok(engine.with_progress(progress_handler(quiet)))
}

async fn run_stage<F, Fut>(overrides: &Overrides, run: F) -> i32
where
    F: FnOnce(SymfonyApp, DockerEngine) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let result = async {
        let config = load_config(overrides)?;
        let engine = connect(&config, overrides.quiet)?;
        let app = SymfonyApp::from_config(&config);
        run(app, engine).await
    }
    .await;

    match result {
        Ok(output) => {
            print!("{}", output);
            if !output.is_empty() && !output.ends_with('\n') {
                println!();
            }
            0
        }
        Err(err) => report_error(&err),
    }
}

pub async fn handle_env(overrides: &Overrides) -> i32 {
    run_stage(overrides, |app, engine| async move { app.build_env(&engine).await }).await
}

pub async fn handle_test(overrides: &Overrides) -> i32 {
    run_stage(overrides, |app, engine| async move { app.test(&engine).await }).await
}

pub async fn handle_lint(overrides: &Overrides) -> i32 {
    run_stage(overrides, |app, engine| async move { app.lint(&engine).await }).await
}

pub async fn handle_publish(overrides: &Overrides, args: &PublishArgs) -> i32 {
    let overrides = overrides.clone().with_publish_args(args);
    run_stage(&overrides, |app, engine| async move {
        let reference = app.publish(&engine).await?;
        info!(reference = %reference, "Published");
        Ok(reference)
    })
    .await
}

/// Renders a stage without contacting Docker
pub fn handle_plan(overrides: &Overrides, args: &PlanArgs) -> i32 {
    let result = (|| -> Result<String> {
        let config = load_config(overrides)?;
        let app = SymfonyApp::from_config(&config);
        let stage = Stage::from(args.stage);
        let plan = Plan::from_container(stage.to_string(), &app.container(stage));
        OutputFormatter::new(OutputFormat::from(args.format)).format_plan(&plan)
    })();

    match result {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(err) => report_error(&err),
    }
}

pub async fn handle_health(overrides: &Overrides, args: &HealthArgs) -> i32 {
    let config = match load_config(overrides) {
        Ok(config) => config,
        Err(err) => return report_error(&err),
    };

    let health = match DockerEngine::connect(config.engine_options()) {
        Ok(engine) => engine.check().await,
        Err(err) => EngineHealth::unavailable("docker", err.to_string())
            .with_details("Set DOCKER_HOST or start the Docker daemon"),
    };
    let available = health.available;

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    match formatter.format_health(std::slice::from_ref(&health), Some(&config)) {
        Ok(output) => {
            print!("{}", output);
            if available {
                0
            } else {
                1
            }
        }
        Err(err) => report_error(&err),
    }
}
