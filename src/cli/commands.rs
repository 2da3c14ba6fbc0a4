use crate::pipeline::Stage;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Container pipeline for a Symfony application
#[derive(Parser, Debug)]
#[command(
    name = "symfony-pipeline",
    about = "Build, test, lint and publish a Symfony application in containers",
    version,
    author,
    long_about = "symfony-pipeline runs the application's CI/CD stages as container steps \
                  against a local Docker daemon: a PHP environment image, PHPUnit and PHPStan \
                  against a MariaDB service, PHP-CS-Fixer, and publishing a runnable image."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Verbose output, including command output from containers"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(
        short = 's',
        long,
        global = true,
        value_name = "PATH",
        help = "Application source directory (defaults to PIPELINE_SOURCE or the current directory)"
    )]
    pub source: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "VERSION",
        help = "PHP version of the environment image, e.g. 8.3"
    )]
    pub php_version: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build the PHP environment image",
        long_about = "Builds the PHP environment: system packages, Composer, the application \
                      source and its dependencies, and the Symfony CLI. Prints the output of \
                      the last step.\n\n\
                      Examples:\n  \
                      symfony-pipeline env\n  \
                      symfony-pipeline --php-version 8.2 env"
    )]
    Env,

    #[command(
        about = "Run unit tests and static analysis against MariaDB",
        long_about = "Starts a MariaDB service reachable as `db`, loads the schema and \
                      fixtures, then runs PHPUnit and PHPStan.\n\n\
                      Examples:\n  \
                      symfony-pipeline test\n  \
                      symfony-pipeline --source ../shop test"
    )]
    Test,

    #[command(about = "Check coding standards with PHP-CS-Fixer")]
    Lint,

    #[command(
        about = "Lint, test, then publish a runnable image",
        long_about = "Runs lint and test; if both succeed, publishes the environment with the \
                      Symfony server as entrypoint to <registry>/<image-name>-<N>, where N is \
                      random in 0..=100000. Prints the published reference.\n\n\
                      Examples:\n  \
                      symfony-pipeline publish\n  \
                      symfony-pipeline publish --registry registry.example.com/team"
    )]
    Publish(PublishArgs),

    #[command(
        about = "Show what a stage would run, without running it",
        long_about = "Renders a stage's container description without contacting Docker.\n\n\
                      Examples:\n  \
                      symfony-pipeline plan test\n  \
                      symfony-pipeline plan publish --format dockerfile\n  \
                      symfony-pipeline plan env --format json"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Check container host availability",
        long_about = "Checks that the Docker daemon is reachable.\n\n\
                      Examples:\n  \
                      symfony-pipeline health\n  \
                      symfony-pipeline health --format json"
    )]
    Health(HealthArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    #[arg(
        long,
        value_name = "REGISTRY",
        help = "Registry to publish to (defaults to PIPELINE_REGISTRY or ttl.sh)"
    )]
    pub registry: Option<String>,

    #[arg(
        long,
        value_name = "NAME",
        help = "Image name prefix (defaults to PIPELINE_IMAGE_NAME or symfony-sample-app)"
    )]
    pub image_name: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(value_enum, value_name = "STAGE", help = "Stage to render")]
    pub stage: StageArg,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HealthArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageArg {
    Env,
    Test,
    Lint,
    Publish,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Env => Stage::Env,
            StageArg::Test => Stage::Test,
            StageArg::Lint => Stage::Lint,
            StageArg::Publish => Stage::Publish,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
    Dockerfile,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
            OutputFormatArg::Dockerfile => super::output::OutputFormat::Dockerfile,
        }
    }
}
