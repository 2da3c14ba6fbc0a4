use symfony_pipeline::cli::commands::{CliArgs, Commands};
use symfony_pipeline::cli::handlers::{
    handle_env, handle_health, handle_lint, handle_plan, handle_publish, handle_test, Overrides,
};
use symfony_pipeline::util::logging::{init_logging, LoggingConfig};
use symfony_pipeline::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("symfony-pipeline v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let overrides = Overrides::from_args(&args);

    let exit_code = match &args.command {
        Commands::Env => handle_env(&overrides).await,
        Commands::Test => handle_test(&overrides).await,
        Commands::Lint => handle_lint(&overrides).await,
        Commands::Publish(publish_args) => handle_publish(&overrides, publish_args).await,
        Commands::Plan(plan_args) => handle_plan(&overrides, plan_args),
        Commands::Health(health_args) => handle_health(&overrides, health_args).await,
    };

    std::process::exit(exit_code);
}
