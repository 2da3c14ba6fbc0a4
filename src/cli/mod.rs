pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, HealthArgs, PlanArgs, PublishArgs};
pub use handlers::Overrides;
pub use output::{OutputFormat, OutputFormatter};
