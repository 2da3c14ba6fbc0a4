//! Output formatting for multiple formats
//!
//! Plans can be rendered as JSON, YAML, human-readable text or a Dockerfile.
//! Health reports support every format except Dockerfile.
//!
//! # Example
//!
//! ```
//! use symfony_pipeline::cli::output::{OutputFormat, OutputFormatter};
//! use symfony_pipeline::engine::Container;
//! use symfony_pipeline::plan::Plan;
//!
//! let container = Container::new().from("php:8.3-cli").with_exec(["php", "-v"]);
//! let plan = Plan::from_container("env", &container);
//! let output = OutputFormatter::new(OutputFormat::Human).format_plan(&plan).unwrap();
//! assert!(output.contains("php:8.3-cli"));
//! ```

use anyhow::{bail, Context, Result};

use crate::config::PipelineConfig;
use crate::engine::EngineHealth;
use crate::plan::{short_digest, Plan, PlanStep};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
    /// Dockerfile equivalent of a plan
    Dockerfile,
}

#[derive(serde::Serialize)]
struct HealthReport<'a> {
    engines: &'a [EngineHealth],
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<ConfigSummary<'a>>,
}

#[derive(serde::Serialize)]
struct ConfigSummary<'a> {
    source: String,
    php_version: &'a str,
    registry: &'a str,
    image_name: &'a str,
    service_timeout_secs: u64,
    registry_login: bool,
}

impl<'a> From<&'a PipelineConfig> for ConfigSummary<'a> {
    fn from(config: &'a PipelineConfig) -> Self {
        Self {
            source: config.source_dir.display().to_string(),
            php_version: &config.php_version,
            registry: &config.registry,
            image_name: &config.image_name,
            service_timeout_secs: config.service_timeout_secs,
            registry_login: config.registry_username.is_some(),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_plan(&self, plan: &Plan) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(plan).context("Failed to serialize plan to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(plan).context("Failed to serialize plan to YAML")
            }
            OutputFormat::Human => Ok(self.format_plan_human(plan)),
            OutputFormat::Dockerfile => Ok(plan.to_dockerfile()),
        }
    }

    /// Formats engine health, optionally followed by the effective
    /// configuration
    pub fn format_health(
        &self,
        health: &[EngineHealth],
        config: Option<&PipelineConfig>,
    ) -> Result<String> {
        let report = HealthReport {
            engines: health,
            config: config.map(ConfigSummary::from),
        };

        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&report)
                .context("Failed to serialize health status to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(&report)
                .context("Failed to serialize health status to YAML"),
            OutputFormat::Human => Ok(self.format_health_human(health, config)),
            OutputFormat::Dockerfile => {
                bail!("The dockerfile format is only available for plans")
            }
        }
    }

    fn format_plan_human(&self, plan: &Plan) -> String {
        let mut output = String::new();

        output.push_str(&format!("Stage: {}\n", plan.name));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!(
            "Base image: {}\n",
            plan.base_image.as_deref().unwrap_or("(none)")
        ));
        output.push_str(&format!("Digest: {}\n", short_digest(&plan.digest)));

        if !plan.caches.is_empty() {
            output.push_str("\nCaches:\n");
            for cache in &plan.caches {
                output.push_str(&format!("  {} (cache: {})\n", cache.path, cache.key));
            }
        }

        if !plan.services.is_empty() {
            output.push_str("\nServices:\n");
            for service in &plan.services {
                let ports: Vec<String> = service.ports.iter().map(|p| format!("{}/tcp", p)).collect();
                output.push_str(&format!(
                    "  {}: {} [{}]\n",
                    service.alias,
                    service.image,
                    ports.join(", ")
                ));
            }
        }

        output.push_str(&format!("\nSteps ({}):\n", plan.steps.len()));
        for (index, step) in plan.steps.iter().enumerate() {
            let line = match step {
                PlanStep::Exec { args, workdir } => match workdir {
                    Some(dir) => format!("exec {} (in {})", args.join(" "), dir),
                    None => format!("exec {}", args.join(" ")),
                },
                PlanStep::Copy {
                    source,
                    destination,
                    excludes,
                } if excludes.is_empty() => format!("copy {} to {}", source, destination),
                PlanStep::Copy {
                    source,
                    destination,
                    excludes,
                } => format!(
                    "copy {} to {} (excluding {})",
                    source,
                    destination,
                    excludes.join(", ")
                ),
                PlanStep::Service { alias } => format!("start service {}", alias),
            };
            output.push_str(&format!("  {:>2}. {}\n", index + 1, line));
        }

        if !plan.env.is_empty() {
            output.push_str("\nEnvironment:\n");
            for entry in &plan.env {
                output.push_str(&format!("  {}={}\n", entry.name, entry.value));
            }
        }

        if let Some(ref entrypoint) = plan.entrypoint {
            output.push_str(&format!("\nEntrypoint: {}\n", entrypoint.join(" ")));
        }

        output
    }

    fn format_health_human(&self, health: &[EngineHealth], config: Option<&PipelineConfig>) -> String {
        let mut output = String::new();

        output.push_str("Engine Health Status\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        for status in health {
            let status_symbol = if status.available {
                "\u{2713}"
            } else {
                "\u{2717}"
            };

            output.push_str(&format!("{} {}\n", status_symbol, status.engine));
            output.push_str(&format!(
                "  Status: {}\n",
                if status.available {
                    "Available"
                } else {
                    "Unavailable"
                }
            ));
            output.push_str(&format!("  Message: {}\n", status.message));

            if let Some(ref details) = status.details {
                output.push_str(&format!("  Details: {}\n", details));
            }
            output.push('\n');
        }

        if let Some(config) = config {
            output.push_str(&config.to_string());
        }

        output
    }
}
