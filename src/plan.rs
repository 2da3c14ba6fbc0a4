//! Execution plans
//!
//! A [`Plan`] is a read-only view of a [`Container`] description: what image
//! it starts from, which caches it mounts, and the steps an engine would run.
//! Plans are produced without touching a container host, so the CLI can show
//! or export a stage before running it.

use crate::engine::{Container, Operation};
use serde::Serialize;

/// A cache mounted for the whole evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanCache {
    pub path: String,
    pub key: String,
}

/// An auxiliary service reachable from the steps that follow its binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanService {
    pub alias: String,
    pub image: String,
    pub ports: Vec<u16>,
    pub env: Vec<EnvEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
}

/// One unit of work, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStep {
    Exec {
        args: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        workdir: Option<String>,
    },
    Copy {
        source: String,
        destination: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        excludes: Vec<String>,
    },
    Service {
        alias: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub name: String,
    pub base_image: Option<String>,
    pub caches: Vec<PlanCache>,
    pub services: Vec<PlanService>,
    pub steps: Vec<PlanStep>,
    pub env: Vec<EnvEntry>,
    pub workdir: Option<String>,
    pub exposed_ports: Vec<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    pub digest: String,
    #[serde(skip)]
    operations: Vec<Operation>,
}

fn env_entries(container: &Container) -> Vec<EnvEntry> {
    container
        .env()
        .into_iter()
        .map(|(name, value)| EnvEntry { name, value })
        .collect()
}

impl Plan {
    pub fn from_container(name: impl Into<String>, container: &Container) -> Self {
        let mut steps = Vec::new();
        let mut workdir: Option<String> = None;

        for operation in container.operations() {
            match operation {
                Operation::Workdir { path } => workdir = Some(path.clone()),
                Operation::Exec { args } => steps.push(PlanStep::Exec {
                    args: args.clone(),
                    workdir: workdir.clone(),
                }),
                Operation::Directory { path, source } => steps.push(PlanStep::Copy {
                    source: source.root().display().to_string(),
                    destination: path.clone(),
                    excludes: source.excludes().to_vec(),
                }),
                Operation::ServiceBinding { alias, .. } => steps.push(PlanStep::Service {
                    alias: alias.clone(),
                }),
                _ => {}
            }
        }

        let services = container
            .service_bindings()
            .into_iter()
            .map(|(alias, service)| PlanService {
                alias: alias.to_string(),
                image: service
                    .container
                    .base_image()
                    .unwrap_or_default()
                    .to_string(),
                ports: service.exposed_ports(),
                env: env_entries(&service.container),
            })
            .collect();

        Self {
            name: name.into(),
            base_image: container.base_image().map(str::to_string),
            caches: container
                .cache_mounts()
                .into_iter()
                .map(|(path, cache)| PlanCache {
                    path: path.to_string(),
                    key: cache.key.clone(),
                })
                .collect(),
            services,
            steps,
            env: env_entries(container),
            workdir: container.workdir().map(str::to_string),
            exposed_ports: container.exposed_ports(),
            entrypoint: container.entrypoint().map(<[String]>::to_vec),
            digest: container.digest(),
            operations: container.operations().to_vec(),
        }
    }

    pub fn exec_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, PlanStep::Exec { .. }))
            .count()
    }

    /// Renders the plan as a Dockerfile building the same filesystem.
    ///
    /// The build context is the source directory; caches become
    /// `RUN --mount=type=cache` flags on every following `RUN`, and service
    /// bindings, which Dockerfiles cannot express, become comments.
    pub fn to_dockerfile(&self) -> String {
        let needs_labs = self.steps.iter().any(
            |step| matches!(step, PlanStep::Copy { excludes, .. } if !excludes.is_empty()),
        );

        let mut output = String::new();
        if needs_labs {
            output.push_str("# syntax=docker/dockerfile:1.7-labs\n");
        } else {
            output.push_str("# syntax=docker/dockerfile:1\n");
        }
        output.push_str(&format!("# {} ({})\n", self.name, short_digest(&self.digest)));

        let mut mounts: Vec<String> = Vec::new();
        for operation in &self.operations {
            match operation {
                Operation::From { address } => {
                    output.push_str(&format!("FROM {}\n", address));
                }
                Operation::MountCache { path, cache } => {
                    mounts.push(format!("--mount=type=cache,id={},target={}", cache.key, path));
                }
                Operation::Exec { args } => {
                    output.push_str("RUN ");
                    for mount in &mounts {
                        output.push_str(mount);
                        output.push(' ');
                    }
                    output.push_str(&json_array(args));
                    output.push('\n');
                }
                Operation::Directory { path, source } => {
                    output.push_str("COPY ");
                    for exclude in source.excludes() {
                        output.push_str(&format!("--exclude={} ", exclude));
                    }
                    output.push_str(&format!(". {}\n", path));
                }
                Operation::Workdir { path } => {
                    output.push_str(&format!("WORKDIR {}\n", path));
                }
                Operation::EnvVariable { name, value } => {
                    output.push_str(&format!("ENV {}={}\n", name, json_string(value)));
                }
                Operation::ExposePort { port } => {
                    output.push_str(&format!("EXPOSE {}/tcp\n", port));
                }
                Operation::ServiceBinding { alias, service } => {
                    let ports: Vec<String> = service
                        .exposed_ports()
                        .iter()
                        .map(|port| format!("{}/tcp", port))
                        .collect();
                    output.push_str(&format!(
                        "# service {}: {} [{}]\n",
                        alias,
                        service.container.base_image().unwrap_or("<no image>"),
                        ports.join(", ")
                    ));
                }
                Operation::Entrypoint { args } => {
                    output.push_str(&format!("ENTRYPOINT {}\n", json_array(args)));
                }
            }
        }

        output
    }
}

pub(crate) fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

fn json_array(args: &[String]) -> String {
    let quoted: Vec<String> = args.iter().map(|arg| json_string(arg)).collect();
    format!("[{}]", quoted.join(", "))
}
