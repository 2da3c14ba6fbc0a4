//! Immutable container descriptions
//!
//! A [`Container`] is an ordered list of [`Operation`]s. Nothing runs while a
//! container is being described: every `with_*` call returns a new value and
//! leaves the receiver untouched. An [`Engine`](super::Engine) evaluates the
//! description later.
//!
//! # Example
//!
//! ```
//! use symfony_pipeline::engine::{CacheVolume, Container};
//!
//! let base = Container::new()
//!     .from("php:8.3-cli")
//!     .with_mounted_cache("/var/cache/apt", CacheVolume::new("apt"))
//!     .with_exec(["apt-get", "update"]);
//!
//! let extended = base.with_env_variable("APP_ENV", "test");
//!
//! assert_eq!(base.exec_count(), 1);
//! assert!(base.env().is_empty());
//! assert_eq!(extended.env(), vec![("APP_ENV".to_string(), "test".to_string())]);
//! ```

use super::directory::Directory;
use super::error::EngineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A named cache shared across evaluations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheVolume {
    pub key: String,
}

impl CacheVolume {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// A single step in a container description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    From {
        address: String,
    },
    MountCache {
        path: String,
        cache: CacheVolume,
    },
    Exec {
        args: Vec<String>,
    },
    Directory {
        path: String,
        source: Directory,
    },
    Workdir {
        path: String,
    },
    EnvVariable {
        name: String,
        value: String,
    },
    ExposePort {
        port: u16,
    },
    ServiceBinding {
        alias: String,
        service: Box<Service>,
    },
    Entrypoint {
        args: Vec<String>,
    },
}

impl Operation {
    /// Whether the operation does work at evaluation time (as opposed to
    /// only changing configuration for later steps)
    pub fn is_step(&self) -> bool {
        matches!(
            self,
            Operation::Exec { .. } | Operation::Directory { .. } | Operation::ServiceBinding { .. }
        )
    }

    /// Short human-readable label used in progress output
    pub fn describe(&self) -> String {
        match self {
            Operation::From { address } => format!("from {}", address),
            Operation::MountCache { path, cache } => {
                format!("mount cache {} at {}", cache.key, path)
            }
            Operation::Exec { args } => format!("exec {}", args.join(" ")),
            Operation::Directory { path, source } => {
                format!("copy {} to {}", source.root().display(), path)
            }
            Operation::Workdir { path } => format!("workdir {}", path),
            Operation::EnvVariable { name, value } => format!("env {}={}", name, value),
            Operation::ExposePort { port } => format!("expose {}/tcp", port),
            Operation::ServiceBinding { alias, service } => format!(
                "bind service {} ({})",
                alias,
                service.container.base_image().unwrap_or("<no image>")
            ),
            Operation::Entrypoint { args } => format!("entrypoint {}", args.join(" ")),
        }
    }
}

/// Fluent, immutable description of a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    operations: Vec<Operation>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, operation: Operation) -> Self {
        let mut next = self.clone();
        next.operations.push(operation);
        next
    }

    /// Starts over from a base image. Operations recorded before this call
    /// are discarded.
    pub fn from(&self, address: impl Into<String>) -> Self {
        Self {
            operations: vec![Operation::From {
                address: address.into(),
            }],
        }
    }

    pub fn with_mounted_cache(&self, path: impl Into<String>, cache: CacheVolume) -> Self {
        self.push(Operation::MountCache {
            path: path.into(),
            cache,
        })
    }

    pub fn with_exec<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Operation::Exec {
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    pub fn with_directory(&self, path: impl Into<String>, source: Directory) -> Self {
        self.push(Operation::Directory {
            path: path.into(),
            source,
        })
    }

    pub fn with_workdir(&self, path: impl Into<String>) -> Self {
        self.push(Operation::Workdir { path: path.into() })
    }

    pub fn with_env_variable(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Operation::EnvVariable {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn with_exposed_port(&self, port: u16) -> Self {
        self.push(Operation::ExposePort { port })
    }

    pub fn with_service_binding(&self, alias: impl Into<String>, service: Service) -> Self {
        self.push(Operation::ServiceBinding {
            alias: alias.into(),
            service: Box::new(service),
        })
    }

    pub fn with_entrypoint<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Operation::Entrypoint {
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// Turns this container into a long-running service.
    ///
    /// With empty `args` and `use_entrypoint` set, the image's own
    /// entrypoint and command are used.
    pub fn as_service<I, S>(&self, args: I, use_entrypoint: bool) -> Service
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Service {
            container: self.clone(),
            args: args.into_iter().map(Into::into).collect(),
            use_entrypoint,
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn base_image(&self) -> Option<&str> {
        match self.operations.first() {
            Some(Operation::From { address }) => Some(address),
            _ => None,
        }
    }

    /// Environment after all operations, last write wins
    pub fn env(&self) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = Vec::new();
        for operation in &self.operations {
            if let Operation::EnvVariable { name, value } = operation {
                set_env(&mut env, name, value);
            }
        }
        env
    }

    pub fn workdir(&self) -> Option<&str> {
        self.operations.iter().rev().find_map(|op| match op {
            Operation::Workdir { path } => Some(path.as_str()),
            _ => None,
        })
    }

    pub fn entrypoint(&self) -> Option<&[String]> {
        self.operations.iter().rev().find_map(|op| match op {
            Operation::Entrypoint { args } => Some(args.as_slice()),
            _ => None,
        })
    }

    pub fn exposed_ports(&self) -> Vec<u16> {
        let mut ports = Vec::new();
        for operation in &self.operations {
            if let Operation::ExposePort { port } = operation {
                if !ports.contains(port) {
                    ports.push(*port);
                }
            }
        }
        ports
    }

    pub fn cache_mounts(&self) -> Vec<(&str, &CacheVolume)> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::MountCache { path, cache } => Some((path.as_str(), cache)),
                _ => None,
            })
            .collect()
    }

    pub fn service_bindings(&self) -> Vec<(&str, &Service)> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::ServiceBinding { alias, service } => Some((alias.as_str(), &**service)),
                _ => None,
            })
            .collect()
    }

    pub fn exec_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Exec { .. }))
            .count()
    }

    pub fn step_count(&self) -> usize {
        self.operations.iter().filter(|op| op.is_step()).count()
    }

    /// Content hash of the description. Directories contribute their path,
    /// not their contents.
    pub fn digest(&self) -> String {
        let encoded = serde_json::to_vec(&self.operations)
            .unwrap_or_else(|_| format!("{:?}", self.operations).into_bytes());
        hex::encode(Sha256::digest(&encoded))
    }

    /// Checks the description can be evaluated and returns its base image
    pub fn validate(&self) -> Result<&str, EngineError> {
        let base = self.base_image().ok_or(EngineError::MissingBaseImage)?;

        for (index, operation) in self.operations.iter().enumerate() {
            match operation {
                Operation::Exec { args } if args.is_empty() => {
                    return Err(EngineError::EmptyCommand { step: index });
                }
                Operation::ServiceBinding { service, .. } => {
                    service.container.validate()?;
                }
                _ => {}
            }
        }

        Ok(base)
    }
}

/// Sets `name` in an ordered environment list, keeping its first position
pub(crate) fn set_env(env: &mut Vec<(String, String)>, name: &str, value: &str) {
    match env.iter_mut().find(|(key, _)| key == name) {
        Some(entry) => entry.1 = value.to_string(),
        None => env.push((name.to_string(), value.to_string())),
    }
}

/// A container run as an auxiliary process for the duration of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub container: Container,
    pub args: Vec<String>,
    pub use_entrypoint: bool,
}

impl Service {
    pub fn exposed_ports(&self) -> Vec<u16> {
        self.container.exposed_ports()
    }

    /// Services that change the filesystem must be built before they can run
    pub fn needs_snapshot(&self) -> bool {
        self.container
            .operations()
            .iter()
            .any(|op| matches!(op, Operation::Exec { .. } | Operation::Directory { .. }))
    }
}
