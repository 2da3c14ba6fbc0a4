//! Docker-backed engine
//!
//! Every evaluation starts a fresh working container from the base image,
//! replays the description step by step through `docker exec` and uploads,
//! and removes everything it created before returning.

use super::container::set_env;
use super::{
    CacheVolume, Container, Directory, Engine, EngineError, EngineHealth, ImageReference,
    Operation, Service,
};
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, NetworkingConfig,
    RemoveContainerOptions, StartContainerOptions, UploadToContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::{CommitContainerOptions, CreateImageOptions, PushImageOptions};
use bollard::models::{EndpointSettings, HostConfig, Mount, MountTypeEnum};
use bollard::network::{ConnectNetworkOptions, CreateNetworkOptions};
use bollard::volume::CreateVolumeOptions;
use bollard::Docker;
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

const LABEL_RUN: &str = "symfony-pipeline.run";
const LABEL_CACHE: &str = "symfony-pipeline.cache";
const SNAPSHOT_REPOSITORY: &str = "symfony-pipeline-snapshot";
const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(120);

/// Registry login used when pushing
#[derive(Clone)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DockerEngineOptions {
    /// How long a bound service may take to listen on its exposed ports
    pub service_timeout: Duration,
    pub registry_auth: Option<RegistryAuth>,
}

impl Default for DockerEngineOptions {
    fn default() -> Self {
        Self {
            service_timeout: DEFAULT_SERVICE_TIMEOUT,
            registry_auth: None,
        }
    }
}

/// Ports in LISTEN state according to `/proc/net/tcp` (or `tcp6`) content
pub fn listening_ports(proc_net_tcp: &str) -> BTreeSet<u16> {
    proc_net_tcp
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || fields[3] != "0A" {
                return None;
            }
            let (_, port) = fields[1].rsplit_once(':')?;
            u16::from_str_radix(port, 16).ok()
        })
        .collect()
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

fn env_strings(env: &[(String, String)]) -> Vec<String> {
    env.iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect()
}

fn exposed_port_map(ports: &[u16]) -> Option<HashMap<String, HashMap<(), ()>>> {
    if ports.is_empty() {
        return None;
    }
    Some(
        ports
            .iter()
            .map(|port| (format!("{}/tcp", port), HashMap::new()))
            .collect(),
    )
}

fn cache_volume_name(cache: &CacheVolume) -> String {
    format!("symfony-pipeline-cache-{}", cache.key)
}

struct ExecOutput {
    stdout: String,
    stderr: String,
    exit_code: i64,
}

/// Raw exec output, decoded only once the stream ends so multi-byte
/// characters split across frames survive
#[derive(Default)]
struct ExecCapture {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ExecCapture {
    fn push(&mut self, chunk: LogOutput, echo: bool) {
        let (buffer, stream, message) = match chunk {
            LogOutput::StdOut { message } => (&mut self.stdout, "stdout", message),
            LogOutput::StdErr { message } => (&mut self.stderr, "stderr", message),
            _ => return,
        };
        if echo {
            for line in String::from_utf8_lossy(&message).lines() {
                debug!(target: "symfony_pipeline::exec", stream, "{}", line);
            }
        }
        buffer.extend_from_slice(&message);
    }

    fn finish(self, exit_code: i64) -> ExecOutput {
        ExecOutput {
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            exit_code,
        }
    }
}

struct Evaluated {
    container_id: String,
    stdout: String,
}

/// Engine that drives a local Docker daemon
pub struct DockerEngine {
    docker: Docker,
    options: DockerEngineOptions,
    progress: Arc<dyn ProgressHandler>,
}

impl DockerEngine {
    /// Connects using `DOCKER_HOST` or the platform's default socket
    pub fn connect(options: DockerEngineOptions) -> Result<Self, EngineError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::Connection(e.to_string()))?;
        Ok(Self {
            docker,
            options,
            progress: Arc::new(LoggingHandler),
        })
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = handler;
        self
    }

    async fn ensure_image(&self, image: &str) -> Result<(), EngineError> {
        if self.docker.inspect_image(image).await.is_ok() {
            debug!(image, "Image present locally");
            return Ok(());
        }

        info!(image, "Pulling image");
        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(item) = stream.next().await {
            let info = item?;
            if let Some(status) = info.status {
                debug!(image, status = %status, "Pull progress");
            }
        }
        Ok(())
    }

    async fn ensure_volume(&self, cache: &CacheVolume) -> Result<String, EngineError> {
        let name = cache_volume_name(cache);
        let options = CreateVolumeOptions {
            name: name.clone(),
            driver: "local".to_string(),
            labels: HashMap::from([(LABEL_CACHE.to_string(), cache.key.clone())]),
            ..Default::default()
        };
        self.docker.create_volume(options).await?;
        Ok(name)
    }

    async fn cache_mounts(&self, container: &Container) -> Result<Vec<Mount>, EngineError> {
        let mut mounts = Vec::new();
        for (path, cache) in container.cache_mounts() {
            let volume = self.ensure_volume(cache).await?;
            mounts.push(Mount {
                target: Some(path.to_string()),
                source: Some(volume),
                typ: Some(MountTypeEnum::VOLUME),
                ..Default::default()
            });
        }
        Ok(mounts)
    }

    async fn run_exec(
        &self,
        container_id: &str,
        args: &[String],
        env: &[(String, String)],
        workdir: Option<&str>,
        echo: bool,
    ) -> Result<ExecOutput, EngineError> {
        let options = CreateExecOptions {
            cmd: Some(args.to_vec()),
            env: Some(env_strings(env)),
            working_dir: workdir.map(str::to_string),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };
        let exec = self.docker.create_exec(container_id, options).await?;

        let mut capture = ExecCapture::default();
        if let StartExecResults::Attached { mut output, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            while let Some(chunk) = output.next().await {
                capture.push(chunk?, echo);
            }
        }

        let exit_code = self
            .docker
            .inspect_exec(&exec.id)
            .await?
            .exit_code
            .unwrap_or(-1);

        Ok(capture.finish(exit_code))
    }

    async fn checked_exec(
        &self,
        container_id: &str,
        args: &[String],
        env: &[(String, String)],
        workdir: Option<&str>,
    ) -> Result<String, EngineError> {
        let output = self
            .run_exec(container_id, args, env, workdir, true)
            .await?;
        if output.exit_code != 0 {
            return Err(EngineError::ExecFailed {
                command: args.to_vec(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }

    async fn upload(
        &self,
        container_id: &str,
        path: &str,
        source: &Directory,
    ) -> Result<(), EngineError> {
        self.checked_exec(container_id, &argv(&["mkdir", "-p", path]), &[], None)
            .await?;

        let source = source.clone();
        let archive = tokio::task::spawn_blocking(move || source.tarball())
            .await
            .map_err(|e| EngineError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        debug!(path, bytes = archive.len(), "Uploading directory");

        let options = UploadToContainerOptions {
            path: path.to_string(),
            ..Default::default()
        };
        self.docker
            .upload_to_container(container_id, Some(options), archive.into())
            .await?;
        Ok(())
    }

    async fn start_service(
        &self,
        run_id: &str,
        network: &str,
        alias: &str,
        image: &str,
        service: &Service,
    ) -> Result<String, EngineError> {
        let container = &service.container;
        let entrypoint = if service.use_entrypoint {
            container.entrypoint().map(<[String]>::to_vec)
        } else {
            Some(vec![String::new()])
        };
        let cmd = if service.args.is_empty() {
            None
        } else {
            Some(service.args.clone())
        };

        let endpoints = HashMap::from([(
            network.to_string(),
            EndpointSettings {
                aliases: Some(vec![alias.to_string()]),
                ..Default::default()
            },
        )]);

        let config = Config {
            image: Some(image.to_string()),
            env: Some(env_strings(&container.env())),
            working_dir: container.workdir().map(str::to_string),
            entrypoint,
            cmd,
            exposed_ports: exposed_port_map(&container.exposed_ports()),
            labels: Some(HashMap::from([(LABEL_RUN.to_string(), run_id.to_string())])),
            host_config: Some(HostConfig {
                network_mode: Some(network.to_string()),
                mounts: Some(self.cache_mounts(container).await?),
                ..Default::default()
            }),
            networking_config: Some(NetworkingConfig {
                endpoints_config: endpoints,
            }),
            ..Default::default()
        };

        let name = format!("symfony-pipeline-{}-{}", run_id, alias);
        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: None,
                }),
                config,
            )
            .await?;
        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await?;
        info!(service = alias, image, container = %name, "Service started");
        Ok(created.id)
    }

    async fn wait_until_ready(
        &self,
        container_id: &str,
        alias: &str,
        ports: &[u16],
    ) -> Result<(), EngineError> {
        let deadline = Instant::now() + self.options.service_timeout;
        let listen_table = argv(&["cat", "/proc/net/tcp", "/proc/net/tcp6"]);

        loop {
            let running = self
                .docker
                .inspect_container(container_id, None::<InspectContainerOptions>)
                .await?
                .state
                .and_then(|state| state.running)
                .unwrap_or(false);
            if !running {
                return Err(EngineError::ServiceExited {
                    alias: alias.to_string(),
                });
            }
            if ports.is_empty() {
                return Ok(());
            }

            // tcp6 may be missing; the exit code is irrelevant as long as
            // whatever was readable got printed
            let output = self
                .run_exec(container_id, &listen_table, &[], None, false)
                .await?;
            let open = listening_ports(&output.stdout);
            if ports.iter().all(|port| open.contains(port)) {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(EngineError::ServiceNotReady {
                    alias: alias.to_string(),
                    ports: ports.to_vec(),
                    timeout_secs: self.options.service_timeout.as_secs(),
                });
            }
            debug!(service = alias, open = ?open, "Waiting for service ports");
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    /// Saves the working container's filesystem plus the description's
    /// image config as `reference`
    async fn commit(
        &self,
        container_id: &str,
        container: &Container,
        reference: &ImageReference,
    ) -> Result<(), EngineError> {
        let base = container.validate()?;
        let base_config = self.docker.inspect_image(base).await?.config;

        // The working container runs `sleep`; restore the real entrypoint
        let (entrypoint, cmd) = match container.entrypoint() {
            Some(args) => (Some(args.to_vec()), None),
            None => {
                let base_config = base_config.unwrap_or_default();
                (
                    Some(base_config.entrypoint.unwrap_or_default()),
                    base_config.cmd,
                )
            }
        };

        let config = Config {
            env: Some(env_strings(&container.env())),
            working_dir: container.workdir().map(str::to_string),
            entrypoint,
            cmd,
            exposed_ports: exposed_port_map(&container.exposed_ports()),
            ..Default::default()
        };

        let options = CommitContainerOptions {
            container: container_id.to_string(),
            repo: reference.repository.clone(),
            tag: reference.tag.clone(),
            pause: true,
            ..Default::default()
        };
        self.docker.commit_container(options, config).await?;
        debug!(image = %reference, "Committed container");
        Ok(())
    }

    async fn push(&self, reference: &ImageReference) -> Result<String, EngineError> {
        let credentials = self
            .options
            .registry_auth
            .as_ref()
            .map(|auth| DockerCredentials {
                username: Some(auth.username.clone()),
                password: Some(auth.password.clone()),
                serveraddress: reference.registry().map(str::to_string),
                ..Default::default()
            });

        info!(image = %reference, "Pushing image");
        let options = PushImageOptions {
            tag: reference.tag.clone(),
        };
        let mut stream = self
            .docker
            .push_image(&reference.repository, Some(options), credentials);
        while let Some(item) = stream.next().await {
            let info = item?;
            if let Some(error) = info.error {
                return Err(EngineError::Publish {
                    address: reference.to_string(),
                    message: error,
                });
            }
            if let Some(status) = info.status {
                debug!(image = %reference, status = %status, "Push progress");
            }
        }

        let prefix = format!("{}@", reference.repository);
        let pinned = self
            .docker
            .inspect_image(&reference.to_string())
            .await?
            .repo_digests
            .unwrap_or_default()
            .into_iter()
            .find(|digest| digest.starts_with(&prefix));

        Ok(pinned.unwrap_or_else(|| reference.to_string()))
    }

    /// Evaluates a service container and commits it so it can be started
    fn snapshot<'a>(&'a self, container: &'a Container) -> BoxFuture<'a, Result<String, EngineError>> {
        async move {
            let reference = ImageReference {
                repository: SNAPSHOT_REPOSITORY.to_string(),
                tag: container.digest()[..12].to_string(),
            };

            let mut run = Run::new(self);
            let result = match run.execute(container).await {
                Ok(evaluated) => self.commit(&evaluated.container_id, container, &reference).await,
                Err(e) => Err(e),
            };
            run.teardown().await;
            run.report(&result);
            result.map(|_| reference.to_string())
        }
        .boxed()
    }

    async fn evaluate_and_publish(
        &self,
        run: &mut Run<'_>,
        container: &Container,
        reference: &ImageReference,
    ) -> Result<String, EngineError> {
        let evaluated = run.execute(container).await?;
        self.commit(&evaluated.container_id, container, reference)
            .await?;
        let published = self.push(reference).await?;
        self.progress.on_progress(&ProgressEvent::PublishCompleted {
            reference: published.clone(),
        });
        Ok(published)
    }
}

#[async_trait]
impl Engine for DockerEngine {
    fn name(&self) -> &str {
        "docker"
    }

    async fn check(&self) -> EngineHealth {
        match self.docker.version().await {
            Ok(version) => EngineHealth::available(
                self.name(),
                format!(
                    "Docker {} reachable",
                    version.version.unwrap_or_else(|| "unknown".to_string())
                ),
            )
            .with_details(format!(
                "API version {}",
                version.api_version.unwrap_or_else(|| "unknown".to_string())
            )),
            Err(e) => EngineHealth::unavailable(self.name(), "Docker daemon not reachable")
                .with_details(e.to_string()),
        }
    }

    async fn stdout(&self, container: &Container) -> Result<String, EngineError> {
        let mut run = Run::new(self);
        let result = run.execute(container).await.map(|evaluated| evaluated.stdout);
        run.teardown().await;
        run.report(&result);
        result
    }

    async fn publish(&self, container: &Container, address: &str) -> Result<String, EngineError> {
        let reference = ImageReference::parse(address)?;
        let mut run = Run::new(self);
        let result = self
            .evaluate_and_publish(&mut run, container, &reference)
            .await;
        run.teardown().await;
        run.report(&result);
        result
    }
}

/// Resources owned by one evaluation
struct Run<'a> {
    engine: &'a DockerEngine,
    id: String,
    started: Instant,
    container_id: Option<String>,
    network: Option<String>,
    services: Vec<String>,
    attached: bool,
}

impl<'a> Run<'a> {
    fn new(engine: &'a DockerEngine) -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(12);
        Self {
            engine,
            id,
            started: Instant::now(),
            container_id: None,
            network: None,
            services: Vec::new(),
            attached: false,
        }
    }

    fn labels(&self) -> HashMap<String, String> {
        HashMap::from([(LABEL_RUN.to_string(), self.id.clone())])
    }

    async fn execute(&mut self, container: &Container) -> Result<Evaluated, EngineError> {
        let engine = self.engine;
        let base = container.validate()?.to_string();
        let total = container.step_count();

        engine.progress.on_progress(&ProgressEvent::EvaluationStarted {
            run_id: self.id.clone(),
            base_image: base.clone(),
            steps: total,
        });

        engine.ensure_image(&base).await?;

        // Cache volumes are attached for the whole run
        let config = Config {
            image: Some(base.clone()),
            entrypoint: Some(argv(&["sleep"])),
            cmd: Some(argv(&["infinity"])),
            labels: Some(self.labels()),
            host_config: Some(HostConfig {
                mounts: Some(engine.cache_mounts(container).await?),
                ..Default::default()
            }),
            ..Default::default()
        };
        let name = format!("symfony-pipeline-{}", self.id);
        let created = engine
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name,
                    platform: None,
                }),
                config,
            )
            .await?;
        self.container_id = Some(created.id.clone());
        engine
            .docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await?;
        let container_id = created.id;

        let mut env: Vec<(String, String)> = Vec::new();
        let mut workdir: Option<String> = None;
        let mut last_stdout = String::new();
        let mut index = 0;

        for operation in container.operations() {
            let step_started = Instant::now();
            if operation.is_step() {
                index += 1;
                engine.progress.on_progress(&ProgressEvent::StepStarted {
                    index,
                    total,
                    description: operation.describe(),
                });
            }

            match operation {
                Operation::From { .. }
                | Operation::MountCache { .. }
                | Operation::ExposePort { .. }
                | Operation::Entrypoint { .. } => {}
                Operation::EnvVariable { name, value } => set_env(&mut env, name, value),
                Operation::Workdir { path } => {
                    engine
                        .checked_exec(&container_id, &argv(&["mkdir", "-p", path.as_str()]), &env, None)
                        .await?;
                    workdir = Some(path.clone());
                }
                Operation::Exec { args } => {
                    last_stdout = engine
                        .checked_exec(&container_id, args, &env, workdir.as_deref())
                        .await?;
                }
                Operation::Directory { path, source } => {
                    engine.upload(&container_id, path, source).await?;
                }
                Operation::ServiceBinding { alias, service } => {
                    self.bind_service(&container_id, alias, service).await?;
                }
            }

            if operation.is_step() {
                engine.progress.on_progress(&ProgressEvent::StepCompleted {
                    index,
                    total,
                    description: operation.describe(),
                    duration: step_started.elapsed(),
                });
            }
        }

        Ok(Evaluated {
            container_id,
            stdout: last_stdout,
        })
    }

    async fn ensure_network(&mut self) -> Result<String, EngineError> {
        if let Some(network) = &self.network {
            return Ok(network.clone());
        }

        let name = format!("symfony-pipeline-{}", self.id);
        let options = CreateNetworkOptions {
            name: name.clone(),
            driver: "bridge".to_string(),
            labels: self.labels(),
            ..Default::default()
        };
        self.engine.docker.create_network(options).await?;
        debug!(network = %name, "Created run network");
        self.network = Some(name.clone());
        Ok(name)
    }

    async fn bind_service(
        &mut self,
        working_container: &str,
        alias: &str,
        service: &Service,
    ) -> Result<(), EngineError> {
        let engine = self.engine;
        let network = self.ensure_network().await?;

        let image = if service.needs_snapshot() {
            engine.snapshot(&service.container).await?
        } else {
            let base = service.container.validate()?.to_string();
            engine.ensure_image(&base).await?;
            base
        };

        let waiting = Instant::now();
        let service_id = engine
            .start_service(&self.id, &network, alias, &image, service)
            .await?;
        self.services.push(service_id.clone());

        if !self.attached {
            let options = ConnectNetworkOptions {
                container: working_container.to_string(),
                endpoint_config: EndpointSettings::default(),
            };
            engine.docker.connect_network(&network, options).await?;
            self.attached = true;
        }

        engine
            .wait_until_ready(&service_id, alias, &service.exposed_ports())
            .await?;
        engine.progress.on_progress(&ProgressEvent::ServiceReady {
            alias: alias.to_string(),
            image,
            wait_time: waiting.elapsed(),
        });
        Ok(())
    }

    /// Removes every container and network the run created
    async fn teardown(&mut self) {
        let docker = &self.engine.docker;

        for id in self.services.drain(..).chain(self.container_id.take()) {
            let options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            if let Err(e) = docker.remove_container(&id, Some(options)).await {
                warn!(container = %id, error = %e, "Failed to remove container");
            }
        }

        if let Some(network) = self.network.take() {
            if let Err(e) = docker.remove_network(&network).await {
                warn!(network = %network, error = %e, "Failed to remove network");
            }
        }
    }

    fn report<T>(&self, result: &Result<T, EngineError>) {
        let event = match result {
            Ok(_) => ProgressEvent::EvaluationCompleted {
                run_id: self.id.clone(),
                duration: self.started.elapsed(),
            },
            Err(e) => ProgressEvent::EvaluationFailed {
                run_id: self.id.clone(),
                error: e.to_string(),
            },
        };
        self.engine.progress.on_progress(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_NET_TCP: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:0CEA 00000000:0000 0A 00000000:00000000 00:00000000 00000000   999        0 12345 1 0000000000000000 100 0 0 10 0
   1: 0B00007F:A1B2 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 12346 1 0000000000000000 100 0 0 10 0
   2: 0100007F:0CEA 0100007F:D2F0 01 00000000:00000000 00:00000000 00000000   999        0 12347 1 0000000000000000 20 4 30 10 -1
";

    const PROC_NET_TCP6: &str = "  sl  local_address                         remote_address                        st tx_queue rx_queue
   0: 00000000000000000000000000000000:1F40 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000
";

    #[test]
    fn test_exec_capture_keeps_split_utf8() {
        let euro = "\u{20ac}".as_bytes();
        let mut capture = ExecCapture::default();
        capture.push(
            LogOutput::StdOut {
                message: [b"price: ".as_slice(), &euro[..1]].concat().into(),
            },
            false,
        );
        capture.push(
            LogOutput::StdOut {
                message: [&euro[1..], b"5\n".as_slice()].concat().into(),
            },
            true,
        );
        capture.push(
            LogOutput::StdErr {
                message: b"warning\n".to_vec().into(),
            },
            false,
        );

        let output = capture.finish(0);
        assert_eq!(output.stdout, "price: \u{20ac}5\n");
        assert_eq!(output.stderr, "warning\n");
        assert_eq!(output.exit_code, 0);
    }

    #[test]
    fn test_listening_ports_ipv4() {
        let ports = listening_ports(PROC_NET_TCP);
        assert!(ports.contains(&3306));
        assert!(ports.contains(&0xA1B2));
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_listening_ports_ignores_established() {
        let established = PROC_NET_TCP
            .lines()
            .filter(|line| line.contains(" 01 "))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(listening_ports(&established).is_empty());
    }

    #[test]
    fn test_listening_ports_ipv6() {
        let ports = listening_ports(PROC_NET_TCP6);
        assert_eq!(ports.into_iter().collect::<Vec<_>>(), vec![8000]);
    }

    #[test]
    fn test_listening_ports_garbage() {
        assert!(listening_ports("").is_empty());
        assert!(listening_ports("cat: /proc/net/tcp6: No such file").is_empty());
    }

    #[test]
    fn test_exposed_port_map() {
        assert!(exposed_port_map(&[]).is_none());
        let map = exposed_port_map(&[3306]).unwrap();
        assert!(map.contains_key("3306/tcp"));
    }

    #[test]
    fn test_env_strings() {
        let env = vec![("APP_ENV".to_string(), "test".to_string())];
        assert_eq!(env_strings(&env), vec!["APP_ENV=test".to_string()]);
    }

    #[test]
    fn test_cache_volume_name() {
        assert_eq!(
            cache_volume_name(&CacheVolume::new("composer-php83")),
            "symfony-pipeline-cache-composer-php83"
        );
    }

    #[test]
    fn test_registry_auth_debug_redacts_password() {
        let auth = RegistryAuth {
            username: "ci".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", auth);
        assert!(debug.contains("ci"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_default_options() {
        let options = DockerEngineOptions::default();
        assert_eq!(options.service_timeout, Duration::from_secs(120));
        assert!(options.registry_auth.is_none());
    }
}
