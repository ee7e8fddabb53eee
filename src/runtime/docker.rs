//! Docker implementation of the container-runtime contract, over bollard.
//!
//! Sandboxes are long-lived containers that sleep until the pool evicts
//! them; user code only ever runs through `exec`. The daemon can live on
//! the local socket or behind an HTTP endpoint from the configuration.

use bollard::Docker;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, LogOutput, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions, UploadToContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use async_trait::async_trait;

use super::{ContainerRuntime, ContainerSpec, ExecOutcome, ExecSpec, RuntimeError, RuntimeResult};
use crate::stream::{StreamKind, encode_frame};

/// CPU quota period in microseconds; quota = period * cpu count.
const CPU_PERIOD: i64 = 100_000;

/// A [`ContainerRuntime`] backed by the Docker daemon.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects to the daemon, over HTTP when a host is given and the local
    /// defaults otherwise.
    pub fn connect(host: Option<&str>) -> RuntimeResult<Self> {
        let docker = if let Some(host) = host {
            Docker::connect_with_http(host, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeError::Connection(e.to_string()))?
        } else {
            Docker::connect_with_local_defaults()
                .map_err(|e| RuntimeError::Connection(e.to_string()))?
        };
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let host_config = bollard::models::HostConfig {
            memory: Some(spec.memory_bytes),
            cpu_period: Some(CPU_PERIOD),
            cpu_quota: Some(CPU_PERIOD * i64::from(spec.cpu_count)),
            ..Default::default()
        };

        let config = ContainerConfig {
            image: Some(spec.image.clone()),
            working_dir: Some(spec.working_dir.clone()),
            host_config: Some(host_config),
            network_disabled: Some(true),
            // Keep the container alive between execs.
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            ..Default::default()
        };

        let name = format!("arbiter-{}", uuid::Uuid::new_v4());
        let options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| RuntimeError::CreateFailed(e.to_string()))?;

        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| RuntimeError::StartFailed(e.to_string()))
    }

    async fn copy_into_container(
        &self,
        id: &str,
        dest: &str,
        archive: Vec<u8>,
    ) -> RuntimeResult<()> {
        self.docker
            .upload_to_container(
                id,
                Some(UploadToContainerOptions {
                    path: dest.to_string(),
                    ..Default::default()
                }),
                archive.into(),
            )
            .await
            .map_err(|e| RuntimeError::CopyFailed(e.to_string()))
    }

    async fn exec(&self, id: &str, spec: &ExecSpec) -> RuntimeResult<ExecOutcome> {
        let options = CreateExecOptions {
            cmd: Some(spec.cmd.clone()),
            working_dir: Some(spec.working_dir.clone()),
            attach_stdin: Some(spec.stdin.is_some()),
            attach_stdout: Some(spec.attach_stdout),
            attach_stderr: Some(spec.attach_stderr),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(id, options)
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        let started = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        let StartExecResults::Attached { output, mut input } = started else {
            return Err(RuntimeError::ExecFailed(
                "exec started detached without streams".to_string(),
            ));
        };

        // A program that never reads must not wedge the judge, so stdin is
        // fed from a detached task; write failures are logged and ignored.
        if let Some(stdin) = spec.stdin.clone() {
            tokio::spawn(async move {
                if let Err(e) = input.write_all(stdin.as_bytes()).await {
                    warn!("failed to write exec stdin: {e}");
                }
                if let Err(e) = input.shutdown().await {
                    warn!("failed to close exec stdin: {e}");
                }
            });
        }

        let drain = drain_multiplexed(output);
        let multiplexed = match spec.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, drain).await {
                Ok(drained) => drained?,
                Err(_) => {
                    // The attach stream is gone; stopping the container is
                    // the only lever that also kills the exec'd process.
                    if let Err(e) = self.stop_container(id).await {
                        warn!("failed to stop container after deadline: {e}");
                    }
                    return Err(RuntimeError::DeadlineExceeded);
                }
            },
            None => drain.await?,
        };

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        Ok(ExecOutcome {
            exit_code: inspect.exit_code.unwrap_or(-1),
            multiplexed,
        })
    }

    async fn stop_container(&self, id: &str) -> RuntimeResult<()> {
        self.docker
            .stop_container(id, Some(StopContainerOptions { t: 0 }))
            .await
            .map_err(|e| RuntimeError::DisposeFailed(e.to_string()))
    }

    async fn remove_container(&self, id: &str) -> RuntimeResult<()> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| RuntimeError::DisposeFailed(e.to_string()))
    }
}

/// Collects an exec attach stream back onto the wire framing.
///
/// Bollard hands frames out already parsed; the runtime contract carries
/// the framed form so the core's demultiplexer sees identical bytes from
/// the daemon and from scripted test streams.
async fn drain_multiplexed(
    mut output: impl futures::Stream<Item = Result<LogOutput, bollard::errors::Error>>
    + Unpin
    + Send,
) -> RuntimeResult<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = output.next().await {
        match chunk {
            Ok(LogOutput::StdOut { message }) => {
                encode_frame(&mut buf, StreamKind::Stdout, &message);
            }
            Ok(LogOutput::StdErr { message }) => {
                encode_frame(&mut buf, StreamKind::Stderr, &message);
            }
            Ok(_) => {}
            Err(e) => return Err(RuntimeError::ExecFailed(e.to_string())),
        }
    }
    Ok(buf)
}
