//! Container-runtime boundary contract.
//!
//! The judging core never talks to a container SDK directly; it depends on
//! the [`ContainerRuntime`] trait, a thin capability set over whatever
//! runtime hosts the sandboxes:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  ContainerRuntime                     │
//! │                                                       │
//! │  create_container(spec) ───► container id             │
//! │  start_container(id)                                  │
//! │  copy_into_container(id, dest, tar)                   │
//! │  exec(id, spec) ──────────► ExecOutcome               │
//! │  stop_container(id) / remove_container(id)            │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! [`ContainerRuntime::exec`] returns the attach stream in its multiplexed
//! wire framing (see [`crate::stream`]); callers demultiplex. Deadline
//! expiry is the dedicated [`RuntimeError::DeadlineExceeded`] variant so the
//! pipeline can branch on type rather than message text.
//!
//! [`docker`] implements the trait over bollard. The scripted in-process
//! fake used by the core's tests lives in `runtime::fake`.

pub mod docker;

#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use async_trait::async_trait;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by a container runtime.
///
/// Transport and lifecycle failures are categorized per operation;
/// [`RuntimeError::DeadlineExceeded`] is the one sentinel the execution
/// pipeline recognizes specially.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Failed to reach the runtime daemon.
    #[error("runtime connection error: {0}")]
    Connection(String),

    /// Container creation was rejected (image missing, resources, auth).
    #[error("failed to create container: {0}")]
    CreateFailed(String),

    /// Created container refused to start.
    #[error("failed to start container: {0}")]
    StartFailed(String),

    /// Archive upload into the container failed.
    #[error("failed to copy into container: {0}")]
    CopyFailed(String),

    /// An exec could not be started or its stream failed mid-flight.
    ///
    /// A process that runs and exits non-zero is NOT this error; exit codes
    /// travel in [`ExecOutcome`].
    #[error("failed to execute command: {0}")]
    ExecFailed(String),

    /// The exec ran past the caller's deadline and was cut off.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Stop or remove failed for a container the pool is discarding.
    #[error("failed to dispose container: {0}")]
    DisposeFailed(String),
}

/// What to create: a long-lived sandbox container sized to one submission.
///
/// The container must idle cheaply (it sleeps) so subsequent exec calls
/// amortize the creation cost.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    pub working_dir: String,
    pub memory_bytes: i64,
    pub cpu_count: u32,
}

/// One process to run inside an existing container.
#[derive(Debug, Clone)]
pub struct ExecSpec {
    pub cmd: Vec<String>,
    pub working_dir: String,
    /// Payload written to the process's stdin by a detached task, after
    /// which the write half is closed. `None` leaves stdin unattached.
    pub stdin: Option<String>,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    /// Wall-clock budget. Expiry kills the process and closes the stream.
    pub deadline: Option<Duration>,
}

impl ExecSpec {
    /// An exec that only captures output, the common case for compiles.
    pub fn capture(cmd: Vec<String>, working_dir: impl Into<String>) -> Self {
        Self {
            cmd,
            working_dir: working_dir.into(),
            stdin: None,
            attach_stdout: true,
            attach_stderr: true,
            deadline: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Result of a completed exec.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    /// Process exit code; `-1` when the runtime reported none.
    pub exit_code: i64,
    /// The attach stream, still in its multiplexed framing.
    pub multiplexed: Vec<u8>,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability set the judging core needs from a container runtime.
///
/// Implementations must be safe to share across tasks; every method may
/// block on network I/O to the runtime daemon.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Creates a long-lived sandbox container. Does not run user code.
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String>;

    async fn start_container(&self, id: &str) -> RuntimeResult<()>;

    /// Unpacks a tar archive so its entries land under `dest` inside the
    /// container.
    async fn copy_into_container(
        &self,
        id: &str,
        dest: &str,
        archive: Vec<u8>,
    ) -> RuntimeResult<()>;

    /// Runs one process to completion, honoring `spec.deadline`.
    async fn exec(&self, id: &str, spec: &ExecSpec) -> RuntimeResult<ExecOutcome>;

    async fn stop_container(&self, id: &str) -> RuntimeResult<()>;

    /// Force-removes the container. Idempotent from the pool's viewpoint:
    /// removing an already-gone container is reported as an error but the
    /// pool only logs it.
    async fn remove_container(&self, id: &str) -> RuntimeResult<()>;
}
