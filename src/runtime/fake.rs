//! Scripted in-process runtime for exercising the core without a daemon.
//!
//! Tests enqueue [`ExecScript`]s; each `exec` call consumes the next one
//! and replays its frames and exit code. A script with a simulated running
//! time longer than the exec deadline reports the deadline sentinel, which
//! is how the suite drives time-limit paths without sleeping.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ContainerRuntime, ContainerSpec, ExecOutcome, ExecSpec, RuntimeError, RuntimeResult};
use crate::stream::{StreamKind, encode_frame};

/// One scripted exec: what the process "printed" and how it exited.
#[derive(Debug, Clone)]
pub(crate) struct ExecScript {
    pub exit_code: i64,
    pub frames: Vec<(StreamKind, Vec<u8>)>,
    /// Simulated wall-clock running time, compared against the deadline.
    pub runs_for: Option<Duration>,
}

impl ExecScript {
    /// Clean exit with no output.
    pub fn ok() -> Self {
        Self {
            exit_code: 0,
            frames: Vec::new(),
            runs_for: None,
        }
    }

    /// Clean exit printing `text` on stdout.
    pub fn stdout(text: &str) -> Self {
        Self {
            exit_code: 0,
            frames: vec![(StreamKind::Stdout, text.as_bytes().to_vec())],
            runs_for: None,
        }
    }

    /// Non-zero exit printing `text` on stderr.
    pub fn fails(exit_code: i64, text: &str) -> Self {
        Self {
            exit_code,
            frames: vec![(StreamKind::Stderr, text.as_bytes().to_vec())],
            runs_for: None,
        }
    }

    /// A process that would still be running after `duration`.
    pub fn runs_for(duration: Duration) -> Self {
        Self {
            exit_code: 0,
            frames: Vec::new(),
            runs_for: Some(duration),
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    scripts: VecDeque<ExecScript>,
    fail_creates: usize,
    created: Vec<ContainerSpec>,
    started: Vec<String>,
    live: Vec<String>,
    stopped: Vec<String>,
    removed: Vec<String>,
    copies: Vec<(String, String, Vec<u8>)>,
    execs: Vec<(String, Vec<String>, Option<String>)>,
}

/// Scripted [`ContainerRuntime`] double.
#[derive(Debug, Default)]
pub(crate) struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_exec(&self, script: ExecScript) {
        self.state.lock().unwrap().scripts.push_back(script);
    }

    /// Makes the next `n` create calls fail.
    pub fn fail_next_creates(&self, n: usize) {
        self.state.lock().unwrap().fail_creates = n;
    }

    pub fn created(&self) -> Vec<ContainerSpec> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.state.lock().unwrap().stopped.clone()
    }

    /// Containers created and not yet removed.
    pub fn live(&self) -> Vec<String> {
        self.state.lock().unwrap().live.clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.state.lock().unwrap().removed.clone()
    }

    pub fn copies(&self) -> Vec<(String, String, Vec<u8>)> {
        self.state.lock().unwrap().copies.clone()
    }

    /// Every exec as `(container id, argv, stdin)`.
    pub fn execs(&self) -> Vec<(String, Vec<String>, Option<String>)> {
        self.state.lock().unwrap().execs.clone()
    }

    pub fn exec_count(&self) -> usize {
        self.state.lock().unwrap().execs.len()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_creates > 0 {
            state.fail_creates -= 1;
            return Err(RuntimeError::CreateFailed("scripted failure".to_string()));
        }
        state.next_id += 1;
        let id = format!("fake-{}", state.next_id);
        state.created.push(spec.clone());
        state.live.push(id.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        self.state.lock().unwrap().started.push(id.to_string());
        Ok(())
    }

    async fn copy_into_container(
        &self,
        id: &str,
        dest: &str,
        archive: Vec<u8>,
    ) -> RuntimeResult<()> {
        self.state
            .lock()
            .unwrap()
            .copies
            .push((id.to_string(), dest.to_string(), archive));
        Ok(())
    }

    async fn exec(&self, id: &str, spec: &ExecSpec) -> RuntimeResult<ExecOutcome> {
        let script = {
            let mut state = self.state.lock().unwrap();
            state
                .execs
                .push((id.to_string(), spec.cmd.clone(), spec.stdin.clone()));
            state.scripts.pop_front().unwrap_or_else(ExecScript::ok)
        };

        if let (Some(runs_for), Some(deadline)) = (script.runs_for, spec.deadline) {
            if runs_for > deadline {
                return Err(RuntimeError::DeadlineExceeded);
            }
        }

        let mut multiplexed = Vec::new();
        for (kind, payload) in &script.frames {
            encode_frame(&mut multiplexed, *kind, payload);
        }

        Ok(ExecOutcome {
            exit_code: script.exit_code,
            multiplexed,
        })
    }

    async fn stop_container(&self, id: &str) -> RuntimeResult<()> {
        self.state.lock().unwrap().stopped.push(id.to_string());
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> RuntimeResult<()> {
        let mut state = self.state.lock().unwrap();
        state.live.retain(|live| live != id);
        state.removed.push(id.to_string());
        Ok(())
    }
}
