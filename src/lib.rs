//! # arbiter
//!
//! A code-judging service: it accepts programming submissions over HTTP,
//! builds and runs them inside a pool of isolated sandbox containers under
//! time and memory limits, and reports a verdict with the captured output
//! of every test case to an external grading service.
//!
//! ## Architecture
//!
//! The crate is organized around four subsystems:
//!
//! ### Runtime ([`runtime`])
//!
//! The boundary contract with the container runtime. The core depends on
//! the [`ContainerRuntime`] trait only; [`runtime::docker`] implements it
//! over bollard, and tests script an in-process fake. Exec streams stay in
//! the runtime's multiplexed framing, decoded by [`stream`].
//!
//! ### Sandboxes ([`pool`], [`lang`])
//!
//! [`SandboxPool`] keeps up to N warm containers, evicting the
//! longest-idle one when saturated. Every acquisition gets a fresh
//! container sized to the submission's limits. A [`LanguageAdapter`]
//! carries the per-language recipe: deploy the source, compile (or
//! syntax-check), run one test.
//!
//! ### Judging ([`pipeline`])
//!
//! [`pipeline::judge`] drives one submission through
//! acquire → deploy → compile → run-per-test → release with a fixed
//! compile budget and the submission's own per-test deadline, and folds
//! every failure into a [`Verdict`].
//!
//! ### Intake & publication ([`api`], [`queue`], [`worker`])
//!
//! HTTP handlers enqueue submissions into the mutex-guarded FIFO
//! [`SubmissionQueue`]; a single background [`Worker`] drains it and POSTs
//! each [`JudgingResult`] to the grading service.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use arbiter::config::Config;
//! use arbiter::pool::SandboxPool;
//! use arbiter::runtime::docker::DockerRuntime;
//! use arbiter::types::{Language, ResourceLimit, Submission, TestCaseInput};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let runtime = Arc::new(DockerRuntime::connect(None)?);
//!     let pool = SandboxPool::new(runtime, config.judge.pool_capacity,
//!         config.docker.image_map());
//!
//!     let submission = Submission {
//!         id: 1,
//!         code: "print(input())".to_string(),
//!         language: Language::Python,
//!         limit: ResourceLimit { memory_mb: 256, time_limit_secs: 1.0, cpu_count: 1 },
//!         tests: vec![TestCaseInput { id: 1, input: "hi".to_string() }],
//!     };
//!     let result = arbiter::pipeline::judge(&pool, &submission,
//!         config.judge.compile_budget()).await;
//!     println!("verdict: {}", result.verdict);
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! [`ContainerRuntime`]: runtime::ContainerRuntime
//! [`SandboxPool`]: pool::SandboxPool
//! [`LanguageAdapter`]: lang::LanguageAdapter
//! [`SubmissionQueue`]: queue::SubmissionQueue
//! [`Worker`]: worker::Worker
//! [`Verdict`]: types::Verdict
//! [`JudgingResult`]: types::JudgingResult

pub mod api;
pub mod config;
pub mod error;
pub mod lang;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod runtime;
pub mod stream;
pub mod types;
pub mod worker;

// Re-export the types most embedders need.

pub use config::{Config, load_config};
pub use error::JudgeError;
pub use pool::{Sandbox, SandboxPool};
pub use queue::SubmissionQueue;
pub use runtime::ContainerRuntime;
pub use types::{JudgingResult, Language, Submission, Verdict};
pub use worker::{ResultPublisher, Worker};
