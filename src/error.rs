//! Judging error taxonomy.
//!
//! The pipeline branches on these variants to pick a verdict; nothing in the
//! crate matches on error message text. Runtime-level failures are wrapped
//! via [`RuntimeError`] so the sentinel deadline variant stays observable.

use std::time::Duration;

use crate::runtime::RuntimeError;
use crate::types::Verdict;

/// Errors that terminate the judging of one submission.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// The compile step exited non-zero. Carries the compiler diagnostics.
    #[error("compilation failed: {0}")]
    CompilationFailed(String),

    /// The compile step outlived its fixed budget.
    #[error("compile step exceeded its {0:?} budget")]
    CompileTimeLimit(Duration),

    /// A test run outlived the submission's per-test budget.
    #[error("time limit exceeded after {0:?}")]
    TimeLimit(Duration),

    /// A test run exited non-zero or its stream failed mid-flight.
    #[error("runtime failure: {0}")]
    RuntimeFailed(String),

    /// Every sandbox slot was busy during a single acquire attempt.
    #[error("all sandboxes are busy and the pool is full")]
    PoolBusy,

    /// The acquire retry budget ran out. Carries the last underlying cause.
    #[error("sandbox pool exhausted after {attempts} attempts: {last}")]
    PoolExhausted {
        attempts: u32,
        #[source]
        last: Box<JudgeError>,
    },

    /// A container-runtime call failed outside the categories above.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl JudgeError {
    /// Verdict reported to the grading service for this failure.
    ///
    /// Only a per-test deadline maps to the dedicated time-limit verdict;
    /// a compile-step deadline is reported as a plain error.
    pub fn verdict(&self) -> Verdict {
        match self {
            JudgeError::TimeLimit(_) => Verdict::TimeLimitExceeded,
            _ => Verdict::Error,
        }
    }
}
