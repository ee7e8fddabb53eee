//! Per-submission execution pipeline.
//!
//! Drives one submission through acquire → deploy → compile → run-per-test
//! → release and synthesizes the verdict. The sandbox is held for the whole
//! submission so the compiled artifact is reused across its tests; each
//! test run still gets its own independent deadline.
//!
//! The first failing step short-circuits the submission: later tests never
//! run, and the result carries the 1-based index of the failing test
//! (compile and acquire failures count as test 1). Release happens on
//! every path before the verdict is synthesized, so no outcome leaks a
//! sandbox.

use std::time::Duration;

use tracing::{info, warn};

use crate::lang::{self, LanguageAdapter};
use crate::error::JudgeError;
use crate::pool::{Sandbox, SandboxPool};
use crate::types::{JudgingResult, Submission, TestCaseOutput};

/// Judges one submission to completion. Infallible by design: every
/// internal failure is folded into the verdict.
pub async fn judge(
    pool: &SandboxPool,
    submission: &Submission,
    compile_budget: Duration,
) -> JudgingResult {
    let adapter = lang::adapter_for(submission.language);

    let sandbox = match pool.acquire(submission.language, &submission.limit).await {
        Ok(sandbox) => sandbox,
        Err(e) => {
            warn!(submission = submission.id, "failed to acquire a sandbox: {e}");
            return JudgingResult::failed(submission.id, 1, e.verdict());
        }
    };

    let outcome = run_in_sandbox(adapter, &sandbox, submission, compile_budget).await;
    pool.release(&sandbox).await;

    match outcome {
        Ok(outputs) => {
            info!(
                submission = submission.id,
                tests = outputs.len(),
                "submission passed"
            );
            JudgingResult::passed(submission.id, outputs)
        }
        Err(failure) => {
            warn!(
                submission = submission.id,
                test = failure.test,
                "submission failed: {}",
                failure.error
            );
            JudgingResult::failed(submission.id, failure.test, failure.error.verdict())
        }
    }
}

/// A terminal judging failure tagged with the 1-based test index it hit.
struct Failure {
    test: u32,
    error: JudgeError,
}

async fn run_in_sandbox(
    adapter: &dyn LanguageAdapter,
    sandbox: &Sandbox,
    submission: &Submission,
    compile_budget: Duration,
) -> Result<Vec<TestCaseOutput>, Failure> {
    let source = adapter
        .deploy_source(sandbox, &submission.code)
        .await
        .map_err(|error| Failure { test: 1, error })?;

    let run_cmd = adapter
        .compile(sandbox, &source, compile_budget)
        .await
        .map_err(|error| Failure { test: 1, error })?;

    let time_limit = submission.limit.time_limit();
    let mut outputs = Vec::with_capacity(submission.tests.len());
    for (index, test) in submission.tests.iter().enumerate() {
        let stdout = adapter
            .run_test(sandbox, &run_cmd, &test.input, time_limit)
            .await
            .map_err(|error| Failure {
                test: (index + 1) as u32,
                error,
            })?;
        outputs.push(TestCaseOutput {
            id: test.id,
            output: stdout,
        });
    }

    Ok(outputs)
}
