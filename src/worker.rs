//! Background judging worker and result publication.
//!
//! A single long-lived task drains the submission queue: pull one, judge
//! it, POST the result to the grading service, repeat. One consumer keeps
//! pool pressure easy to reason about; parallel workers are a future
//! extension the pool already supports.
//!
//! Publication has no retry: a non-204 response or transport failure is
//! logged and the worker moves on.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{error, info};

use crate::api::SubmissionRequest;
use crate::pipeline;
use crate::pool::SandboxPool;
use crate::queue::SubmissionQueue;
use crate::types::{JudgingResult, TestCaseOutput};

/// How long the worker sleeps when the queue is empty.
const IDLE_PAUSE: Duration = Duration::from_secs(1);

/// Callback body POSTed to the grading service.
///
/// `falling_test` is `null` when no test failed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JudgeReport<'a> {
    submission_id: i64,
    is_error_exist: bool,
    falling_test: Option<u32>,
    verdict: i32,
    outputs: &'a [TestCaseOutput],
}

impl<'a> From<&'a JudgingResult> for JudgeReport<'a> {
    fn from(result: &'a JudgingResult) -> Self {
        Self {
            submission_id: result.submission_id,
            is_error_exist: result.is_error,
            falling_test: (result.falling_test > 0).then_some(result.falling_test),
            verdict: result.verdict.code(),
            outputs: &result.outputs,
        }
    }
}

/// Outbound HTTP client for judging results.
pub struct ResultPublisher {
    client: reqwest::Client,
    base_url: String,
}

impl ResultPublisher {
    /// `base_url` is the grading service root, trailing slash included.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build callback HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// POSTs one result. The grading service acknowledges with 204.
    pub async fn publish(&self, result: &JudgingResult) -> anyhow::Result<()> {
        let url = format!("{}api/SubmissionQueue", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&JudgeReport::from(result))
            .send()
            .await
            .with_context(|| format!("failed to POST judging result to {url}"))?;

        if response.status() != StatusCode::NO_CONTENT {
            anyhow::bail!("unexpected callback status: {}", response.status());
        }

        info!(
            submission = result.submission_id,
            verdict = %result.verdict,
            "published judging result"
        );
        Ok(())
    }
}

/// The single queue consumer.
pub struct Worker {
    queue: Arc<SubmissionQueue<SubmissionRequest>>,
    pool: Arc<SandboxPool>,
    publisher: ResultPublisher,
    compile_budget: Duration,
    default_cpu_count: u32,
}

impl Worker {
    pub fn new(
        queue: Arc<SubmissionQueue<SubmissionRequest>>,
        pool: Arc<SandboxPool>,
        publisher: ResultPublisher,
        compile_budget: Duration,
        default_cpu_count: u32,
    ) -> Self {
        Self {
            queue,
            pool,
            publisher,
            compile_budget,
            default_cpu_count,
        }
    }

    /// Runs forever. Spawn on a dedicated task.
    pub async fn run(self) {
        info!("judging worker started");
        loop {
            if !self.drain_one().await {
                tokio::time::sleep(IDLE_PAUSE).await;
            }
        }
    }

    /// Judges and publishes at most one submission. Returns whether the
    /// queue yielded anything.
    pub(crate) async fn drain_one(&self) -> bool {
        let Some(request) = self.queue.pull() else {
            return false;
        };

        let submission = request.into_submission(self.default_cpu_count);
        info!(
            submission = submission.id,
            language = %submission.language,
            tests = submission.tests.len(),
            "judging submission"
        );

        let result = pipeline::judge(&self.pool, &submission, self.compile_budget).await;

        if let Err(e) = self.publisher.publish(&result).await {
            // Known gap: there is no retry, so a lost callback drops the
            // result for good.
            error!(
                submission = result.submission_id,
                "failed to publish judging result: {e:#}"
            );
        }
        true
    }
}
