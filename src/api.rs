//! HTTP intake surface.
//!
//! Two thin handlers over the shared queue: the contest platform POSTs
//! submissions in, and an introspection endpoint exposes the current
//! backlog. Judging never happens on a request task; the worker picks
//! submissions up from the queue.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::queue::SubmissionQueue;
use crate::types::{Language, ResourceLimit, Submission, TestCaseInput};

/// Wire form of a submission, as posted by the contest platform.
///
/// The queue stores this form unchanged so the introspection endpoint can
/// echo it back; conversion to the domain [`Submission`] happens when the
/// worker picks it up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub submission_id: i64,
    pub code: String,
    pub language: Language,
    /// Megabytes.
    pub memory_limit: u64,
    /// Seconds, per test case.
    pub time_limit: f32,
    pub input_tests: Vec<TestCaseInput>,
}

impl SubmissionRequest {
    /// Converts to the domain submission. The wire format carries no CPU
    /// count; the configured default fills it in.
    pub fn into_submission(self, cpu_count: u32) -> Submission {
        Submission {
            id: self.submission_id,
            code: self.code,
            language: self.language,
            limit: ResourceLimit {
                memory_mb: self.memory_limit,
                time_limit_secs: self.time_limit,
                cpu_count,
            },
            tests: self.input_tests,
        }
    }
}

/// Shared state behind the intake handlers.
#[derive(Clone)]
pub struct ApiState {
    pub queue: Arc<SubmissionQueue<SubmissionRequest>>,
}

/// Builds the intake router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/submission", post(receive_submission))
        .route("/api/submissions", get(list_submissions))
        .with_state(state)
}

async fn receive_submission(
    State(state): State<ApiState>,
    Json(submission): Json<SubmissionRequest>,
) -> StatusCode {
    info!(
        submission = submission.submission_id,
        language = %submission.language,
        tests = submission.input_tests.len(),
        "queued submission"
    );
    state.queue.insert(submission);
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueSnapshot {
    submissions: Vec<SubmissionRequest>,
    total_count: usize,
}

async fn list_submissions(State(state): State<ApiState>) -> Json<QueueSnapshot> {
    let submissions = state.queue.snapshot();
    Json(QueueSnapshot {
        total_count: submissions.len(),
        submissions,
    })
}
