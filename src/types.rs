//! Core data model for submissions and judging results.
//!
//! A [`Submission`] is immutable once enqueued: source code, a language tag,
//! per-language resource limits, and an ordered list of test inputs. Judging
//! produces a [`JudgingResult`] carrying a [`Verdict`] and the captured
//! stdout of every test case that ran.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

/// A programming language the judge can build and run.
///
/// The wire representation is an integer (`0` = Python, `1` = C++), matching
/// the submission JSON schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Language {
    Python,
    Cpp,
}

impl Language {
    /// Docker image used for sandboxes of this language unless overridden
    /// in the configuration.
    pub fn default_image(self) -> &'static str {
        match self {
            Language::Cpp => "gcc:latest",
            Language::Python => "python:3.11-alpine",
        }
    }
}

impl TryFrom<u8> for Language {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Language::Python),
            1 => Ok(Language::Cpp),
            other => Err(format!("unknown language code: {other}")),
        }
    }
}

impl From<Language> for u8 {
    fn from(language: Language) -> u8 {
        match language {
            Language::Python => 0,
            Language::Cpp => 1,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::Cpp => write!(f, "cpp"),
        }
    }
}

/// Resource limits applied to one submission.
///
/// `time_limit_secs` is the wall-clock budget for a single test-case run;
/// the compile step has its own fixed budget from the configuration. Memory
/// and CPU bound the sandbox container itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceLimit {
    pub memory_mb: u64,
    pub time_limit_secs: f32,
    pub cpu_count: u32,
}

impl ResourceLimit {
    pub fn memory_bytes(&self) -> i64 {
        (self.memory_mb * 1024 * 1024) as i64
    }

    /// Per-test wall-clock deadline.
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f32(self.time_limit_secs)
    }
}

/// One test case input, identified by the caller's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseInput {
    #[serde(rename = "testCaseId")]
    pub id: i64,
    pub input: String,
}

/// Captured stdout for one test case, trimmed of surrounding whitespace.
///
/// The field casing follows the grading service's callback schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseOutput {
    #[serde(rename = "testCaseId")]
    pub id: i64,
    #[serde(rename = "Output")]
    pub output: String,
}

/// A judging job, immutable once enqueued.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: i64,
    pub code: String,
    pub language: Language,
    pub limit: ResourceLimit,
    pub tests: Vec<TestCaseInput>,
}

/// Final judgment of a submission.
///
/// Serialized as its integer code: `0` passed, `2` time limit exceeded,
/// `3` compile or runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    TimeLimitExceeded,
    Error,
}

impl Verdict {
    pub fn code(self) -> i32 {
        match self {
            Verdict::Passed => 0,
            Verdict::TimeLimitExceeded => 2,
            Verdict::Error => 3,
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed => write!(f, "passed"),
            Verdict::TimeLimitExceeded => write!(f, "time limit exceeded"),
            Verdict::Error => write!(f, "error"),
        }
    }
}

/// Outcome of judging one submission.
///
/// `falling_test` is the 1-based index of the first failing test case, or
/// `0` when every test ran to completion. Failure results carry no outputs;
/// the grader only receives outputs for a fully passing run.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgingResult {
    pub submission_id: i64,
    pub verdict: Verdict,
    pub is_error: bool,
    pub falling_test: u32,
    pub outputs: Vec<TestCaseOutput>,
}

impl JudgingResult {
    pub fn passed(submission_id: i64, outputs: Vec<TestCaseOutput>) -> Self {
        Self {
            submission_id,
            verdict: Verdict::Passed,
            is_error: false,
            falling_test: 0,
            outputs,
        }
    }

    pub fn failed(submission_id: i64, falling_test: u32, verdict: Verdict) -> Self {
        Self {
            submission_id,
            verdict,
            is_error: true,
            falling_test,
            outputs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_round_trip() {
        assert_eq!(Language::try_from(0u8), Ok(Language::Python));
        assert_eq!(Language::try_from(1u8), Ok(Language::Cpp));
        assert_eq!(u8::from(Language::Python), 0);
        assert_eq!(u8::from(Language::Cpp), 1);
        assert!(Language::try_from(7u8).is_err());
    }

    #[test]
    fn language_deserializes_from_wire_integer() {
        let lang: Language = serde_json::from_str("1").unwrap();
        assert_eq!(lang, Language::Cpp);
        let lang: Language = serde_json::from_str("0").unwrap();
        assert_eq!(lang, Language::Python);
        assert!(serde_json::from_str::<Language>("9").is_err());
    }

    #[test]
    fn verdict_codes() {
        assert_eq!(Verdict::Passed.code(), 0);
        assert_eq!(Verdict::TimeLimitExceeded.code(), 2);
        assert_eq!(Verdict::Error.code(), 3);
        assert_eq!(serde_json::to_string(&Verdict::TimeLimitExceeded).unwrap(), "2");
    }

    #[test]
    fn resource_limit_conversions() {
        let limit = ResourceLimit {
            memory_mb: 256,
            time_limit_secs: 1.5,
            cpu_count: 1,
        };
        assert_eq!(limit.memory_bytes(), 256 * 1024 * 1024);
        assert_eq!(limit.time_limit(), Duration::from_millis(1500));
    }

    #[test]
    fn test_case_output_wire_shape() {
        let output = TestCaseOutput {
            id: 3,
            output: "7".to_string(),
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["testCaseId"], 3);
        assert_eq!(json["Output"], "7");
    }

    #[test]
    fn failed_result_has_no_outputs() {
        let result = JudgingResult::failed(9, 2, Verdict::TimeLimitExceeded);
        assert!(result.is_error);
        assert_eq!(result.falling_test, 2);
        assert!(result.outputs.is_empty());
    }
}
