//! Per-language build-and-run recipes.
//!
//! A [`LanguageAdapter`] knows how to place a source file in a sandbox,
//! turn it into something runnable, and run it against one test input.
//! The trait carries the shared mechanics (archive upload, exec plumbing,
//! stream demultiplexing); concrete adapters mostly contribute argv.
//!
//! Adapter operations are idempotent across sandbox reuse: after
//! `run_test` returns, the compiled artifact is still in place, so another
//! run of the same submission works without recompiling.

pub mod cpp;
pub mod python;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::JudgeError;
use crate::pool::{Sandbox, WORKSPACE_DIR};
use crate::runtime::{ExecSpec, RuntimeError};
use crate::stream::demultiplex;
use crate::types::Language;

/// Build-and-run recipe for one language.
#[async_trait]
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// In-container source filename, e.g. `main.cpp`.
    fn source_filename(&self) -> &'static str;

    /// Packages the code as a single-file archive and lands it in the
    /// sandbox workspace. Returns the in-container filename.
    async fn deploy_source(&self, sandbox: &Sandbox, code: &str) -> Result<String, JudgeError> {
        let archive = source_archive(self.source_filename(), code)?;
        sandbox
            .runtime()
            .copy_into_container(&sandbox.container_id, WORKSPACE_DIR, archive)
            .await?;
        Ok(self.source_filename().to_string())
    }

    /// Produces the argv used to run one test, compiling or syntax-checking
    /// first. A non-zero exit here is a compilation error; outliving
    /// `budget` is a compile time-limit error.
    async fn compile(
        &self,
        sandbox: &Sandbox,
        source: &str,
        budget: Duration,
    ) -> Result<Vec<String>, JudgeError>;

    /// Runs the compiled submission against one test input and returns its
    /// trimmed stdout.
    async fn run_test(
        &self,
        sandbox: &Sandbox,
        run_cmd: &[String],
        input: &str,
        budget: Duration,
    ) -> Result<String, JudgeError> {
        let spec = ExecSpec {
            cmd: run_cmd.to_vec(),
            working_dir: WORKSPACE_DIR.to_string(),
            stdin: Some(format!("{input}\n")),
            attach_stdout: true,
            attach_stderr: false,
            deadline: Some(budget),
        };

        let outcome = match sandbox.runtime().exec(&sandbox.container_id, &spec).await {
            Ok(outcome) => outcome,
            Err(RuntimeError::DeadlineExceeded) => return Err(JudgeError::TimeLimit(budget)),
            Err(e) => return Err(e.into()),
        };

        if !outcome.success() {
            return Err(JudgeError::RuntimeFailed(format!(
                "process exited with status {}",
                outcome.exit_code
            )));
        }

        let (stdout, _stderr) = demultiplex(&outcome.multiplexed);
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

/// Adapter for a language tag.
pub fn adapter_for(language: Language) -> &'static dyn LanguageAdapter {
    match language {
        Language::Cpp => &cpp::CppAdapter,
        Language::Python => &python::PythonAdapter,
    }
}

/// Runs a compile-step argv and maps its failure modes.
pub(crate) async fn compile_checked(
    sandbox: &Sandbox,
    cmd: Vec<String>,
    budget: Duration,
) -> Result<(), JudgeError> {
    let spec = ExecSpec::capture(cmd, WORKSPACE_DIR).with_deadline(budget);

    let outcome = match sandbox.runtime().exec(&sandbox.container_id, &spec).await {
        Ok(outcome) => outcome,
        Err(RuntimeError::DeadlineExceeded) => return Err(JudgeError::CompileTimeLimit(budget)),
        Err(e) => return Err(e.into()),
    };

    if outcome.success() {
        return Ok(());
    }

    let (stdout, stderr) = demultiplex(&outcome.multiplexed);
    let diagnostics = if stderr.is_empty() { stdout } else { stderr };
    Err(JudgeError::CompilationFailed(
        String::from_utf8_lossy(&diagnostics).trim().to_string(),
    ))
}

/// Builds an in-memory tar archive holding exactly one source file.
fn source_archive(filename: &str, code: &str) -> Result<Vec<u8>, JudgeError> {
    let mut builder = tar::Builder::new(Vec::new());

    let mut header = tar::Header::new_gnu();
    header.set_size(code.len() as u64);
    header.set_mode(0o644);
    builder
        .append_data(&mut header, filename, code.as_bytes())
        .map_err(|e| RuntimeError::CopyFailed(e.to_string()))?;

    builder
        .into_inner()
        .map_err(|e| RuntimeError::CopyFailed(e.to_string()).into())
}
