//! Python adapter.
//!
//! The "compile" step is a syntax check via `py_compile`; failures at
//! import time of third-party modules still surface as runtime errors
//! from the run step.

use std::time::Duration;

use async_trait::async_trait;

use super::{LanguageAdapter, compile_checked};
use crate::error::JudgeError;
use crate::pool::Sandbox;
use crate::types::Language;

pub struct PythonAdapter;

#[async_trait]
impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn source_filename(&self) -> &'static str {
        "main.py"
    }

    async fn compile(
        &self,
        sandbox: &Sandbox,
        source: &str,
        budget: Duration,
    ) -> Result<Vec<String>, JudgeError> {
        let cmd = vec![
            "python".to_string(),
            "-m".to_string(),
            "py_compile".to_string(),
            source.to_string(),
        ];
        compile_checked(sandbox, cmd, budget).await?;
        Ok(vec!["python".to_string(), source.to_string()])
    }
}
