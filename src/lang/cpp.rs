//! C++ adapter: compile with g++, run the produced binary.

use std::time::Duration;

use async_trait::async_trait;

use super::{LanguageAdapter, compile_checked};
use crate::error::JudgeError;
use crate::pool::Sandbox;
use crate::types::Language;

pub struct CppAdapter;

#[async_trait]
impl LanguageAdapter for CppAdapter {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn source_filename(&self) -> &'static str {
        "main.cpp"
    }

    async fn compile(
        &self,
        sandbox: &Sandbox,
        source: &str,
        budget: Duration,
    ) -> Result<Vec<String>, JudgeError> {
        let cmd = vec![
            "g++".to_string(),
            "-o".to_string(),
            "solution".to_string(),
            source.to_string(),
        ];
        compile_checked(sandbox, cmd, budget).await?;
        Ok(vec!["./solution".to_string()])
    }
}
