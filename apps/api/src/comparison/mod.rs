//! Comparator — fills the comparison template with two extracted texts and asks
//! the hosted model for an analysis.
//!
//! All semantic judgment (completeness, signatures, dates, addresses) lives in the
//! prompt. The model's answer is returned as an opaque blob: nothing is parsed,
//! trimmed or re-formatted here.

pub mod prompts;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::comparison::prompts::render_comparison_prompt;
use crate::extraction::ExtractedText;
use crate::llm_client::{Credential, LlmError, TextModel};

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("the model call failed: {0}")]
    ComparisonUnavailable(#[from] LlmError),
}

/// The model's raw answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ComparisonResult(String);

#[cfg(test)]
impl ComparisonResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone)]
pub struct Comparator {
    model: Arc<dyn TextModel>,
}

impl Comparator {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Compares `doc1` (the reference document) against `doc2`.
    ///
    /// Taking a `Credential` by reference makes the call unreachable without one.
    pub async fn compare(
        &self,
        credential: &Credential,
        doc1: &ExtractedText,
        doc2: &ExtractedText,
    ) -> Result<ComparisonResult, CompareError> {
        let prompt = render_comparison_prompt(doc1.as_str(), doc2.as_str());
        info!(
            "Requesting comparison (doc1: {} chars, doc2: {} chars, prompt: {} chars)",
            doc1.char_count(),
            doc2.char_count(),
            prompt.len()
        );

        let answer = self.model.complete(credential, &prompt).await?;

        info!("Comparison received ({} chars)", answer.len());
        Ok(ComparisonResult(answer))
    }
}
