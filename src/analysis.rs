use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{CodefixError, Result};

pub const DEBUG_INSTRUCTION: &str =
    "Act as a code debugger. Analyze the following code for issues and suggest fixes:";

/// Returned instead of an error when the model answers without any text.
pub const FALLBACK_RESULT: &str = "No debugged result generated";

/// Prompt template: instruction, blank line, content verbatim.
pub fn build_prompt(instruction: &str, content: &str) -> String {
    format!("{}\n\n{}", instruction, content)
}

/// What a successful round-trip to the model produced.
///
/// Transport failures are not an outcome; they surface as
/// `CodefixError::ExternalService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Text(String),
    /// The response had no first candidate with a non-empty first text part.
    EmptyCandidate,
}

/// A single-shot text-generation backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GenerationOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub prompt: String,
    pub text: String,
    /// True when `text` is the fallback rather than model output.
    pub degraded: bool,
}

/// Turns file content into diagnostic text through a [`TextGenerator`].
#[derive(Clone)]
pub struct AnalysisRequester {
    generator: Arc<dyn TextGenerator>,
    max_content_bytes: Option<usize>,
}

impl AnalysisRequester {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_content_bytes: None,
        }
    }

    /// Refuse content above `limit` bytes. Content is never truncated.
    pub fn with_max_content_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_content_bytes = limit;
        self
    }

    pub async fn analyze(&self, content: &str) -> Result<String> {
        Ok(self.diagnose(content).await?.text)
    }

    pub async fn diagnose(&self, content: &str) -> Result<Diagnosis> {
        if let Some(limit) = self.max_content_bytes {
            if content.len() > limit {
                return Err(CodefixError::validation(format!(
                    "File content is {} bytes, the analysis limit is {} bytes",
                    content.len(),
                    limit
                )));
            }
        }

        let prompt = build_prompt(DEBUG_INSTRUCTION, content);
        debug!(content_bytes = content.len(), "Requesting analysis");

        let (text, degraded) = match self.generator.generate(&prompt).await? {
            GenerationOutcome::Text(text) => (text, false),
            GenerationOutcome::EmptyCandidate => {
                warn!("Model returned no candidate text, using fallback");
                (FALLBACK_RESULT.to_string(), true)
            }
        };

        info!(result_bytes = text.len(), degraded, "Analysis completed");
        Ok(Diagnosis { prompt, text, degraded })
    }
}
