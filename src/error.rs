// Error taxonomy for the analysis core.
//
// Each branch (topics, summary) returns its own error so the caller can report
// one failure without losing the other branch's result. Plumbing code (config,
// downloads, model loading) stays on anyhow and gets wrapped at the boundary.

use thiserror::Error;

/// Errors surfaced by the analysis pipeline. None of these are fatal to the
/// process. The CLI prints them as warnings and keeps going.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Preprocessing left no usable tokens (stopwords, short words, numbers only).
    #[error("no usable terms remain after preprocessing; the transcript is too short for topic modeling")]
    EmptyInput,

    /// Requested topic count is outside `MIN_TOPICS..=MAX_TOPICS`.
    #[error("number of topics must be between 2 and 10, got {0}")]
    InvalidTopicCount(usize),

    /// The summarization branch failed.
    #[error(transparent)]
    Summarization(#[from] SummarizationError),

    /// Anything unexpected in either branch (task panics, cache plumbing).
    #[error("analysis pipeline failed: {0:#}")]
    Pipeline(anyhow::Error),
}

/// Failures from the summarizer. `Model` wraps the underlying runtime cause.
#[derive(Debug, Error)]
pub enum SummarizationError {
    #[error("invalid summary length bounds: min {min}, max {max}")]
    InvalidLengths { min: usize, max: usize },

    #[error("input too short to summarize: {tokens} tokens, need at least {required}")]
    InsufficientContent { tokens: usize, required: usize },

    #[error("input is {tokens} tokens, which exceeds the model context window of {limit}")]
    ContextOverflow { tokens: usize, limit: usize },

    #[error("summarization model failed: {0:#}")]
    Model(anyhow::Error),
}

impl AnalysisError {
    /// Short label for log fields and warning headers.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::EmptyInput => "empty_input",
            AnalysisError::InvalidTopicCount(_) => "invalid_topic_count",
            AnalysisError::Summarization(_) => "summarization",
            AnalysisError::Pipeline(_) => "pipeline",
        }
    }
}
